//! Zero-copy reader over a serialized index buffer.
//!
//! The reader borrows the buffer and resolves lookups directly against
//! the serialized bytes using popcount rank over each layer's bitmask;
//! no trie nodes are materialized and no allocation happens per lookup.
//! A lookup touches at most one bitmask and one pointer per level.

use crate::header::{IndexHeader, HEADER_SIZE};
use crate::pointer;
use packtrie_common::{BitmaskWidth, PacktrieError, Result, ValueWidth};

/// Read-only view over a serialized index.
///
/// Lookups never fail: a missing key is a miss, not an error. Malformed
/// input is rejected at construction where cheap to detect; a reader is
/// immutable and freely shareable across threads as long as the backing
/// buffer outlives it.
#[derive(Debug, Clone, Copy)]
pub struct IndexReader<'a> {
    data: &'a [u8],
    header: IndexHeader,
}

impl<'a> IndexReader<'a> {
    /// Opens a reader over a serialized index buffer.
    ///
    /// A zero-length buffer is the encoding of the empty map and yields
    /// a reader for which every lookup misses. Any other buffer must
    /// hold a valid header and at least the root layer's bitmask.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self {
                data,
                header: IndexHeader::EMPTY,
            });
        }
        if data.len() < HEADER_SIZE {
            return Err(PacktrieError::TruncatedBuffer {
                len: data.len(),
                needed: HEADER_SIZE,
            });
        }
        let raw = u16::from_le_bytes([data[0], data[1]]);
        let header = IndexHeader::decode(raw)?;
        let needed = HEADER_SIZE + header.bitmask_width.bytes();
        if data.len() < needed {
            return Err(PacktrieError::TruncatedBuffer {
                len: data.len(),
                needed,
            });
        }
        Ok(Self { data, header })
    }

    /// True if this reader wraps the empty buffer.
    pub fn is_empty(&self) -> bool {
        self.header.levels == 0
    }

    /// Decoded header; [`IndexHeader::EMPTY`] for the empty buffer.
    pub fn header(&self) -> IndexHeader {
        self.header
    }

    /// Number of trie levels (0 for the empty buffer).
    pub fn num_levels(&self) -> u8 {
        self.header.levels
    }

    /// Bitmask width per layer.
    pub fn bitmask_width(&self) -> BitmaskWidth {
        self.header.bitmask_width
    }

    /// Child pointer width in bytes.
    pub fn ptr_width(&self) -> usize {
        usize::from(self.header.ptr_width)
    }

    /// Value width at leaf layers.
    pub fn value_width(&self) -> ValueWidth {
        self.header.value_width
    }

    /// True if `key` is present.
    pub fn exists(&self, key: u64) -> bool {
        self.value_offset(key).is_some()
    }

    /// Value bytes for `key`, or `None` on miss.
    pub fn get(&self, key: u64) -> Option<&'a [u8]> {
        let offset = self.value_offset(key)?;
        self.data
            .get(offset..offset + self.header.value_width.bytes())
    }

    /// Value bytes for `key`, or `default` on miss.
    pub fn get_or<'b>(&self, key: u64, default: &'b [u8]) -> &'b [u8]
    where
        'a: 'b,
    {
        self.get(key).unwrap_or(default)
    }

    /// `u8` value for `key`; `None` on miss or non-1-byte values.
    pub fn get_u8(&self, key: u64) -> Option<u8> {
        if self.header.value_width != ValueWidth::U8 {
            return None;
        }
        self.get(key).map(|value| value[0])
    }

    /// `u16` value for `key`, little-endian; `None` on miss or width mismatch.
    pub fn get_u16(&self, key: u64) -> Option<u16> {
        if self.header.value_width != ValueWidth::U16 {
            return None;
        }
        let value = self.get(key)?;
        Some(u16::from_le_bytes(value.try_into().ok()?))
    }

    /// `u32` value for `key`, little-endian; `None` on miss or width mismatch.
    pub fn get_u32(&self, key: u64) -> Option<u32> {
        if self.header.value_width != ValueWidth::U32 {
            return None;
        }
        let value = self.get(key)?;
        Some(u32::from_le_bytes(value.try_into().ok()?))
    }

    /// `u64` value for `key`, little-endian; `None` on miss or width mismatch.
    pub fn get_u64(&self, key: u64) -> Option<u64> {
        if self.header.value_width != ValueWidth::U64 {
            return None;
        }
        let value = self.get(key)?;
        Some(u64::from_le_bytes(value.try_into().ok()?))
    }

    /// `f32` value for `key` from IEEE-754 little-endian bits.
    pub fn get_f32(&self, key: u64) -> Option<f32> {
        if self.header.value_width != ValueWidth::U32 {
            return None;
        }
        let value = self.get(key)?;
        Some(f32::from_le_bytes(value.try_into().ok()?))
    }

    /// `f64` value for `key` from IEEE-754 little-endian bits.
    pub fn get_f64(&self, key: u64) -> Option<f64> {
        if self.header.value_width != ValueWidth::U64 {
            return None;
        }
        let value = self.get(key)?;
        Some(f64::from_le_bytes(value.try_into().ok()?))
    }

    /// Byte offset of `key`'s value within the buffer, or `None` on miss.
    ///
    /// Walks one layer per level from the most-significant key slice
    /// down, ranking the slice bit against the layer bitmask to find the
    /// matching pointer or value slot. Reads past the buffer end (only
    /// possible on malformed bodies) surface as a miss.
    fn value_offset(&self, key: u64) -> Option<usize> {
        let levels = u32::from(self.header.levels);
        if levels == 0 {
            return None;
        }
        let slice_bits = self.header.bitmask_width.slice_bits();
        let slice_mask = self.header.bitmask_width.slice_mask();
        let bitmask_bytes = self.header.bitmask_width.bytes();
        let ptr_width = usize::from(self.header.ptr_width);

        // Keys above the covered range cannot be present.
        let covered_bits = levels * slice_bits;
        if covered_bits < 64 && key >> covered_bits != 0 {
            return None;
        }

        let mut layer_offset = 0usize;
        let mut slot = 0usize;
        for level in (0..levels).rev() {
            let slice = ((key >> (level * slice_bits)) & slice_mask) as u32;
            let start = HEADER_SIZE + layer_offset;
            let bitmask = read_bitmask(self.data.get(start..start + bitmask_bytes)?);
            if bitmask & (1u64 << slice) == 0 {
                return None;
            }
            // Rank of the slice bit among the set bits strictly below it.
            slot = (bitmask & ((1u64 << slice) - 1)).count_ones() as usize;
            if level != 0 {
                let ptr_start = start + bitmask_bytes + slot * ptr_width;
                layer_offset = pointer::decode(self.data.get(ptr_start..ptr_start + ptr_width)?);
            }
        }
        Some(HEADER_SIZE + layer_offset + bitmask_bytes + slot * self.header.value_width.bytes())
    }
}

/// Reads a bitmask of up to 8 bytes, zero-extended to a `u64`.
///
/// Bit `k` of the mask lives in byte `k >> 3` at position `k & 7`, which
/// is exactly little-endian byte order.
#[inline]
fn read_bitmask(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(raw)
}

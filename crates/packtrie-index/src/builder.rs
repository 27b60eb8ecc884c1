//! Index builder: lays out trie layers and serializes them.
//!
//! The builder consumes strictly ascending keys and their fixed-width
//! values, groups keys into per-level layers, picks the smallest pointer
//! width that can address the whole body, and emits the final buffer in
//! one pass. All working state is dropped on return; the output buffer
//! is the only allocation that survives.

use crate::header::{IndexHeader, HEADER_SIZE};
use crate::pointer;
use bytes::{BufMut, Bytes, BytesMut};
use packtrie_common::{BitmaskWidth, PacktrieError, Result, ValueWidth};
use tracing::debug;

/// Index into the builder's layer arena.
type LayerId = usize;

/// One trie node under construction.
///
/// A layer holds either child layers (inner levels) or value bytes (leaf
/// level), never both. Children and values are appended in ascending
/// slice order as the sorted keys are consumed.
struct LayerData {
    bitmask: u64,
    children: Vec<LayerId>,
    values: Vec<u8>,
    offset: usize,
}

impl LayerData {
    fn new() -> Self {
        Self {
            bitmask: 0,
            children: Vec::new(),
            values: Vec::new(),
            offset: 0,
        }
    }

    fn bit(&self, slice: u32) -> bool {
        self.bitmask & (1u64 << slice) != 0
    }

    fn set_bit(&mut self, slice: u32) {
        self.bitmask |= 1u64 << slice;
    }

    /// Serialized size of this layer for the given pointer width.
    fn size(&self, bitmask_bytes: usize, ptr_width: usize) -> usize {
        bitmask_bytes + self.children.len() * ptr_width + self.values.len()
    }
}

/// Serializes sorted key/value pairs into an immutable index buffer.
///
/// A writer is configured once with the bitmask and value widths; each
/// `dump*` call performs a complete build and returns the finished
/// buffer. Keys must be strictly ascending `u64`s and every value must
/// match the configured width.
#[derive(Debug, Clone, Copy)]
pub struct IndexWriter {
    bitmask_width: BitmaskWidth,
    value_width: ValueWidth,
}

impl IndexWriter {
    /// Creates a writer for the given bitmask and value widths.
    pub fn new(bitmask_width: BitmaskWidth, value_width: ValueWidth) -> Self {
        Self {
            bitmask_width,
            value_width,
        }
    }

    /// Configured bitmask width.
    pub fn bitmask_width(&self) -> BitmaskWidth {
        self.bitmask_width
    }

    /// Configured value width.
    pub fn value_width(&self) -> ValueWidth {
        self.value_width
    }

    /// Serializes ascending `keys` and their `values` into an index.
    ///
    /// Every value must be exactly the configured width. Empty input
    /// produces an empty buffer, the encoding of the empty map.
    pub fn dump(&self, keys: &[u64], values: &[&[u8]]) -> Result<Bytes> {
        if keys.len() != values.len() {
            return Err(PacktrieError::KeyValueCountMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        let width = self.value_width.bytes();
        let mut flat = Vec::with_capacity(keys.len() * width);
        for value in values {
            if value.len() != width {
                return Err(PacktrieError::ValueWidthMismatch {
                    expected: width,
                    actual: value.len(),
                });
            }
            flat.extend_from_slice(value);
        }
        self.dump_flat(keys, &flat)
    }

    /// Serializes keys with 1-byte values.
    pub fn dump_u8s(&self, keys: &[u64], values: &[u8]) -> Result<Bytes> {
        self.check_value_width(ValueWidth::U8)?;
        self.check_counts(keys.len(), values.len())?;
        self.dump_flat(keys, values)
    }

    /// Serializes keys with 2-byte values, little-endian.
    pub fn dump_u16s(&self, keys: &[u64], values: &[u16]) -> Result<Bytes> {
        self.check_value_width(ValueWidth::U16)?;
        self.check_counts(keys.len(), values.len())?;
        let mut flat = Vec::with_capacity(values.len() * 2);
        for value in values {
            flat.extend_from_slice(&value.to_le_bytes());
        }
        self.dump_flat(keys, &flat)
    }

    /// Serializes keys with 4-byte values, little-endian.
    pub fn dump_u32s(&self, keys: &[u64], values: &[u32]) -> Result<Bytes> {
        self.check_value_width(ValueWidth::U32)?;
        self.check_counts(keys.len(), values.len())?;
        let mut flat = Vec::with_capacity(values.len() * 4);
        for value in values {
            flat.extend_from_slice(&value.to_le_bytes());
        }
        self.dump_flat(keys, &flat)
    }

    /// Serializes keys with 8-byte values, little-endian.
    pub fn dump_u64s(&self, keys: &[u64], values: &[u64]) -> Result<Bytes> {
        self.check_value_width(ValueWidth::U64)?;
        self.check_counts(keys.len(), values.len())?;
        let mut flat = Vec::with_capacity(values.len() * 8);
        for value in values {
            flat.extend_from_slice(&value.to_le_bytes());
        }
        self.dump_flat(keys, &flat)
    }

    /// Serializes keys with `f32` values as IEEE-754 little-endian bits.
    pub fn dump_f32s(&self, keys: &[u64], values: &[f32]) -> Result<Bytes> {
        self.check_value_width(ValueWidth::U32)?;
        self.check_counts(keys.len(), values.len())?;
        let mut flat = Vec::with_capacity(values.len() * 4);
        for value in values {
            flat.extend_from_slice(&value.to_le_bytes());
        }
        self.dump_flat(keys, &flat)
    }

    /// Serializes keys with `f64` values as IEEE-754 little-endian bits.
    pub fn dump_f64s(&self, keys: &[u64], values: &[f64]) -> Result<Bytes> {
        self.check_value_width(ValueWidth::U64)?;
        self.check_counts(keys.len(), values.len())?;
        let mut flat = Vec::with_capacity(values.len() * 8);
        for value in values {
            flat.extend_from_slice(&value.to_le_bytes());
        }
        self.dump_flat(keys, &flat)
    }

    fn check_value_width(&self, element: ValueWidth) -> Result<()> {
        if self.value_width != element {
            return Err(PacktrieError::ValueWidthMismatch {
                expected: self.value_width.bytes(),
                actual: element.bytes(),
            });
        }
        Ok(())
    }

    fn check_counts(&self, keys: usize, values: usize) -> Result<()> {
        if keys != values {
            return Err(PacktrieError::KeyValueCountMismatch { keys, values });
        }
        Ok(())
    }

    /// Number of trie levels needed to cover `max_key`.
    fn num_levels(&self, max_key: u64) -> u8 {
        let slice_bits = self.bitmask_width.slice_bits();
        let mut levels = 1u8;
        let mut key = max_key >> slice_bits;
        while key != 0 {
            levels += 1;
            key >>= slice_bits;
        }
        levels
    }

    /// Smallest pointer width whose address space covers the whole body.
    fn ptr_width(&self, layers: &[LayerData]) -> Result<usize> {
        let bitmask_bytes = self.bitmask_width.bytes() as u64;
        let mut fixed = 0u64;
        let mut child_count = 0u64;
        for layer in layers {
            fixed += bitmask_bytes + layer.values.len() as u64;
            child_count += layer.children.len() as u64;
        }
        for width in 1..=pointer::MAX_WIDTH {
            let body = fixed + child_count * width as u64;
            if body <= 1u64 << (8 * width) {
                return Ok(width);
            }
        }
        Err(PacktrieError::AddressSpaceExceeded {
            body_bytes: fixed + child_count * pointer::MAX_WIDTH as u64,
        })
    }

    /// Core build over pre-flattened value bytes (`keys.len() * W`).
    fn dump_flat(&self, keys: &[u64], flat: &[u8]) -> Result<Bytes> {
        debug_assert_eq!(flat.len(), keys.len() * self.value_width.bytes());
        if keys.is_empty() {
            return Ok(Bytes::new());
        }
        for (index, pair) in keys.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(PacktrieError::KeyOrderViolation {
                    index: index + 1,
                    key: pair[1],
                });
            }
        }

        let slice_bits = self.bitmask_width.slice_bits();
        let slice_mask = self.bitmask_width.slice_mask();
        let bitmask_bytes = self.bitmask_width.bytes();
        let value_bytes = self.value_width.bytes();
        let levels = self.num_levels(keys[keys.len() - 1]);

        let mut layers: Vec<LayerData> = vec![LayerData::new()];
        // Layer each key currently occupies; every key starts at the root.
        let mut current: Vec<LayerId> = vec![0; keys.len()];

        for level in (1..=u32::from(levels)).rev() {
            for (i, &key) in keys.iter().enumerate() {
                let slice = ((key >> ((level - 1) * slice_bits)) & slice_mask) as u32;
                let layer_id = current[i];
                if level == 1 {
                    let start = i * value_bytes;
                    layers[layer_id]
                        .values
                        .extend_from_slice(&flat[start..start + value_bytes]);
                } else {
                    let child = if layers[layer_id].bit(slice) {
                        // Ascending keys guarantee the most recently
                        // created child is the one at this slice.
                        debug_assert_eq!(63 - layers[layer_id].bitmask.leading_zeros(), slice);
                        layers[layer_id].children.last().copied().ok_or_else(|| {
                            PacktrieError::Internal("slice bit set without a child".to_string())
                        })?
                    } else {
                        layers.push(LayerData::new());
                        let id = layers.len() - 1;
                        layers[layer_id].children.push(id);
                        id
                    };
                    current[i] = child;
                }
                layers[layer_id].set_bit(slice);
            }
        }

        let ptr_width = self.ptr_width(&layers)?;

        // Layers are serialized in creation order; children always land
        // after their parent.
        let mut body = 0usize;
        for layer in layers.iter_mut() {
            layer.offset = body;
            body += layer.size(bitmask_bytes, ptr_width);
        }

        let header = IndexHeader {
            levels,
            bitmask_width: self.bitmask_width,
            ptr_width: ptr_width as u8,
            value_width: self.value_width,
        };

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + body);
        buf.put_u16_le(header.encode());
        for layer in &layers {
            buf.put_slice(&layer.bitmask.to_le_bytes()[..bitmask_bytes]);
            if !layer.children.is_empty() {
                for &child in &layer.children {
                    pointer::encode_into(&mut buf, layers[child].offset as u32, ptr_width);
                }
            } else {
                buf.put_slice(&layer.values);
            }
        }
        debug_assert_eq!(buf.len(), HEADER_SIZE + body);

        debug!(
            keys = keys.len(),
            levels,
            layers = layers.len(),
            ptr_width,
            bytes = buf.len(),
            "serialized index"
        );

        Ok(buf.freeze())
    }
}

//! Little-endian child pointer codec.
//!
//! A pointer holds the byte offset of a child layer, measured from the
//! first byte after the header. It is stored as 1..=4 little-endian
//! bytes and zero-extended on decode.

use bytes::{BufMut, BytesMut};

/// Maximum pointer width in bytes.
pub const MAX_WIDTH: usize = 4;

/// Appends `offset` as `width` little-endian bytes.
///
/// The caller guarantees the offset is representable in `width` bytes;
/// the builder's pointer-width selection maintains this.
#[inline]
pub fn encode_into(buf: &mut BytesMut, offset: u32, width: usize) {
    debug_assert!((1..=MAX_WIDTH).contains(&width));
    debug_assert!(width == MAX_WIDTH || u64::from(offset) < 1u64 << (8 * width));
    buf.put_slice(&offset.to_le_bytes()[..width]);
}

/// Decodes 1..=4 little-endian bytes into an offset, zero-extending.
#[inline]
pub fn decode(bytes: &[u8]) -> usize {
    debug_assert!((1..=MAX_WIDTH).contains(&bytes.len()));
    let mut raw = [0u8; MAX_WIDTH];
    raw[..bytes.len()].copy_from_slice(bytes);
    u32::from_le_bytes(raw) as usize
}

//! Serialized HAMT index: a build-once, read-many mapping from `u64`
//! keys to fixed-width values.
//!
//! The whole index is one contiguous little-endian buffer whose
//! in-memory footprint equals its serialized size:
//!
//! ```text
//! <header: 2 bytes> <layer> <layer> ...
//! ```
//!
//! Each layer is a bitmask followed by either child pointers (inner
//! levels) or values (leaf level). Successive slices of the key index
//! the levels; popcount rank over the bitmask locates the child or
//! value for a slice. [`IndexWriter`] serializes sorted keys and values;
//! [`IndexReader`] answers point lookups directly against the bytes.
//!
//! ```
//! use packtrie_index::{BitmaskWidth, IndexReader, IndexWriter, ValueWidth};
//!
//! # fn main() -> packtrie_index::Result<()> {
//! let writer = IndexWriter::new(BitmaskWidth::U16, ValueWidth::U32);
//! let buffer = writer.dump_u32s(&[3, 17, 900], &[30, 170, 9000])?;
//!
//! let reader = IndexReader::new(&buffer)?;
//! assert_eq!(reader.get_u32(17), Some(170));
//! assert_eq!(reader.get_u32(18), None);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod header;
pub mod pointer;
pub mod reader;

#[cfg(test)]
mod proptests;

pub use builder::IndexWriter;
pub use header::{IndexHeader, HEADER_SIZE};
pub use reader::IndexReader;

pub use packtrie_common::{BitmaskWidth, PacktrieError, Result, ValueWidth};

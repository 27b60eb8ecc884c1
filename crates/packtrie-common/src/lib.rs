//! packtrie common types, errors, and format parameters.
//!
//! This crate provides the definitions shared between the index builder
//! and the index reader.

pub mod error;
pub mod types;

pub use error::{PacktrieError, Result};
pub use types::{BitmaskWidth, ValueWidth};

//! Self-describing binary field codec for the SLIM protocol.
//!
//! Every field a SLIM packet carries is introduced by a one-byte type tag,
//! followed by a fixed-width, variable-length, or length-prefixed payload.
//! [`FieldWriter`] builds such bodies, [`FieldReader`] walks them, and the
//! [`varint`] module implements the two variable-length integer encodings
//! the framing layers also rely on.

#![warn(rust_2018_idioms)]

pub mod data_type;
pub mod error;
pub mod reader;
pub mod varint;
pub mod writer;

pub use data_type::DataType;
pub use error::{Error, Result};
pub use reader::FieldReader;
pub use writer::{ArrayBuilder, FieldWriter};

use std::string::FromUtf8Error;

use thiserror::Error;

use crate::data_type::DataType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("VarInt is wider than 32 bits")]
    ErrVarIntOverflow,
    #[error("VarLong is wider than 64 bits")]
    ErrVarLongOverflow,
    #[error("expected a {expected} field, found {actual}")]
    ErrTypeMismatch {
        expected: DataType,
        actual: DataType,
    },
    #[error("value does not fit the declared field width")]
    ErrValueOutOfRange,
    #[error("unknown data type id {id:#04x}")]
    ErrUnknownTypeId { id: u8 },
    #[error("read past the end of the buffer")]
    ErrReadPastEnd,
    #[error("array has {actual} elements, expected exactly {expected}")]
    ErrArrayLengthMismatch { expected: usize, actual: usize },
    #[error("utf8: {0}")]
    ErrUtf8(#[from] FromUtf8Error),
}

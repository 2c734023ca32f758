use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("socket is closed")]
    ErrAlreadyClosed,
    #[error("socket is already bound")]
    ErrAlreadyBound,
    #[error("socket is not bound")]
    ErrNotBound,
    #[error("bind failed: {0}")]
    ErrBindFailed(#[source] IoError),
    #[error("send failed: {0}")]
    ErrSendFailed(#[source] IoError),
    #[error("{0}")]
    Wire(#[from] wire::Error),
    #[error("{0}")]
    Io(#[source] IoError),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

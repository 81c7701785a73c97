use thiserror::Error;

use crate::validator::ValidationError;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed wire bytes. Decode failure is always surfaced — a caller
    /// never receives a zero-valued message in place of an error.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("expected a {expected} message, got {found}")]
    UnexpectedMessage {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown failure code: {0}")]
    UnknownFailureCode(u8),

    #[error("PSET error: {0}")]
    Pset(String),

    #[error("swap validation failed: {0}")]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// A textual or binary value that cannot be decoded into an identifier.
///
/// Every variant is a malformed-identifier condition; callers that only
/// care about the class can match on the type as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("malformed identifier: expected {expected} hex characters, got {actual}")]
    HexLength { expected: usize, actual: usize },

    #[error("malformed identifier: invalid hex string: {0}")]
    InvalidHex(String),

    #[error("malformed identifier: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
}

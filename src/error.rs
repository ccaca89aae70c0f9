use thiserror::Error;

/// Main error type for TLV codec operations
#[derive(Error, Debug)]
pub enum TlvError {
    /// A tag, length-of-length or integer value exceeds the 4-byte
    /// representational limit of this implementation.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// The buffer violates the TLV structure rules, e.g. an indefinite
    /// length on a primitive tag.
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// The buffer is truncated or otherwise malformed.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for TLV codec operations
pub type TlvResult<T> = Result<T, TlvError>;

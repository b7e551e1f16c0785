use shared_types::Hash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreimageError {
    #[error("Preimage not found: 0x{}", hex::encode(key))]
    NotFound { key: Hash },

    #[error("Invalid preimage key type: {0}")]
    InvalidKeyType(u8),

    #[error("Hint is not valid UTF-8")]
    InvalidHint,

    #[error("Hint of {len} bytes exceeds the {max} byte limit")]
    HintTooLong { len: usize, max: usize },

    #[error("Hint handler failed: {0}")]
    HintRejected(String),

    #[error("Stream closed mid-message")]
    UnexpectedEof,

    #[error("Preimage server cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PreimageResult<T> = Result<T, PreimageError>;

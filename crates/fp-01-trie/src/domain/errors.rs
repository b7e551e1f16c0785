use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrieError {
    #[error("Key not found: 0x{}", hex::encode(key))]
    NotFound { key: Vec<u8> },

    #[error("Proof too deep: {depth} nodes, max {max}")]
    ProofTooDeep { depth: usize, max: usize },

    #[error("Malformed proof: {0}")]
    MalformedProof(String),
}

pub type TrieResult<T> = Result<T, TrieError>;

//! Error types for the bisection subsystem.

use fp_01_trie::TrieError;
use fp_03_mips_vm::VmError;
use fp_04_dispute_game::{GameError, GameId, LedgerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BisectionError {
    #[error("proof generation failed at step {step}: {reason}")]
    ProofGenerationFailed { step: u64, reason: String },

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("game: {0}")]
    Game(#[from] GameError),

    #[error("execution: {0}")]
    Execution(#[from] VmError),

    #[error("state: {0}")]
    State(#[from] TrieError),

    #[error("no state for batch {batch_index}")]
    BatchNotFound { batch_index: u64 },

    #[error("not a participant in game 0x{}", hex::encode(.0))]
    NotParticipant(GameId),

    #[error("no claim at step {step}")]
    StepNotClaimed { step: u64 },

    #[error("claims diverge at step {found}, game is at step {expected}")]
    DivergenceMismatch { found: u64, expected: u64 },

    #[error("local state of batch {batch_index} does not match its output")]
    OutputMismatch { batch_index: u64 },

    #[error("bisection cancelled")]
    Cancelled,
}

pub type BisectionResult<T> = Result<T, BisectionError>;

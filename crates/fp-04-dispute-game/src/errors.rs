//! Error types for the dispute game and the ledger around it.

use fp_03_mips_vm::VmError;
use thiserror::Error;

use crate::domain::GameId;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("game already resolved")]
    GameResolved,

    #[error("claim {index} not found")]
    ClaimNotFound { index: usize },

    /// Moves must target the latest claim.
    #[error("out-of-order move: parent {parent}, latest claim {latest}")]
    OutOfOrderMove { parent: usize, latest: usize },

    #[error("maximum depth reached, only a step is allowed")]
    MaxDepthReached,

    #[error("the root claim cannot be defended")]
    CannotDefendRoot,

    #[error("claimant cannot counter its own claim")]
    SelfCounter,

    #[error("step requires a single-instruction range, have {width}")]
    NotAtMaxDepth { width: u64 },

    #[error("step already taken")]
    StepAlreadyTaken,

    #[error("claim {index} is not the disputed claim {disputed}")]
    InvalidClaimIndex { index: usize, disputed: usize },

    #[error("pre-state mismatch: expected 0x{}, got 0x{}", hex::encode(.expected), hex::encode(.actual))]
    PreStateMismatch { expected: [u8; 32], actual: [u8; 32] },

    #[error("game not resolvable yet")]
    NotResolvable,

    #[error("trace length {0} is not a power of two")]
    InvalidTraceLength(u64),

    #[error("step verification failed: {0}")]
    StepVerification(#[from] VmError),

    #[error("invalid final state: {0}")]
    InvalidFinalState(VmError),

    #[error("final state commits to memory 0x{}, not output root 0x{}", hex::encode(.mem_root), hex::encode(.root))]
    OutputRootMismatch { root: [u8; 32], mem_root: [u8; 32] },

    #[error("final state at step {step} lies beyond the {trace_length}-step trace")]
    FinalStateBeyondTrace { step: u64, trace_length: u64 },
}

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("game 0x{} not found", hex::encode(.0))]
    GameNotFound(GameId),

    #[error("no output for batch {batch_index}")]
    OutputNotFound { batch_index: u64 },

    #[error("batch {batch_index} already has an active dispute")]
    DuplicateGame { batch_index: u64 },

    #[error("output for batch {batch_index} already submitted")]
    DuplicateOutput { batch_index: u64 },

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("ledger call failed: {0}")]
    CallFailed(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

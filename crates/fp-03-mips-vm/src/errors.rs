//! # Error Types
//!
//! Errors raised while decoding, stepping, or verifying VM states.

use fp_02_preimage_oracle::PreimageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    /// Encoded state shorter than the fixed record size.
    #[error("invalid state data: {len} bytes, need {expected}")]
    InvalidStateData { len: usize, expected: usize },

    /// Oracle lookup failed (missing preimage or bad key type).
    #[error("preimage oracle: {0}")]
    Preimage(#[from] PreimageError),

    /// Program exited with a code above 1.
    #[error("VM panicked with exit code {exit_code}")]
    Panic { exit_code: u8 },

    /// Program exited with code 1.
    #[error("VM exited with invalid status")]
    Invalid,

    #[error("max steps exceeded: {max_steps}")]
    MaxStepsExceeded { max_steps: u64 },

    #[error("unaligned access at 0x{addr:x}")]
    UnalignedAccess { addr: u64 },

    #[error("unsupported instruction 0x{insn:08x} at pc 0x{pc:x}")]
    UnsupportedInstruction { insn: u32, pc: u64 },

    #[error("invalid witness: {0}")]
    InvalidWitness(String),
}

pub type VmResult<T> = Result<T, VmError>;

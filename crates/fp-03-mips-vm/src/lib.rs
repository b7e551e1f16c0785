//! # fp-03-mips-vm
//!
//! Deterministic MIPS64-subset VM for fault proofs.
//!
//! - [`domain`]: the 444-byte state record, its status-tagged hash and the
//!   one-step witness format.
//! - [`mips`]: decoder, interpreter, syscalls and trie-committed memory.
//! - [`verifier`]: replays one instruction from `(state_data, proof_data)`.
//! - [`executor`]: runs a program locally to answer "hash at step N" and
//!   build step proofs.
//! - [`program`]: a small assembler and the demo programs.
//!
//! Stepping is a pure function of the pre-state, the memory image and the
//! oracle contents. Two honest parties always compute the same post-state.

pub mod domain;
pub mod errors;
pub mod executor;
pub mod mips;
pub mod ports;
pub mod program;
pub mod verifier;

pub use domain::*;
pub use errors::{VmError, VmResult};
pub use executor::{LocalExecutor, RunResult, StepProof};
pub use mips::{step, Interpreter, Memory};
pub use ports::{PreimageKeyDerivation, ShiftInKeyDerivation};
pub use program::Program;
pub use verifier::{verify_step, StepVerification};

//! # Shared Types Crate
//!
//! Primitive aliases and hashing helpers used across the fault-proof
//! subsystems.
//!
//! - `Hash` / `Address` byte-array aliases
//! - `keccak256` and its multi-slice variant
//! - shortened hex rendering for log lines

pub mod entities;

pub use entities::*;

//! # fp-02-preimage-oracle
//!
//! Content-addressed preimage store and the wire protocol the VM's program
//! uses to fetch preimages and send hints.
//!
//! ## Keys
//!
//! Every key is 32 bytes with the type tag in byte 0:
//!
//! | Tag | Type | Derivation |
//! |-----|------|------------|
//! | 1 | Local | ident big-endian in bytes 24..32 |
//! | 2 | Keccak256 | keccak256(value), byte 0 := 2 |
//! | 4 | Sha256 | sha256(value), byte 0 := 4 |
//! | 5 | Blob | externally derived |
//! | 6 | Precompile | externally derived |
//!
//! ## Wire Protocol
//!
//! Two independent byte streams:
//!
//! ```text
//! preimage:  → key[32]            ← len_be[8] ‖ value[len]
//! hint:      → len_be[4] ‖ utf8   ← ack[1] = 0x00
//! ```
//!
//! Hints longer than `MAX_HINT_LEN` close the hint channel with an error.
//!
//! Each channel loops until the peer closes the stream at a message
//! boundary or the shutdown signal fires.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use error::*;
pub use ports::*;
pub use service::{PreimageServer, MAX_HINT_LEN};

//! # fp-01-trie
//!
//! State-commitment trie for the fault-proof system.
//!
//! ## Role in System
//!
//! - **Output roots**: the proposer commits each batch's key/value state as
//!   the root of this trie; the challenger recomputes it to detect bad claims.
//! - **VM memory**: the MIPS VM keys its word-addressed memory by this trie,
//!   so `memRoot` in the VM state is a trie root.
//!
//! ## Node Encoding
//!
//! Radix-16 Merkle Patricia Trie with a compact tagged encoding (not RLP):
//!
//! ```text
//! Leaf      = keccak(0x01 ‖ varint(len path) ‖ path ‖ varint(len value) ‖ value)
//! Branch    = keccak(0x02 ‖ child_hash[0..16] ‖ [varint(len value) ‖ value])
//! Extension = keccak(0x03 ‖ varint(len path) ‖ path ‖ child_hash)
//! Empty     = 0x00 * 32
//! ```
//!
//! Paths are nibble arrays, one nibble per byte.

pub mod domain;

pub use domain::*;

pub mod encoding;
pub mod errors;
pub mod nibbles;
pub mod node;
pub mod proofs;
pub mod trie;

pub use errors::*;
pub use nibbles::Nibbles;
pub use node::{NodeKind, TrieNode};
pub use proofs::{verify_proof, Proof, ProofNode, MAX_PROOF_DEPTH};
pub use shared_types::{Hash, ZERO_HASH};
pub use trie::Trie;

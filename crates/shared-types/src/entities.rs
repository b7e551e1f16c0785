//! # Core Primitives
//!
//! Hash and address aliases plus the Keccak-256 helpers every subsystem
//! hashes with. All consensus hashes in the system are Keccak-256.

use sha3::{Digest, Keccak256};

/// A 32-byte Keccak-256 digest.
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// The all-zero hash. Also the root of an empty trie.
pub const ZERO_HASH: Hash = [0u8; 32];

/// The all-zero address.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Keccak-256 of a single byte slice.
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// Keccak-256 over the concatenation of `parts`, without allocating the
/// concatenated buffer.
pub fn keccak256_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// First four bytes of a hash as hex, for log lines.
pub fn short_hex(hash: &Hash) -> String {
    format!("0x{}..", hex::encode(&hash[..4]))
}

/// Parse a `0x`-prefixed (or bare) 20-byte hex address.
pub fn parse_address(value: &str) -> Option<Address> {
    let raw = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(raw).ok()?;
    bytes.try_into().ok()
}

/// Derive a deterministic address from a label. Used for test and demo
/// participants that have no key material.
pub fn address_from_label(label: &str) -> Address {
    let digest = keccak256(label.as_bytes());
    let mut address = ZERO_ADDRESS;
    address.copy_from_slice(&digest[12..]);
    address
}

//! Pluggable hooks consumed by the interpreter.

use shared_types::Hash;

/// Derives the next preimage key from bytes the program writes to the
/// preimage-request descriptor.
pub trait PreimageKeyDerivation: Send + Sync {
    fn derive_key(&self, current: &Hash, written: &[u8]) -> Hash;
}

/// Shift the written bytes in from the right: the key is the last 32 bytes
/// of `current ‖ written`. Writing a full 32-byte key in any number of
/// chunks therefore leaves exactly that key.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShiftInKeyDerivation;

impl PreimageKeyDerivation for ShiftInKeyDerivation {
    fn derive_key(&self, current: &Hash, written: &[u8]) -> Hash {
        let n = written.len().min(32);
        let mut key = [0u8; 32];
        key[..32 - n].copy_from_slice(&current[n..]);
        key[32 - n..].copy_from_slice(&written[written.len() - n..]);
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunked_writes_build_full_key() {
        let target: Hash = std::array::from_fn(|i| i as u8 + 1);
        let mut key = [0xFF; 32];
        for chunk in target.chunks(8) {
            key = ShiftInKeyDerivation.derive_key(&key, chunk);
        }
        assert_eq!(key, target);
    }

    #[test]
    fn test_partial_write_shifts() {
        let current = [0xAA; 32];
        let key = ShiftInKeyDerivation.derive_key(&current, &[1, 2]);
        assert_eq!(&key[..30], &[0xAA; 30]);
        assert_eq!(&key[30..], &[1, 2]);
    }
}

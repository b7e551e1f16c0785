use serde::{Deserialize, Serialize};

// =============================================================================
// NIBBLES: Half-byte path representation
// =============================================================================

/// Nibble path for trie traversal.
///
/// Each key byte becomes two nibbles, high nibble first. Stored one nibble
/// per byte, which is also the on-the-wire form hashed into leaf and
/// extension nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nibbles(pub Vec<u8>);

impl Nibbles {
    /// Expand raw key bytes into nibbles.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut nibbles = Vec::with_capacity(bytes.len() * 2);
        for byte in bytes {
            nibbles.push(byte >> 4);
            nibbles.push(byte & 0x0F);
        }
        Nibbles(nibbles)
    }

    /// Wrap an existing nibble slice.
    pub fn from_slice(nibbles: &[u8]) -> Self {
        Nibbles(nibbles.to_vec())
    }

    /// `prefix ‖ self`, used when compaction pulls a child up into its parent.
    pub fn prepend(&self, prefix: &[u8]) -> Self {
        let mut joined = Vec::with_capacity(prefix.len() + self.0.len());
        joined.extend_from_slice(prefix);
        joined.extend_from_slice(&self.0);
        Nibbles(joined)
    }

    /// Length of the shared prefix with `other`.
    pub fn common_prefix_len(&self, other: &[u8]) -> usize {
        self.0
            .iter()
            .zip(other.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

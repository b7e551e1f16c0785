use std::sync::OnceLock;

use super::encoding;
use super::nibbles::Nibbles;
use shared_types::{Hash, ZERO_HASH};

// =============================================================================
// TRIE NODE: Owned tree with memoized hashes
// =============================================================================

/// The four node shapes of the trie.
///
/// Children are owned by their parent; there is no sharing between nodes,
/// so `Clone` is a deep copy.
#[derive(Clone, Debug, Default)]
pub enum NodeKind {
    /// Absent subtree, hashes to `ZERO_HASH`.
    #[default]
    Empty,

    /// Remaining path and the stored value.
    Leaf { path: Nibbles, value: Vec<u8> },

    /// Shared prefix over a single child.
    Extension { path: Nibbles, child: Box<TrieNode> },

    /// 16-way fan-out with an optional value for keys ending here.
    Branch {
        children: Box<[TrieNode; 16]>,
        value: Option<Vec<u8>>,
    },
}

/// A trie node plus its lazily computed hash.
///
/// The cache is only ever filled, never cleared in place: mutations rebuild
/// every node on the touched path, so a rebuilt node starts with an empty
/// cache while untouched siblings keep theirs.
#[derive(Clone, Debug, Default)]
pub struct TrieNode {
    kind: NodeKind,
    cached_hash: OnceLock<Hash>,
}

impl From<NodeKind> for TrieNode {
    fn from(kind: NodeKind) -> Self {
        TrieNode {
            kind,
            cached_hash: OnceLock::new(),
        }
    }
}

impl TrieNode {
    pub fn empty() -> Self {
        NodeKind::Empty.into()
    }

    pub fn leaf(path: Nibbles, value: Vec<u8>) -> Self {
        NodeKind::Leaf { path, value }.into()
    }

    pub fn extension(path: Nibbles, child: TrieNode) -> Self {
        NodeKind::Extension {
            path,
            child: Box::new(child),
        }
        .into()
    }

    pub fn branch(children: Box<[TrieNode; 16]>, value: Option<Vec<u8>>) -> Self {
        NodeKind::Branch { children, value }.into()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn into_kind(self) -> NodeKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, NodeKind::Empty)
    }

    /// Node hash, computed on first use and memoized.
    pub fn hash(&self) -> Hash {
        *self.cached_hash.get_or_init(|| self.compute_hash())
    }

    fn compute_hash(&self) -> Hash {
        match &self.kind {
            NodeKind::Empty => ZERO_HASH,
            NodeKind::Leaf { path, value } => encoding::leaf_hash(path.as_slice(), value),
            NodeKind::Extension { path, child } => {
                encoding::extension_hash(path.as_slice(), &child.hash())
            }
            NodeKind::Branch { children, value } => {
                encoding::branch_hash(&child_hashes(children), value.as_deref())
            }
        }
    }

    /// Number of key/value entries stored in this subtree.
    pub fn entry_count(&self) -> usize {
        match &self.kind {
            NodeKind::Empty => 0,
            NodeKind::Leaf { .. } => 1,
            NodeKind::Extension { child, .. } => child.entry_count(),
            NodeKind::Branch { children, value } => {
                children.iter().map(TrieNode::entry_count).sum::<usize>()
                    + usize::from(value.is_some())
            }
        }
    }
}

/// Hashes of all 16 branch slots, `ZERO_HASH` for empty ones.
pub fn child_hashes(children: &[TrieNode; 16]) -> [Hash; 16] {
    std::array::from_fn(|i| children[i].hash())
}

pub fn empty_children() -> Box<[TrieNode; 16]> {
    Box::default()
}

//! # Inclusion Proofs
//!
//! A proof lists every node on the path from the root to the node that
//! stores the value. Verification walks the list top-down without
//! recursion: each node must hash to the reference its parent holds, and
//! the walk must consume the key's nibbles exactly.

use serde::{Deserialize, Serialize};

use super::encoding::{self, BRANCH_TAG, EXTENSION_TAG, LEAF_TAG};
use super::nibbles::Nibbles;
use super::node::{child_hashes, NodeKind, TrieNode};
use super::{TrieError, TrieResult};
use shared_types::{Hash, ZERO_HASH};

/// Upper bound on proof length accepted by the verifier.
pub const MAX_PROOF_DEPTH: usize = 512;

/// A single node as recorded in a proof. Children are referenced by hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofNode {
    Leaf {
        path: Nibbles,
        value: Vec<u8>,
    },
    Extension {
        path: Nibbles,
        child: Hash,
    },
    Branch {
        children: Box<[Hash; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl ProofNode {
    /// Proof form of a trie node; `None` for an empty subtree.
    pub fn from_node(node: &TrieNode) -> Option<Self> {
        let proof_node = match node.kind() {
            NodeKind::Empty => return None,
            NodeKind::Leaf { path, value } => ProofNode::Leaf {
                path: path.clone(),
                value: value.clone(),
            },
            NodeKind::Extension { path, child } => ProofNode::Extension {
                path: path.clone(),
                child: child.hash(),
            },
            NodeKind::Branch { children, value } => ProofNode::Branch {
                children: Box::new(child_hashes(children)),
                value: value.clone(),
            },
        };
        Some(proof_node)
    }

    pub fn hash(&self) -> Hash {
        match self {
            ProofNode::Leaf { path, value } => encoding::leaf_hash(path.as_slice(), value),
            ProofNode::Extension { path, child } => {
                encoding::extension_hash(path.as_slice(), child)
            }
            ProofNode::Branch { children, value } => {
                encoding::branch_hash(children, value.as_deref())
            }
        }
    }
}

/// Inclusion proof for one key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub nodes: Vec<ProofNode>,
}

/// `true` when `proof` shows its key/value pair is committed under `root`.
pub fn verify_proof(root: &Hash, proof: &Proof) -> bool {
    proof.verify(root).is_ok()
}

impl Proof {
    /// Verify against `root`, reporting why a proof is rejected.
    pub fn verify(&self, root: &Hash) -> TrieResult<()> {
        if self.nodes.len() > MAX_PROOF_DEPTH {
            return Err(TrieError::ProofTooDeep {
                depth: self.nodes.len(),
                max: MAX_PROOF_DEPTH,
            });
        }
        if self.nodes.is_empty() {
            return Err(malformed("empty proof"));
        }

        let key_path = Nibbles::from_bytes(&self.key);
        let mut rest = key_path.as_slice();
        let mut expected = *root;

        for (i, node) in self.nodes.iter().enumerate() {
            if node.hash() != expected {
                return Err(malformed(format!("hash mismatch at node {i}")));
            }
            let is_last = i + 1 == self.nodes.len();

            match node {
                ProofNode::Leaf { path, value } => {
                    if !is_last || path.as_slice() != rest || *value != self.value {
                        return Err(malformed("leaf does not match key/value"));
                    }
                    return Ok(());
                }
                ProofNode::Extension { path, child } => {
                    if is_last || !rest.starts_with(path.as_slice()) {
                        return Err(malformed("extension path diverges"));
                    }
                    rest = &rest[path.len()..];
                    expected = *child;
                }
                ProofNode::Branch { children, value } => match rest.split_first() {
                    None => {
                        if !is_last || value.as_deref() != Some(self.value.as_slice()) {
                            return Err(malformed("branch value does not match"));
                        }
                        return Ok(());
                    }
                    Some((nibble, tail)) => {
                        if is_last {
                            return Err(malformed("proof ends at a branch"));
                        }
                        expected = children[*nibble as usize];
                        rest = tail;
                    }
                },
            }
        }

        Err(malformed("proof ended early"))
    }

    // =========================================================================
    // WIRE FORMAT
    // =========================================================================

    /// Serialize for external verifiers.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_bytes(&self.key, &mut out);
        write_bytes(&self.value, &mut out);
        encoding::encode_length(self.nodes.len(), &mut out);

        for node in &self.nodes {
            let mut children = [ZERO_HASH; 16];
            match node {
                ProofNode::Leaf { path, value } => {
                    out.push(LEAF_TAG);
                    write_bytes(path.as_slice(), &mut out);
                    out.push(1);
                    write_bytes(value, &mut out);
                }
                ProofNode::Extension { path, child } => {
                    out.push(EXTENSION_TAG);
                    write_bytes(path.as_slice(), &mut out);
                    out.push(0);
                    children[0] = *child;
                }
                ProofNode::Branch {
                    children: hashes,
                    value,
                } => {
                    out.push(BRANCH_TAG);
                    write_bytes(&[], &mut out);
                    match value {
                        Some(value) => {
                            out.push(1);
                            write_bytes(value, &mut out);
                        }
                        None => out.push(0),
                    }
                    children = **hashes;
                }
            }
            for child in &children {
                out.extend_from_slice(child);
            }
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> TrieResult<Self> {
        let mut reader = Reader { bytes, pos: 0 };
        let key = reader.bytes()?.to_vec();
        let value = reader.bytes()?.to_vec();
        let count = reader.length()?;
        if count > MAX_PROOF_DEPTH {
            return Err(TrieError::ProofTooDeep {
                depth: count,
                max: MAX_PROOF_DEPTH,
            });
        }

        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = reader.byte()?;
            let path = Nibbles::from_slice(reader.bytes()?);
            let node_value = match reader.byte()? {
                0 => None,
                1 => Some(reader.bytes()?.to_vec()),
                other => return Err(malformed(format!("bad value flag {other}"))),
            };
            let mut children = [ZERO_HASH; 16];
            for child in children.iter_mut() {
                child.copy_from_slice(reader.take(32)?);
            }

            nodes.push(match tag {
                LEAF_TAG => ProofNode::Leaf {
                    path,
                    value: node_value.ok_or_else(|| malformed("leaf without value"))?,
                },
                EXTENSION_TAG => ProofNode::Extension {
                    path,
                    child: children[0],
                },
                BRANCH_TAG => ProofNode::Branch {
                    children: Box::new(children),
                    value: node_value,
                },
                other => return Err(malformed(format!("unknown node tag {other}"))),
            });
        }

        if reader.pos != bytes.len() {
            return Err(malformed("trailing bytes"));
        }
        Ok(Proof { key, value, nodes })
    }
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    encoding::encode_length(bytes.len(), out);
    out.extend_from_slice(bytes);
}

fn malformed(reason: impl Into<String>) -> TrieError {
    TrieError::MalformedProof(reason.into())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> TrieResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| malformed("truncated proof"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> TrieResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn length(&mut self) -> TrieResult<usize> {
        let (value, used) = encoding::decode_length(&self.bytes[self.pos..])
            .ok_or_else(|| malformed("bad length prefix"))?;
        self.pos += used;
        Ok(value)
    }

    fn bytes(&mut self) -> TrieResult<&'a [u8]> {
        let len = self.length()?;
        self.take(len)
    }
}

use super::nibbles::Nibbles;
use super::node::{empty_children, NodeKind, TrieNode};
use super::proofs::{Proof, ProofNode};
use super::{TrieError, TrieResult};
use shared_types::Hash;

// =============================================================================
// TRIE: Radix-16 Merkle Patricia Trie
// =============================================================================

/// In-memory Merkle Patricia Trie.
///
/// Keys are arbitrary byte strings. Any insertion order of the same
/// key/value set produces the same root, and deletes compact the tree back
/// into that same canonical shape.
#[derive(Clone, Debug, Default)]
pub struct Trie {
    root: TrieNode,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root hash. The empty trie hashes to `ZERO_HASH`.
    pub fn root(&self) -> Hash {
        self.root.hash()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.root.entry_count()
    }

    /// All key/value pairs in nibble order.
    pub fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut out = Vec::with_capacity(self.len());
        collect_entries(&self.root, &mut Vec::new(), &mut out);
        out
    }

    /// Look up a key. Absent keys return `None`, not an error.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let path = Nibbles::from_bytes(key);
        let mut node = &self.root;
        let mut rest = path.as_slice();

        loop {
            match node.kind() {
                NodeKind::Empty => return None,
                NodeKind::Leaf { path, value } => {
                    return (path.as_slice() == rest).then_some(value.as_slice());
                }
                NodeKind::Extension { path, child } => {
                    if !rest.starts_with(path.as_slice()) {
                        return None;
                    }
                    rest = &rest[path.len()..];
                    node = child;
                }
                NodeKind::Branch { children, value } => match rest.split_first() {
                    None => return value.as_deref(),
                    Some((nibble, tail)) => {
                        node = &children[*nibble as usize];
                        rest = tail;
                    }
                },
            }
        }
    }

    /// Insert or overwrite `key`.
    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) {
        let path = Nibbles::from_bytes(key);
        let root = std::mem::take(&mut self.root);
        self.root = insert_at(root, path.as_slice(), value);
    }

    /// Remove `key`. Returns `false` and leaves the trie untouched when the
    /// key is absent.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        if self.get(key).is_none() {
            return false;
        }
        let path = Nibbles::from_bytes(key);
        let root = std::mem::take(&mut self.root);
        self.root = delete_at(root, path.as_slice());
        true
    }

    /// Build an inclusion proof for `key`: every node on the path from the
    /// root down to the node holding the value.
    pub fn prove(&self, key: &[u8]) -> TrieResult<Proof> {
        let not_found = || TrieError::NotFound { key: key.to_vec() };
        let path = Nibbles::from_bytes(key);
        let mut nodes = Vec::new();
        let mut node = &self.root;
        let mut rest = path.as_slice();

        loop {
            match node.kind() {
                NodeKind::Empty => return Err(not_found()),
                NodeKind::Leaf { path, value } => {
                    if path.as_slice() != rest {
                        return Err(not_found());
                    }
                    nodes.extend(ProofNode::from_node(node));
                    return Ok(Proof {
                        key: key.to_vec(),
                        value: value.clone(),
                        nodes,
                    });
                }
                NodeKind::Extension { path, child } => {
                    if !rest.starts_with(path.as_slice()) {
                        return Err(not_found());
                    }
                    nodes.extend(ProofNode::from_node(node));
                    rest = &rest[path.len()..];
                    node = child;
                }
                NodeKind::Branch { children, value } => {
                    nodes.extend(ProofNode::from_node(node));
                    match rest.split_first() {
                        None => {
                            let value = value.as_ref().ok_or_else(not_found)?;
                            return Ok(Proof {
                                key: key.to_vec(),
                                value: value.clone(),
                                nodes,
                            });
                        }
                        Some((nibble, tail)) => {
                            node = &children[*nibble as usize];
                            rest = tail;
                        }
                    }
                }
            }
        }
    }
}

// =============================================================================
// INSERT
// =============================================================================

fn insert_at(node: TrieNode, path: &[u8], value: Vec<u8>) -> TrieNode {
    match node.into_kind() {
        NodeKind::Empty => TrieNode::leaf(Nibbles::from_slice(path), value),

        NodeKind::Leaf {
            path: leaf_path,
            value: leaf_value,
        } => {
            if leaf_path.as_slice() == path {
                return TrieNode::leaf(leaf_path, value);
            }
            let common = leaf_path.common_prefix_len(path);
            let mut children = empty_children();
            let mut branch_value = None;
            place_suffix(&mut children, &mut branch_value, &leaf_path.as_slice()[common..], leaf_value);
            place_suffix(&mut children, &mut branch_value, &path[common..], value);
            with_prefix(&path[..common], TrieNode::branch(children, branch_value))
        }

        NodeKind::Extension {
            path: ext_path,
            child,
        } => {
            let common = ext_path.common_prefix_len(path);
            if common == ext_path.len() {
                let child = insert_at(*child, &path[common..], value);
                return TrieNode::extension(ext_path, child);
            }

            // Split: the old extension's remainder hangs off a new branch.
            let mut children = empty_children();
            let mut branch_value = None;
            let old_rest = &ext_path.as_slice()[common..];
            children[old_rest[0] as usize] = if old_rest.len() == 1 {
                *child
            } else {
                TrieNode::extension(Nibbles::from_slice(&old_rest[1..]), *child)
            };
            place_suffix(&mut children, &mut branch_value, &path[common..], value);
            with_prefix(&path[..common], TrieNode::branch(children, branch_value))
        }

        NodeKind::Branch {
            mut children,
            value: branch_value,
        } => match path.split_first() {
            None => TrieNode::branch(children, Some(value)),
            Some((nibble, tail)) => {
                let slot = *nibble as usize;
                let child = std::mem::take(&mut children[slot]);
                children[slot] = insert_at(child, tail, value);
                TrieNode::branch(children, branch_value)
            }
        },
    }
}

/// Put a diverging suffix under a fresh branch: as the branch value when the
/// suffix is exhausted, otherwise as a leaf under its first nibble.
fn place_suffix(
    children: &mut [TrieNode; 16],
    branch_value: &mut Option<Vec<u8>>,
    suffix: &[u8],
    value: Vec<u8>,
) {
    match suffix.split_first() {
        None => *branch_value = Some(value),
        Some((nibble, tail)) => {
            children[*nibble as usize] = TrieNode::leaf(Nibbles::from_slice(tail), value);
        }
    }
}

fn with_prefix(prefix: &[u8], node: TrieNode) -> TrieNode {
    if prefix.is_empty() {
        node
    } else {
        TrieNode::extension(Nibbles::from_slice(prefix), node)
    }
}

// =============================================================================
// DELETE + COMPACTION
// =============================================================================

/// Remove a key known to be present under `node`.
fn delete_at(node: TrieNode, path: &[u8]) -> TrieNode {
    match node.into_kind() {
        NodeKind::Empty | NodeKind::Leaf { .. } => TrieNode::empty(),

        NodeKind::Extension {
            path: ext_path,
            child,
        } => {
            let child = delete_at(*child, &path[ext_path.len()..]);
            compact_extension(ext_path, child)
        }

        NodeKind::Branch {
            mut children,
            value,
        } => match path.split_first() {
            None => compact_branch(children, None),
            Some((nibble, tail)) => {
                let slot = *nibble as usize;
                let child = std::mem::take(&mut children[slot]);
                children[slot] = delete_at(child, tail);
                compact_branch(children, value)
            }
        },
    }
}

fn compact_branch(mut children: Box<[TrieNode; 16]>, value: Option<Vec<u8>>) -> TrieNode {
    let mut occupied = children
        .iter()
        .enumerate()
        .filter(|(_, child)| !child.is_empty())
        .map(|(slot, _)| slot);
    let first = occupied.next();
    let more = occupied.next().is_some();

    match (first, more, value) {
        (None, _, None) => TrieNode::empty(),
        // A lone value is a leaf with an empty remaining path, the same
        // shape insertion produces for it.
        (None, _, Some(value)) => TrieNode::leaf(Nibbles::default(), value),
        (Some(slot), false, None) => {
            let child = std::mem::take(&mut children[slot]);
            pull_up(&[slot as u8], child)
        }
        (_, _, value) => TrieNode::branch(children, value),
    }
}

fn compact_extension(path: Nibbles, child: TrieNode) -> TrieNode {
    if child.is_empty() {
        return TrieNode::empty();
    }
    pull_up(path.as_slice(), child)
}

/// Merge `prefix` into `child`: leaves and extensions absorb it into their
/// own path, a branch gets wrapped in an extension.
fn pull_up(prefix: &[u8], child: TrieNode) -> TrieNode {
    match child.into_kind() {
        NodeKind::Empty => TrieNode::empty(),
        NodeKind::Leaf { path, value } => TrieNode::leaf(path.prepend(prefix), value),
        NodeKind::Extension { path, child } => TrieNode::extension(path.prepend(prefix), *child),
        kind @ NodeKind::Branch { .. } => {
            TrieNode::extension(Nibbles::from_slice(prefix), TrieNode::from(kind))
        }
    }
}

fn collect_entries(node: &TrieNode, prefix: &mut Vec<u8>, out: &mut Vec<(Vec<u8>, Vec<u8>)>) {
    match node.kind() {
        NodeKind::Empty => {}
        NodeKind::Leaf { path, value } => {
            let mark = prefix.len();
            prefix.extend_from_slice(path.as_slice());
            out.push((pack_nibbles(prefix), value.clone()));
            prefix.truncate(mark);
        }
        NodeKind::Extension { path, child } => {
            let mark = prefix.len();
            prefix.extend_from_slice(path.as_slice());
            collect_entries(child, prefix, out);
            prefix.truncate(mark);
        }
        NodeKind::Branch { children, value } => {
            if let Some(value) = value {
                out.push((pack_nibbles(prefix), value.clone()));
            }
            for (nibble, child) in children.iter().enumerate() {
                prefix.push(nibble as u8);
                collect_entries(child, prefix, out);
                prefix.pop();
            }
        }
    }
}

/// Full keys always have an even number of nibbles.
fn pack_nibbles(nibbles: &[u8]) -> Vec<u8> {
    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use shared_types::ZERO_HASH;

    fn trie_with(entries: &[(&[u8], &[u8])]) -> Trie {
        let mut trie = Trie::new();
        for (key, value) in entries {
            trie.insert(key, value.to_vec());
        }
        trie
    }

    #[test]
    fn test_empty_trie_root_is_zero() {
        let trie = Trie::new();
        assert_eq!(trie.root(), ZERO_HASH);
        assert!(trie.is_empty());
        assert_eq!(trie.len(), 0);
    }

    #[test]
    fn test_insert_and_get() {
        let trie = trie_with(&[(b"key1", b"value1"), (b"key2", b"value2")]);
        assert_eq!(trie.get(b"key1"), Some(&b"value1"[..]));
        assert_eq!(trie.get(b"key2"), Some(&b"value2"[..]));
        assert_eq!(trie.get(b"key3"), None);
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn test_overwrite_changes_root() {
        let mut trie = trie_with(&[(b"key", b"a")]);
        let before = trie.root();
        trie.insert(b"key", b"b".to_vec());
        assert_ne!(trie.root(), before);
        assert_eq!(trie.get(b"key"), Some(&b"b"[..]));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_prefix_keys_share_branch_value() {
        let trie = trie_with(&[(b"a", b"short"), (b"ab", b"long"), (b"abc", b"longer")]);
        assert_eq!(trie.get(b"a"), Some(&b"short"[..]));
        assert_eq!(trie.get(b"ab"), Some(&b"long"[..]));
        assert_eq!(trie.get(b"abc"), Some(&b"longer"[..]));
        assert_eq!(trie.get(b""), None);
    }

    #[test]
    fn test_delete_middle_key() {
        let mut trie = trie_with(&[(b"key1", b"v1"), (b"key2", b"v2"), (b"key3", b"v3")]);
        assert!(trie.delete(b"key2"));
        assert_eq!(trie.get(b"key1"), Some(&b"v1"[..]));
        assert_eq!(trie.get(b"key2"), None);
        assert_eq!(trie.get(b"key3"), Some(&b"v3"[..]));
    }

    #[test]
    fn test_delete_absent_key_is_noop() {
        let mut trie = trie_with(&[(b"key1", b"v1")]);
        let before = trie.root();
        assert!(!trie.delete(b"key9"));
        assert!(!trie.delete(b"key"));
        assert_eq!(trie.root(), before);
    }

    #[test]
    fn test_delete_restores_canonical_root() {
        let expected = trie_with(&[(b"a", b"1"), (b"abc", b"3")]).root();

        let mut trie = trie_with(&[(b"a", b"1"), (b"ab", b"2"), (b"abc", b"3")]);
        assert!(trie.delete(b"ab"));
        assert_eq!(trie.root(), expected);

        let mut trie = trie_with(&[(b"a", b"1"), (b"abc", b"3"), (b"b", b"x")]);
        assert!(trie.delete(b"b"));
        assert_eq!(trie.root(), expected);
    }

    #[test]
    fn test_delete_prefix_value_collapses_branch() {
        let expected = trie_with(&[(b"a", b"1")]).root();
        let mut trie = trie_with(&[(b"a", b"1"), (b"ab", b"2")]);
        assert!(trie.delete(b"ab"));
        assert_eq!(trie.root(), expected);
    }

    #[test]
    fn test_delete_everything_empties_trie() {
        let mut trie = trie_with(&[(b"dog", b"1"), (b"doge", b"2"), (b"horse", b"3")]);
        for key in [&b"doge"[..], b"horse", b"dog"] {
            assert!(trie.delete(key));
        }
        assert_eq!(trie.root(), ZERO_HASH);
        assert!(trie.is_empty());
    }

    #[test]
    fn test_root_independent_of_insertion_order() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut entries: Vec<(Vec<u8>, Vec<u8>)> = (0..64)
            .map(|_| {
                let len = rng.gen_range(1..6);
                let key: Vec<u8> = (0..len).map(|_| rng.gen_range(0..4)).collect();
                (key, vec![rng.gen()])
            })
            .collect();
        entries.sort();
        entries.dedup_by(|a, b| a.0 == b.0);

        let reference = {
            let mut trie = Trie::new();
            for (k, v) in &entries {
                trie.insert(k, v.clone());
            }
            trie.root()
        };

        for _ in 0..10 {
            entries.shuffle(&mut rng);
            let mut trie = Trie::new();
            for (k, v) in &entries {
                trie.insert(k, v.clone());
            }
            assert_eq!(trie.root(), reference);
        }
    }

    #[test]
    fn test_random_deletes_match_fresh_build() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let mut entries: Vec<(Vec<u8>, Vec<u8>)> = (0..48)
            .map(|i| (vec![rng.gen_range(0..3), rng.gen_range(0..3), i], vec![i]))
            .collect();
        entries.shuffle(&mut rng);

        let mut trie = Trie::new();
        for (k, v) in &entries {
            trie.insert(k, v.clone());
        }
        let (removed, kept) = entries.split_at(entries.len() / 2);
        for (k, _) in removed {
            assert!(trie.delete(k));
        }

        let mut fresh = Trie::new();
        for (k, v) in kept {
            fresh.insert(k, v.clone());
        }
        assert_eq!(trie.root(), fresh.root());
        assert_eq!(trie.len(), kept.len());
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = trie_with(&[(b"key1", b"v1")]);
        let snapshot = original.clone();
        original.insert(b"key2", b"v2".to_vec());
        assert_eq!(snapshot.get(b"key2"), None);
        assert_ne!(snapshot.root(), original.root());
    }

    #[test]
    fn test_prove_absent_key_fails() {
        let trie = trie_with(&[(b"key1", b"v1")]);
        assert_eq!(
            trie.prove(b"nope").unwrap_err(),
            TrieError::NotFound { key: b"nope".to_vec() }
        );
    }

    #[test]
    fn test_entries_lists_every_pair() {
        let mut trie = Trie::new();
        trie.insert(b"do", b"verb".to_vec());
        trie.insert(b"dog", b"puppy".to_vec());
        trie.insert(b"horse", b"stallion".to_vec());

        let entries = trie.entries();
        assert_eq!(
            entries,
            vec![
                (b"do".to_vec(), b"verb".to_vec()),
                (b"dog".to_vec(), b"puppy".to_vec()),
                (b"horse".to_vec(), b"stallion".to_vec()),
            ]
        );
        assert!(Trie::new().entries().is_empty());
    }
}

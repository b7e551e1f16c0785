//! Per-game local inputs.
//!
//! Local keys are not content-addressed: nothing about `local_key(ident)`
//! pins the bytes behind it. Whoever verifies a step must therefore own
//! the expected data, and a witness may only repeat it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared_types::Hash;

use super::key::{key_type, local_key, PreimageKeyType};
use super::store::PreimageStore;
use crate::error::{PreimageError, PreimageResult};
use crate::ports::PreimageSource;

/// Well-known local input identifiers.
pub mod local_ident {
    pub const CHAIN_ID: u64 = 1;
    /// Big-endian `u64` index of the batch a game disputes.
    pub const BATCH_INDEX: u64 = 2;
}

/// The local inputs a game's program may read, keyed by ident.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalContext {
    inputs: BTreeMap<u64, Vec<u8>>,
}

impl LocalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, ident: u64, data: Vec<u8>) -> Self {
        self.insert(ident, data);
        self
    }

    pub fn insert(&mut self, ident: u64, data: Vec<u8>) {
        self.inputs.insert(ident, data);
    }

    pub fn get(&self, ident: u64) -> Option<&[u8]> {
        self.inputs.get(&ident).map(Vec::as_slice)
    }

    /// This context plus the batch index of the game it is bound to.
    pub fn for_batch(&self, batch_index: u64) -> Self {
        self.clone()
            .with_input(local_ident::BATCH_INDEX, batch_index.to_be_bytes().to_vec())
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &[u8])> {
        self.inputs.iter().map(|(ident, data)| (*ident, data.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    fn ident_of(key: &Hash) -> Option<u64> {
        let mut ident = [0u8; 8];
        ident.copy_from_slice(&key[24..]);
        let ident = u64::from_be_bytes(ident);
        (local_key(ident) == *key).then_some(ident)
    }
}

impl PreimageSource for LocalContext {
    /// Only canonical local keys are answered.
    fn get_preimage(&self, key: &Hash) -> PreimageResult<Vec<u8>> {
        Self::ident_of(key)
            .and_then(|ident| self.inputs.get(&ident).cloned())
            .ok_or(PreimageError::NotFound { key: *key })
    }
}

/// The oracle a program sees inside one game: local keys come from the
/// game's context, every other key from the shared store.
#[derive(Clone, Debug)]
pub struct GameOracle {
    local: LocalContext,
    store: Arc<PreimageStore>,
}

impl GameOracle {
    pub fn new(local: LocalContext, store: Arc<PreimageStore>) -> Self {
        Self { local, store }
    }

    pub fn local(&self) -> &LocalContext {
        &self.local
    }
}

impl PreimageSource for GameOracle {
    fn get_preimage(&self, key: &Hash) -> PreimageResult<Vec<u8>> {
        match key_type(key)? {
            PreimageKeyType::Local => self.local.get_preimage(key),
            _ => self.store.get_preimage(key),
        }
    }
}

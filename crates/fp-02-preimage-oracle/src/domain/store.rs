use std::collections::HashMap;

use parking_lot::RwLock;
use shared_types::{short_hex, Hash};
use tracing::debug;

use super::key::{keccak256_key, local_key, read_chunk, sha256_key, PreimageChunk};
use crate::error::{PreimageError, PreimageResult};
use crate::ports::PreimageSource;

/// Shared, read-mostly preimage map.
///
/// Reads take the shared lock; inserts and `clear` take the exclusive one.
/// The store is handed by reference (usually `Arc`) to the interpreter and
/// the wire server.
#[derive(Debug, Default)]
pub struct PreimageStore {
    preimages: RwLock<HashMap<Hash, Vec<u8>>>,
}

impl PreimageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under its Keccak256 key.
    pub fn add_preimage(&self, data: Vec<u8>) -> Hash {
        let key = keccak256_key(&data);
        debug!("[preimage] Added keccak256 preimage key={} len={}", short_hex(&key), data.len());
        self.preimages.write().insert(key, data);
        key
    }

    /// Store `data` under its Sha256 key.
    pub fn add_sha256_preimage(&self, data: Vec<u8>) -> Hash {
        let key = sha256_key(&data);
        debug!("[preimage] Added sha256 preimage key={} len={}", short_hex(&key), data.len());
        self.preimages.write().insert(key, data);
        key
    }

    /// Store program-local input under the local key for `ident`.
    pub fn add_local_data(&self, ident: u64, data: Vec<u8>) -> Hash {
        let key = local_key(ident);
        debug!("[preimage] Added local preimage ident={} len={}", ident, data.len());
        self.preimages.write().insert(key, data);
        key
    }

    /// Store `data` under a key computed elsewhere, e.g. when rebuilding an
    /// oracle from a step witness.
    pub fn insert(&self, key: Hash, data: Vec<u8>) {
        self.preimages.write().insert(key, data);
    }

    pub fn get_preimage(&self, key: &Hash) -> PreimageResult<Vec<u8>> {
        self.preimages
            .read()
            .get(key)
            .cloned()
            .ok_or(PreimageError::NotFound { key: *key })
    }

    pub fn contains(&self, key: &Hash) -> bool {
        self.preimages.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.preimages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.preimages.read().is_empty()
    }

    pub fn clear(&self) {
        self.preimages.write().clear();
    }
}

impl PreimageSource for PreimageStore {
    fn get_preimage(&self, key: &Hash) -> PreimageResult<Vec<u8>> {
        PreimageStore::get_preimage(self, key)
    }

    fn read_at(&self, key: &Hash, offset: u64) -> PreimageResult<PreimageChunk> {
        let preimages = self.preimages.read();
        let preimage = preimages
            .get(key)
            .ok_or(PreimageError::NotFound { key: *key })?;
        Ok(read_chunk(preimage, offset))
    }
}

//! # In-Memory State Provider
//!
//! Holds each batch's post-state as a trie. A batch's state is the VM
//! memory after `trace_length` steps of that batch's execution, so the
//! state root is the `mem_root` an output's final state must carry.

use std::collections::BTreeMap;

use async_trait::async_trait;
use fp_01_trie::{Proof, Trie};
use parking_lot::RwLock;
use shared_types::Hash;
use tracing::debug;

use super::LocalExecutionOracle;
use crate::errors::{BisectionError, BisectionResult};
use crate::ports::{StateProvider, VerifiableState};

#[derive(Default)]
pub struct InMemoryStateProvider {
    batches: RwLock<BTreeMap<u64, Trie>>,
}

impl InMemoryStateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches `0..count`, each the memory `oracle` ends in after
    /// `trace_length` steps of that batch.
    pub fn from_execution(
        oracle: &LocalExecutionOracle,
        count: u64,
        trace_length: u64,
    ) -> BisectionResult<Self> {
        let provider = Self::new();
        for batch in 0..count {
            let (_, memory) = oracle.executor(batch).run_to_step(trace_length)?;
            provider.insert_batch(batch, memory.trie().clone());
        }
        Ok(provider)
    }

    pub fn insert_batch(&self, batch_index: u64, state: Trie) {
        debug!(
            "[state] Batch {} stored ({} entries)",
            batch_index,
            state.len()
        );
        self.batches.write().insert(batch_index, state);
    }

    pub fn insert_entries(&self, batch_index: u64, entries: &[(Vec<u8>, Vec<u8>)]) {
        let mut trie = Trie::new();
        for (key, value) in entries {
            trie.insert(key, value.clone());
        }
        self.insert_batch(batch_index, trie);
    }

    fn with_batch<T>(&self, batch_index: u64, f: impl FnOnce(&Trie) -> T) -> BisectionResult<T> {
        self.batches
            .read()
            .get(&batch_index)
            .map(f)
            .ok_or(BisectionError::BatchNotFound { batch_index })
    }
}

#[async_trait]
impl StateProvider for InMemoryStateProvider {
    async fn get_verifiable_state(&self, batch_index: u64) -> BisectionResult<VerifiableState> {
        self.with_batch(batch_index, |trie| VerifiableState {
            batch_index,
            state_root: trie.root(),
            entries: trie.entries(),
        })
    }

    async fn generate_proof(&self, batch_index: u64, key: &[u8]) -> BisectionResult<Proof> {
        Ok(self.with_batch(batch_index, |trie| trie.prove(key))??)
    }

    async fn compute_mpt_root(&self, batch_index: u64) -> BisectionResult<Hash> {
        self.with_batch(batch_index, |trie| trie.root())
    }

    async fn latest_batch_index(&self) -> BisectionResult<Option<u64>> {
        Ok(self.batches.read().keys().next_back().copied())
    }
}

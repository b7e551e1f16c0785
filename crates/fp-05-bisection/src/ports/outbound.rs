//! Driven ports: where traces and batch state come from.

use async_trait::async_trait;
use fp_01_trie::Proof;
use fp_03_mips_vm::{StepProof, VmState};
use serde::{Deserialize, Serialize};
use shared_types::Hash;

use crate::errors::BisectionResult;

/// Runs the disputed program. May be in-process or an external VM.
///
/// Every batch runs the same program over its own local inputs, so all
/// traces start from one prestate but may end anywhere.
#[async_trait]
pub trait ExecutionOracle: Send + Sync {
    /// Hash of the state at step 0.
    fn absolute_prestate(&self) -> Hash;

    async fn state_hash_at(&self, batch_index: u64, step: u64) -> BisectionResult<Hash>;

    async fn run_to_step(&self, batch_index: u64, step: u64) -> BisectionResult<VmState>;

    /// Proof for executing the instruction at `step` of the batch's trace.
    async fn generate_proof(&self, batch_index: u64, step: u64) -> BisectionResult<StepProof>;
}

/// Post-state of a batch, as the local node computed it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableState {
    pub batch_index: u64,
    pub state_root: Hash,
    pub entries: Vec<(Vec<u8>, Vec<u8>)>,
}

#[async_trait]
pub trait StateProvider: Send + Sync {
    async fn get_verifiable_state(&self, batch_index: u64) -> BisectionResult<VerifiableState>;

    /// Inclusion proof for `key` in the batch's state trie.
    async fn generate_proof(&self, batch_index: u64, key: &[u8]) -> BisectionResult<Proof>;

    async fn compute_mpt_root(&self, batch_index: u64) -> BisectionResult<Hash>;

    /// Highest batch with local state, if any.
    async fn latest_batch_index(&self) -> BisectionResult<Option<u64>>;
}

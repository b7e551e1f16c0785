//! Execution oracle backed by the in-process interpreter.
//!
//! One executor per batch, each reading its batch's local inputs over the
//! shared preimage store. Executors are built on first use and kept.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use fp_02_preimage_oracle::{GameOracle, LocalContext, PreimageStore};
use fp_03_mips_vm::{LocalExecutor, Program, StepProof, VmState};
use parking_lot::RwLock;
use shared_types::Hash;
use tracing::debug;

use crate::errors::{BisectionError, BisectionResult};
use crate::ports::ExecutionOracle;

pub struct LocalExecutionOracle {
    /// Program image with no oracle bound yet.
    base: LocalExecutor,
    store: Arc<PreimageStore>,
    local_inputs: LocalContext,
    executors: RwLock<BTreeMap<u64, Arc<LocalExecutor>>>,
}

impl LocalExecutionOracle {
    /// `local_inputs` are shared by every batch; the batch index is added
    /// per batch.
    pub fn new(
        program: &Program,
        store: Arc<PreimageStore>,
        local_inputs: LocalContext,
    ) -> BisectionResult<Self> {
        let base = LocalExecutor::from_program(program, store.clone())?;
        Ok(Self {
            base,
            store,
            local_inputs,
            executors: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn local_inputs(&self) -> &LocalContext {
        &self.local_inputs
    }

    /// The executor a game over `batch_index` replays.
    pub fn executor(&self, batch_index: u64) -> Arc<LocalExecutor> {
        if let Some(executor) = self.executors.read().get(&batch_index) {
            return Arc::clone(executor);
        }
        let oracle = GameOracle::new(
            self.local_inputs.for_batch(batch_index),
            Arc::clone(&self.store),
        );
        let executor = Arc::new(self.base.with_oracle(Arc::new(oracle)));
        debug!("[oracle] Executor for batch {} ready", batch_index);
        Arc::clone(
            self.executors
                .write()
                .entry(batch_index)
                .or_insert(executor),
        )
    }
}

#[async_trait]
impl ExecutionOracle for LocalExecutionOracle {
    fn absolute_prestate(&self) -> Hash {
        self.base.absolute_prestate()
    }

    async fn state_hash_at(&self, batch_index: u64, step: u64) -> BisectionResult<Hash> {
        Ok(self.executor(batch_index).state_hash_at(step)?)
    }

    async fn run_to_step(&self, batch_index: u64, step: u64) -> BisectionResult<VmState> {
        let (state, _) = self.executor(batch_index).run_to_step(step)?;
        Ok(state)
    }

    async fn generate_proof(&self, batch_index: u64, step: u64) -> BisectionResult<StepProof> {
        self.executor(batch_index)
            .generate_proof(step)
            .map_err(|e| BisectionError::ProofGenerationFailed {
                step,
                reason: e.to_string(),
            })
    }
}

//! # Local Executor
//!
//! Runs a loaded program in-process and answers the questions a bisection
//! participant asks: what is the state hash at step N, and what does the
//! one-step proof from N to N+1 look like.
//!
//! Every query replays from the initial image. Programs used in disputes
//! are short, and replaying keeps the executor free of shared mutable
//! state so it can be queried from many tasks.

use std::fmt;
use std::sync::Arc;

use fp_02_preimage_oracle::PreimageSource;
use serde::{Deserialize, Serialize};
use shared_types::{short_hex, Hash};
use tracing::debug;

use crate::domain::{StepWitness, VmState};
use crate::errors::{VmError, VmResult};
use crate::mips::{Interpreter, Memory};
use crate::program::Program;

/// One-step proof for the transition `step → step + 1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProof {
    pub step: u64,
    pub pre: Hash,
    pub post: Hash,
    /// Encoded pre-state.
    pub state_data: Vec<u8>,
    /// Encoded [`StepWitness`].
    pub proof_data: Vec<u8>,
    pub oracle_key: Option<Hash>,
    pub oracle_value: Option<Vec<u8>>,
    pub oracle_offset: u64,
}

/// Terminal state of a complete run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    pub final_state: VmState,
    pub steps: u64,
    pub state_hash: Hash,
}

impl RunResult {
    /// `Err(Invalid)` / `Err(Panic)` for non-zero exit codes.
    pub fn outcome(&self) -> VmResult<()> {
        self.final_state.exit_result()
    }
}

/// Executor for one program over one oracle. In a dispute the oracle is
/// the game's view: its local inputs layered over the shared store.
#[derive(Clone)]
pub struct LocalExecutor {
    initial_state: VmState,
    initial_memory: Memory,
    oracle: Arc<dyn PreimageSource>,
}

impl fmt::Debug for LocalExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalExecutor")
            .field("initial_state", &self.initial_state)
            .field("memory_words", &self.initial_memory.word_count())
            .finish_non_exhaustive()
    }
}

impl LocalExecutor {
    pub fn new(initial_state: VmState, memory: Memory, oracle: Arc<dyn PreimageSource>) -> Self {
        Self {
            initial_state,
            initial_memory: memory,
            oracle,
        }
    }

    pub fn from_program(program: &Program, oracle: Arc<dyn PreimageSource>) -> VmResult<Self> {
        let (state, memory) = program.load()?;
        Ok(Self::new(state, memory, oracle))
    }

    pub fn initial_state(&self) -> &VmState {
        &self.initial_state
    }

    pub fn oracle(&self) -> &Arc<dyn PreimageSource> {
        &self.oracle
    }

    /// Same program and initial image over another oracle.
    pub fn with_oracle(&self, oracle: Arc<dyn PreimageSource>) -> Self {
        Self::new(self.initial_state.clone(), self.initial_memory.clone(), oracle)
    }

    /// Hash of the state at step 0; the trusted starting point of a game.
    pub fn absolute_prestate(&self) -> Hash {
        self.initial_state.state_hash()
    }

    /// State and memory after `target` steps, or at exit if sooner.
    pub fn run_to_step(&self, target: u64) -> VmResult<(VmState, Memory)> {
        let mut memory = self.initial_memory.clone();
        let mut state = self.initial_state.clone();
        {
            let mut interpreter = Interpreter::new(&mut memory, self.oracle.as_ref());
            while state.step < target && !state.exited {
                state = interpreter.step(&state)?;
            }
        }
        Ok((state, memory))
    }

    pub fn state_hash_at(&self, step: u64) -> VmResult<Hash> {
        let (state, _) = self.run_to_step(step)?;
        Ok(state.state_hash())
    }

    /// Build the witness for executing the instruction at `step`.
    pub fn generate_proof(&self, step: u64) -> VmResult<StepProof> {
        let (pre_state, mut memory) = self.run_to_step(step)?;

        let preimage = self
            .oracle
            .get_preimage(&pre_state.preimage_key)
            .ok()
            .map(|data| (pre_state.preimage_key, data));
        let witness = StepWitness::capture(&memory, preimage.clone());

        let post_state = Interpreter::new(&mut memory, self.oracle.as_ref()).step(&pre_state)?;
        let proof = StepProof {
            step,
            pre: pre_state.state_hash(),
            post: post_state.state_hash(),
            state_data: pre_state.encode().to_vec(),
            proof_data: witness.encode(),
            oracle_key: preimage.as_ref().map(|(key, _)| *key),
            oracle_value: preimage.map(|(_, data)| data),
            oracle_offset: pre_state.preimage_offset,
        };
        debug!(
            "[mips] Generated proof for step {}: pre={} post={}",
            step,
            short_hex(&proof.pre),
            short_hex(&proof.post)
        );
        Ok(proof)
    }

    pub fn run_to_completion(&self, max_steps: u64) -> VmResult<RunResult> {
        let (final_state, _) = self.run_to_step(max_steps)?;
        if !final_state.exited {
            return Err(VmError::MaxStepsExceeded { max_steps });
        }
        Ok(RunResult {
            steps: final_state.step,
            state_hash: final_state.state_hash(),
            final_state,
        })
    }
}

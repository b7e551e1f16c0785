//! Shared wiring for dispute scenarios: one ledger, one honest execution
//! oracle, batch state taken from that oracle's execution, and helpers to
//! build both services on top of them.

use std::sync::Arc;
use std::time::Duration;

use fp_02_preimage_oracle::{LocalContext, PreimageStore};
use fp_03_mips_vm::Program;
use fp_04_dispute_game::{GameConfig, InMemoryLedger};
use fp_05_bisection::{
    BisectionResult, Challenger, ChallengerConfig, ExecutionOracle, InMemoryStateProvider,
    LocalExecutionOracle, Proposer, ProposerConfig, StateProvider,
};
use shared_types::{address_from_label, Address};
use tokio::sync::watch;

pub fn factory() -> Address {
    address_from_label("factory")
}

pub fn proposer_address() -> Address {
    address_from_label("proposer")
}

pub fn challenger_address() -> Address {
    address_from_label("challenger")
}

/// Scenarios tick services by hand and never cancel them.
pub fn no_shutdown() -> watch::Receiver<bool> {
    watch::channel(false).1
}

/// Intervals are irrelevant: scenarios call `tick()` directly.
pub fn challenger_config() -> ChallengerConfig {
    ChallengerConfig {
        poll_interval: Duration::from_millis(10),
        challenge_every_n: 1,
    }
}

pub fn proposer_config(corrupt_output: Option<u64>) -> ProposerConfig {
    ProposerConfig {
        submit_interval: Duration::from_millis(10),
        corrupt_output,
    }
}

pub struct Scenario {
    pub ledger: InMemoryLedger,
    pub store: Arc<PreimageStore>,
    pub oracle: Arc<LocalExecutionOracle>,
    pub state: Arc<InMemoryStateProvider>,
    pub trace_length: u64,
}

impl Scenario {
    /// Batches `0..batches` executed over `local_inputs`, which the ledger
    /// also hands to every game it opens.
    pub fn new(
        program: &Program,
        store: Arc<PreimageStore>,
        local_inputs: LocalContext,
        trace_length: u64,
        challenge_window: Duration,
        batches: u64,
    ) -> BisectionResult<Self> {
        let oracle = LocalExecutionOracle::new(program, Arc::clone(&store), local_inputs.clone())?;
        let config = GameConfig {
            trace_length,
            challenge_window,
            absolute_prestate: oracle.absolute_prestate(),
            local_inputs,
        };
        let state = InMemoryStateProvider::from_execution(&oracle, batches, trace_length)?;
        Ok(Self {
            ledger: InMemoryLedger::with_mips_verifier(factory(), config),
            store,
            oracle: Arc::new(oracle),
            state: Arc::new(state),
            trace_length,
        })
    }

    /// This scenario's batch state, except that `batch_index` holds
    /// entries no execution produced.
    pub fn diverging_state(&self, batch_index: u64, batches: u64) -> BisectionResult<Arc<InMemoryStateProvider>> {
        let state = InMemoryStateProvider::from_execution(&self.oracle, batches, self.trace_length)?;
        state.insert_entries(batch_index, &[(b"forged".to_vec(), b"balance".to_vec())]);
        Ok(Arc::new(state))
    }

    pub fn proposer(&self, config: ProposerConfig) -> Proposer {
        Proposer::new(
            Arc::new(self.ledger.client(proposer_address())),
            self.state.clone(),
            self.oracle.clone(),
            config,
        )
    }

    pub fn challenger(&self) -> Challenger {
        self.challenger_with(self.state.clone(), self.oracle.clone())
    }

    /// A challenger with its own view of batch state and execution.
    pub fn challenger_with(
        &self,
        state: Arc<dyn StateProvider>,
        oracle: Arc<dyn ExecutionOracle>,
    ) -> Challenger {
        Challenger::new(
            Arc::new(self.ledger.client(challenger_address())),
            state,
            oracle,
            challenger_config(),
        )
    }
}

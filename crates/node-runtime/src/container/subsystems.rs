//! # Subsystem Container
//!
//! Holds every subsystem instance, built once at startup in dependency
//! order:
//!
//! ```text
//! Level 0: Preimage Store, demo local inputs
//! Level 1: Execution Oracle (program + store + local inputs)
//! Level 2: Ledger, State Provider (batches executed by the oracle)
//! Level 3: Proposer, Challenger (ledger + state + oracle)
//! ```
//!
//! ## Thread Safety
//!
//! - Everything shared is wrapped in `Arc`
//! - Proposer and challenger each hold their own ledger client, bound to
//!   their own address

use std::sync::Arc;

use anyhow::{Context, Result};
use fp_02_preimage_oracle::{PreimageServer, PreimageStore};
use fp_04_dispute_game::{GameConfig, InMemoryLedger};
use fp_05_bisection::{
    Challenger, ExecutionOracle, InMemoryStateProvider, LocalExecutionOracle, Proposer,
};
use shared_types::{address_from_label, short_hex, Address};
use tracing::info;

use crate::container::NodeConfig;
use crate::demo::{demo_local_inputs, demo_program, seed_preimages};

pub struct SubsystemContainer {
    pub config: NodeConfig,
    pub preimages: Arc<PreimageStore>,
    pub oracle: Arc<LocalExecutionOracle>,
    pub ledger: InMemoryLedger,
    pub state: Arc<InMemoryStateProvider>,
    pub proposer: Arc<Proposer>,
    pub challenger: Arc<Challenger>,
    pub preimage_server: Arc<PreimageServer>,
    pub proposer_address: Address,
    pub challenger_address: Address,
}

impl SubsystemContainer {
    pub fn new(config: NodeConfig) -> Result<Self> {
        // Level 0
        let preimages = Arc::new(PreimageStore::new());
        let local_inputs = demo_local_inputs();
        seed_preimages(&preimages, &local_inputs);

        // Level 1
        let program = demo_program(config.ledger.trace_length);
        let oracle = Arc::new(
            LocalExecutionOracle::new(&program, Arc::clone(&preimages), local_inputs.clone())
                .context("Failed to load demo program")?,
        );
        info!(
            "[container] Absolute prestate {}",
            short_hex(&oracle.absolute_prestate())
        );

        // Level 2
        let game_config = GameConfig {
            trace_length: config.ledger.trace_length,
            challenge_window: config.ledger.challenge_window,
            absolute_prestate: oracle.absolute_prestate(),
            local_inputs,
        };
        let ledger = InMemoryLedger::with_mips_verifier(config.ledger.factory, game_config);
        let state = Arc::new(
            InMemoryStateProvider::from_execution(
                &oracle,
                config.demo.batches,
                config.ledger.trace_length,
            )
            .context("Failed to execute demo batches")?,
        );

        // Level 3
        let proposer_address = address_from_label("proposer");
        let challenger_address = address_from_label("challenger");
        let proposer = Arc::new(Proposer::new(
            Arc::new(ledger.client(proposer_address)),
            state.clone(),
            oracle.clone(),
            config.proposer.clone(),
        ));
        let challenger = Arc::new(Challenger::new(
            Arc::new(ledger.client(challenger_address)),
            state.clone(),
            oracle.clone(),
            config.challenger.clone(),
        ));

        let preimage_server = Arc::new(PreimageServer::new(Arc::clone(&preimages)));

        Ok(Self {
            config,
            preimages,
            oracle,
            ledger,
            state,
            proposer,
            challenger,
            preimage_server,
            proposer_address,
            challenger_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_05_bisection::StateProvider;

    #[tokio::test]
    async fn test_container_wires_subsystems() {
        let mut config = NodeConfig::default();
        config.ledger.factory = [0xFA; 20];
        config.ledger.trace_length = 64;
        config.demo.batches = 3;

        let container = SubsystemContainer::new(config).unwrap();
        assert_ne!(container.proposer_address, container.challenger_address);
        assert_eq!(container.ledger.factory(), [0xFA; 20]);
        assert_eq!(container.ledger.config().trace_length, 64);
        assert_eq!(
            container.ledger.config().absolute_prestate,
            container.oracle.absolute_prestate()
        );
        assert_eq!(container.ledger.config().local_inputs, demo_local_inputs());
        assert_eq!(container.preimages.len(), 1);

        // Batch state is the memory each batch's execution ends in.
        for batch in 0..3 {
            let end = container.oracle.run_to_step(batch, 64).await.unwrap();
            assert_eq!(container.state.compute_mpt_root(batch).await.unwrap(), end.mem_root);
        }
    }
}

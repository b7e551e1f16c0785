//! # Dishonest Parties
//!
//! Games where one side lies about its trace, stops responding, or cannot
//! execute at all. The honest side must win each of them.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use fp_02_preimage_oracle::{LocalContext, PreimageStore};
    use fp_03_mips_vm::program::sum_to;
    use fp_03_mips_vm::{StepProof, VmError, VmState};
    use fp_04_dispute_game::{GameId, GameStatus, Ledger, StepVerdict};
    use fp_05_bisection::{
        fallback_claim, BisectionError, BisectionResult, Challenger, ExecutionOracle,
        InMemoryStateProvider, Proposer,
    };
    use shared_types::{keccak256_concat, Hash};
    use tokio::sync::watch;

    use crate::fixtures::{challenger_address, no_shutdown, proposer_config, Scenario};

    /// Honest up to `from_step`, then commits to garbage. Proofs stay
    /// honest since a step cannot be forged.
    struct LyingOracle {
        inner: Arc<dyn ExecutionOracle>,
        from_step: u64,
    }

    #[async_trait]
    impl ExecutionOracle for LyingOracle {
        fn absolute_prestate(&self) -> Hash {
            self.inner.absolute_prestate()
        }

        async fn state_hash_at(&self, batch_index: u64, step: u64) -> BisectionResult<Hash> {
            let honest = self.inner.state_hash_at(batch_index, step).await?;
            if step < self.from_step {
                return Ok(honest);
            }
            Ok(keccak256_concat(&[b"lie".as_slice(), honest.as_slice()]))
        }

        async fn run_to_step(&self, batch_index: u64, step: u64) -> BisectionResult<VmState> {
            self.inner.run_to_step(batch_index, step).await
        }

        async fn generate_proof(&self, batch_index: u64, step: u64) -> BisectionResult<StepProof> {
            self.inner.generate_proof(batch_index, step).await
        }
    }

    /// Cannot execute anything.
    struct BrokenOracle(Hash);

    #[async_trait]
    impl ExecutionOracle for BrokenOracle {
        fn absolute_prestate(&self) -> Hash {
            self.0
        }

        async fn state_hash_at(&self, _batch_index: u64, _step: u64) -> BisectionResult<Hash> {
            Err(VmError::MaxStepsExceeded { max_steps: 0 }.into())
        }

        async fn run_to_step(&self, _batch_index: u64, _step: u64) -> BisectionResult<VmState> {
            Err(VmError::MaxStepsExceeded { max_steps: 0 }.into())
        }

        async fn generate_proof(&self, _batch_index: u64, step: u64) -> BisectionResult<StepProof> {
            Err(BisectionError::ProofGenerationFailed {
                step,
                reason: "VM unavailable".to_string(),
            })
        }
    }

    fn scenario(window: Duration) -> Scenario {
        Scenario::new(
            &sum_to(3),
            Arc::new(PreimageStore::new()),
            LocalContext::new(),
            16,
            window,
            3,
        )
        .unwrap()
    }

    /// Batch state that disagrees with the proposer's on batch 1.
    fn diverging_state(scenario: &Scenario) -> Arc<InMemoryStateProvider> {
        scenario.diverging_state(1, 3).unwrap()
    }

    fn only_game(challenger: &Challenger) -> GameId {
        let games = challenger.active_games();
        assert_eq!(games.len(), 1);
        games[0].game_id
    }

    async fn run_until_settled(
        proposer: &Proposer,
        challenger: &Challenger,
        shutdown: &watch::Receiver<bool>,
    ) {
        for _ in 0..100 {
            proposer.tick(shutdown).await.unwrap();
            challenger.tick(shutdown).await.unwrap();
            let stats = challenger.stats();
            if stats.games_won + stats.games_lost > 0 {
                return;
            }
        }
        panic!("game did not settle within 100 rounds");
    }

    #[tokio::test]
    async fn test_lying_challenger_loses_the_step() {
        let scenario = scenario(Duration::from_secs(600));
        let proposer = scenario.proposer(proposer_config(None));
        let liar = Arc::new(LyingOracle {
            inner: scenario.oracle.clone(),
            from_step: 5,
        });
        let challenger = scenario.challenger_with(diverging_state(&scenario), liar);
        let shutdown = no_shutdown();

        proposer.tick(&shutdown).await.unwrap();
        challenger.tick(&shutdown).await.unwrap();
        let game_id = only_game(&challenger);

        run_until_settled(&proposer, &challenger, &shutdown).await;

        let game = scenario
            .ledger
            .client(challenger_address())
            .get_dispute_game(&game_id)
            .await
            .unwrap();
        assert_eq!(game.status, GameStatus::DefenderWins);
        assert_eq!(game.verdict, Some(StepVerdict::Upheld));
        // Narrowed to the first lie.
        assert_eq!((game.step_low, game.step_high), (4, 5));
        assert_eq!(challenger.stats().games_lost, 1);
        assert_eq!(proposer.stats().games_won, 1);
        assert!(scenario
            .ledger
            .client(challenger_address())
            .get_output_mpt_root(1)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_silent_proposer_loses_on_the_clock() {
        let shutdown = no_shutdown();
        let scenario = scenario(Duration::from_millis(200));
        let proposer = scenario.proposer(proposer_config(Some(1)));
        let challenger = scenario.challenger();

        proposer.tick(&shutdown).await.unwrap();
        challenger.tick(&shutdown).await.unwrap();
        let game_id = only_game(&challenger);

        // The proposer never answers the attack.
        tokio::time::sleep(Duration::from_millis(300)).await;
        challenger.tick(&shutdown).await.unwrap();

        assert_eq!(challenger.stats().games_won, 1);
        let game = scenario
            .ledger
            .client(challenger_address())
            .get_dispute_game(&game_id)
            .await
            .unwrap();
        assert_eq!(game.status, GameStatus::ChallengerWins);
        assert_eq!(game.verdict, None);
        assert_eq!(game.claim_count(), 2);
    }

    #[tokio::test]
    async fn test_silent_challenger_loses_on_the_clock() {
        let shutdown = no_shutdown();
        let scenario = scenario(Duration::from_millis(200));
        let proposer = scenario.proposer(proposer_config(None));
        let challenger = scenario.challenger_with(diverging_state(&scenario), scenario.oracle.clone());

        proposer.tick(&shutdown).await.unwrap();
        challenger.tick(&shutdown).await.unwrap();
        let game_id = only_game(&challenger);
        proposer.tick(&shutdown).await.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        proposer.tick(&shutdown).await.unwrap();

        assert_eq!(proposer.stats().games_won, 1);
        let game = scenario
            .ledger
            .client(challenger_address())
            .get_dispute_game(&game_id)
            .await
            .unwrap();
        assert_eq!(game.status, GameStatus::DefenderWins);
        assert_eq!(game.claim_count(), 3);
    }

    #[tokio::test]
    async fn test_challenger_without_vm_falls_back_and_loses() {
        let shutdown = no_shutdown();
        let scenario = scenario(Duration::from_millis(300));
        let proposer = scenario.proposer(proposer_config(None));
        let broken = Arc::new(BrokenOracle(scenario.oracle.absolute_prestate()));
        let challenger = scenario.challenger_with(diverging_state(&scenario), broken);

        proposer.tick(&shutdown).await.unwrap();
        challenger.tick(&shutdown).await.unwrap();
        let game_id = only_game(&challenger);
        let ledger = scenario.ledger.client(challenger_address());

        let mut rounds = 0;
        while !ledger.get_dispute_game(&game_id).await.unwrap().at_max_depth() {
            proposer.tick(&shutdown).await.unwrap();
            challenger.tick(&shutdown).await.unwrap();
            rounds += 1;
            assert!(rounds < 20, "never reached max depth");
        }

        // The challenger owes a step it cannot produce.
        challenger.tick(&shutdown).await.unwrap();
        let game = ledger.get_dispute_game(&game_id).await.unwrap();
        assert_eq!(game.verdict, None);
        assert_eq!(
            game.claims[1].value,
            fallback_claim(&game.claimed_root, 0)
        );

        tokio::time::sleep(Duration::from_millis(400)).await;
        proposer.tick(&shutdown).await.unwrap();
        challenger.tick(&shutdown).await.unwrap();

        let game = ledger.get_dispute_game(&game_id).await.unwrap();
        assert_eq!(game.status, GameStatus::DefenderWins);
        assert_eq!(challenger.stats().games_lost, 1);
        assert_eq!(proposer.stats().games_won, 1);
    }
}

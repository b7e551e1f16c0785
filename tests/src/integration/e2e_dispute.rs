//! # End-to-End Dispute
//!
//! The proposer submits batch 2 with one bit of its root flipped, and a
//! final state carrying that root. The challenger recomputes the root,
//! opens a game and attacks. Both sides run the same program, so they
//! agree on every intermediate state and defend their way up to the root
//! claim. The final step replays the last instruction; its post-state is
//! the honest final state, not the one the root claim commits to, so the
//! root is countered and the challenger wins.
//!
//! The same walk against a correct output ends the other way: the step
//! reproduces the committed final state and the output stands.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use fp_02_preimage_oracle::{LocalContext, PreimageStore};
    use fp_03_mips_vm::program::{batch_program, preimage_reader};
    use fp_04_dispute_game::{GameStatus, Ledger, LedgerError, StepVerdict};
    use fp_05_bisection::{Challenger, Proposer, StateProvider};
    use tokio::sync::watch;

    use crate::fixtures::{
        challenger_address, no_shutdown, proposer_address, proposer_config, Scenario,
    };

    fn scenario(batches: u64) -> Scenario {
        Scenario::new(
            &batch_program(2),
            Arc::new(PreimageStore::new()),
            LocalContext::new(),
            32,
            Duration::from_secs(600),
            batches,
        )
        .unwrap()
    }

    /// Tick both services until the challenger settles a game.
    async fn run_until_settled(
        proposer: &Proposer,
        challenger: &Challenger,
        shutdown: &watch::Receiver<bool>,
    ) -> usize {
        for round in 1..=100 {
            proposer.tick(shutdown).await.unwrap();
            challenger.tick(shutdown).await.unwrap();
            let stats = challenger.stats();
            if stats.games_won + stats.games_lost > 0 {
                return round;
            }
        }
        panic!("game did not settle within 100 rounds");
    }

    #[tokio::test]
    async fn test_flipped_root_bit_is_challenged_and_loses() {
        let scenario = scenario(4);
        let proposer = scenario.proposer(proposer_config(Some(2)));
        let challenger = scenario.challenger();

        run_until_settled(&proposer, &challenger, &no_shutdown()).await;

        let stats = challenger.stats();
        assert_eq!(stats.games_opened, 1);
        assert_eq!(stats.games_won, 1);
        assert_eq!(stats.active_games, 0);
        assert_eq!(stats.outputs_checked, 4);

        let ledger = scenario.ledger.client(challenger_address());
        let local_root = scenario.state.compute_mpt_root(2).await.unwrap();
        let game = ledger
            .get_dispute_game(&scenario.ledger.game_id(2, &local_root))
            .await
            .unwrap();
        assert_eq!(game.status, GameStatus::ChallengerWins);
        assert_eq!(game.verdict, Some(StepVerdict::Countered));
        assert_eq!(game.proposer, proposer_address());
        assert_eq!(game.challenger, challenger_address());
        assert_eq!((game.step_low, game.step_high), (31, 32));
        assert_eq!(game.disputed, 0);
        assert_eq!(game.root_claim().countered_by, Some(challenger_address()));
        // Root plus one claim per halving of 32 steps, plus the closing move.
        assert_eq!(game.claim_count(), 7);
        for (i, claim) in game.claims.iter().enumerate().skip(1) {
            assert_eq!(claim.parent_index, Some(i - 1));
        }

        // The disproven output is gone, the rest stand.
        assert!(matches!(
            ledger.get_output_mpt_root(2).await,
            Err(LedgerError::OutputNotFound { batch_index: 2 })
        ));
        for batch in [0, 1, 3] {
            assert_eq!(
                ledger.get_output_mpt_root(batch).await.unwrap(),
                scenario.state.compute_mpt_root(batch).await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn test_mistaken_challenger_loses_against_correct_output() {
        let scenario = scenario(3);
        let proposer = scenario.proposer(proposer_config(None));
        // Honest execution, but its batch 1 state came from somewhere else.
        let challenger =
            scenario.challenger_with(scenario.diverging_state(1, 3).unwrap(), scenario.oracle.clone());

        run_until_settled(&proposer, &challenger, &no_shutdown()).await;

        let stats = challenger.stats();
        assert_eq!(stats.games_opened, 1);
        assert_eq!(stats.games_lost, 1);

        let ledger = scenario.ledger.client(challenger_address());
        assert!(ledger.get_active_games().await.unwrap().is_empty());
        let forged_root = scenario.diverging_state(1, 3).unwrap().compute_mpt_root(1).await.unwrap();
        let game = ledger
            .get_dispute_game(&scenario.ledger.game_id(1, &forged_root))
            .await
            .unwrap();
        assert_eq!(game.status, GameStatus::DefenderWins);
        assert_eq!(game.verdict, Some(StepVerdict::Upheld));
        assert_eq!((game.step_low, game.step_high), (31, 32));

        // The correct output survives the dispute.
        assert_eq!(
            ledger.get_output_mpt_root(1).await.unwrap(),
            scenario.state.compute_mpt_root(1).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_proposer_records_the_loss() {
        let scenario = scenario(2);
        let proposer = scenario.proposer(proposer_config(Some(0)));
        let challenger = scenario.challenger();
        let shutdown = no_shutdown();

        run_until_settled(&proposer, &challenger, &shutdown).await;
        // One more proposer tick to observe the finished game.
        proposer.tick(&shutdown).await.unwrap();

        let stats = proposer.stats();
        assert_eq!(stats.games_defended, 1);
        assert_eq!(stats.games_lost, 1);
        assert!(proposer.defended_games().is_empty());
        // The removed output is not resubmitted.
        assert_eq!(stats.outputs_submitted, 2);
        assert!(scenario
            .ledger
            .client(proposer_address())
            .get_output_mpt_root(0)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_dispute_over_program_reading_local_inputs() {
        let inputs = LocalContext::new().with_input(7, b"rollup input".to_vec());
        let scenario = Scenario::new(
            &preimage_reader(7),
            Arc::new(PreimageStore::new()),
            inputs,
            32,
            Duration::from_secs(600),
            2,
        )
        .unwrap();
        let proposer = scenario.proposer(proposer_config(Some(1)));
        let challenger = scenario.challenger();

        run_until_settled(&proposer, &challenger, &no_shutdown()).await;

        assert_eq!(challenger.stats().games_won, 1);
        let local_root = scenario.state.compute_mpt_root(1).await.unwrap();
        let game = scenario
            .ledger
            .client(challenger_address())
            .get_dispute_game(&scenario.ledger.game_id(1, &local_root))
            .await
            .unwrap();
        assert_eq!(game.status, GameStatus::ChallengerWins);
        assert_eq!(game.step_low, 31);
        assert_eq!(game.claim_count(), 7);
        assert_eq!(game.local_context.get(7), Some(&b"rollup input"[..]));
    }

    #[tokio::test]
    async fn test_honest_outputs_never_disputed() {
        let scenario = scenario(5);
        let proposer = scenario.proposer(proposer_config(None));
        let challenger = scenario.challenger();
        let shutdown = no_shutdown();

        for _ in 0..3 {
            proposer.tick(&shutdown).await.unwrap();
            challenger.tick(&shutdown).await.unwrap();
        }

        assert_eq!(challenger.stats().outputs_checked, 5);
        assert_eq!(challenger.stats().games_opened, 0);
        assert_eq!(scenario.ledger.game_count(), 0);
    }
}

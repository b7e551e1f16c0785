//! # Bisection Controller
//!
//! Advances one dispute game by at most one action per call, on behalf of
//! the ledger account it was built with. Calls are idempotent when it is
//! not this side's turn.
//!
//! ```text
//! resolved? ──yes──→ Finished
//!     │no
//! resolvable? ──yes──→ Resolve
//!     │no
//! width == 1? ──yes──→ disputed claim is the opponent's? → Step, else Wait
//!     │no
//! latest claim ours? ──yes──→ Wait
//!     │no
//! Attack / Defend with the local trace (fallback on execution failure)
//! ```
//!
//! Before stepping, the divergent step is searched again over the claim
//! tree; a step proof is only generated where that search lands.

use std::sync::Arc;

use fp_04_dispute_game::{DisputeGame, GameId, GameStatus, Ledger, MoveKind, Side, StepVerdict};
use shared_types::short_hex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{
    bisect, choose_kind, fallback_move, BisectionStrategy, ClaimTree, OracleTrace, PlannedMove,
};
use crate::errors::{BisectionError, BisectionResult};
use crate::ports::ExecutionOracle;

/// What a call to [`BisectionController::advance`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControllerAction {
    /// Opponent's turn, or waiting for the opponent's step.
    Waiting,
    Moved(PlannedMove),
    Stepped(StepVerdict),
    Resolved(GameStatus),
    /// Game was already terminal.
    Finished(GameStatus),
}

pub struct BisectionController {
    ledger: Arc<dyn Ledger>,
    oracle: Arc<dyn ExecutionOracle>,
    game_id: GameId,
}

impl BisectionController {
    pub fn new(ledger: Arc<dyn Ledger>, oracle: Arc<dyn ExecutionOracle>, game_id: GameId) -> Self {
        Self {
            ledger,
            oracle,
            game_id,
        }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// `shutdown` cancels the divergence search before a step.
    pub async fn advance(
        &self,
        shutdown: &watch::Receiver<bool>,
    ) -> BisectionResult<ControllerAction> {
        let game = self.ledger.get_dispute_game(&self.game_id).await?;
        if game.status.is_terminal() {
            return Ok(ControllerAction::Finished(game.status));
        }
        if self.ledger.can_resolve(&self.game_id).await? {
            let status = self.ledger.resolve(&self.game_id).await?;
            return Ok(ControllerAction::Resolved(status));
        }

        let side = self.side_in(&game)?;

        if game.at_max_depth() {
            let disputed = game.claim(game.disputed)?;
            if game.verdict.is_some() || disputed.side() == side {
                return Ok(ControllerAction::Waiting);
            }
            return self.step(&game, side, shutdown).await;
        }

        if game.latest_claim().side() == side {
            return Ok(ControllerAction::Waiting);
        }

        let planned = self.plan_move(&game).await;
        let index = match planned.kind {
            MoveKind::Attack => {
                self.ledger
                    .attack(&self.game_id, planned.parent_index, planned.claim)
                    .await?
            }
            MoveKind::Defend => {
                self.ledger
                    .defend(&self.game_id, planned.parent_index, planned.claim)
                    .await?
            }
        };
        debug!(
            "[bisection] {:?} claim {} -> claim {} at step {} ({:?}, {})",
            planned.kind,
            planned.parent_index,
            index,
            planned.trace_step,
            planned.strategy,
            short_hex(&planned.claim)
        );
        Ok(ControllerAction::Moved(planned))
    }

    fn side_in(&self, game: &DisputeGame) -> BisectionResult<Side> {
        let me = self.ledger.address();
        if me == game.proposer {
            Ok(Side::Defender)
        } else if me == game.challenger {
            Ok(Side::Challenger)
        } else {
            Err(BisectionError::NotParticipant(self.game_id))
        }
    }

    /// Real execution first; any execution failure degrades to the
    /// fallback placeholder so the game keeps moving.
    async fn plan_move(&self, game: &DisputeGame) -> PlannedMove {
        match self.plan_with_execution(game).await {
            Ok(planned) => planned,
            Err(e) => {
                warn!(
                    "[bisection] Execution failed for game {}, using fallback: {}",
                    hex::encode(self.game_id),
                    e
                );
                fallback_move(game)
            }
        }
    }

    async fn plan_with_execution(&self, game: &DisputeGame) -> BisectionResult<PlannedMove> {
        let latest = game.latest_claim();
        let local = if latest.is_root() {
            None
        } else {
            Some(
                self.oracle
                    .state_hash_at(game.batch_index, latest.trace_step)
                    .await?,
            )
        };
        let kind = choose_kind(game, local);
        let trace_step = game.next_claim_step(kind);
        let claim = self.oracle.state_hash_at(game.batch_index, trace_step).await?;
        Ok(PlannedMove {
            kind,
            parent_index: latest.index,
            trace_step,
            claim,
            strategy: BisectionStrategy::RealExecution,
        })
    }

    async fn step(
        &self,
        game: &DisputeGame,
        side: Side,
        shutdown: &watch::Receiver<bool>,
    ) -> BisectionResult<ControllerAction> {
        let local = OracleTrace::new(Arc::clone(&self.oracle), game.batch_index);
        let divergence = bisect(
            &ClaimTree::new(game, side, &local),
            game.trace_length,
            shutdown,
        )
        .await?;
        if divergence.step != game.step_low {
            return Err(BisectionError::DivergenceMismatch {
                found: divergence.step,
                expected: game.step_low,
            });
        }

        let proof = self
            .oracle
            .generate_proof(game.batch_index, divergence.step)
            .await?;
        info!(
            "[bisection] Stepping game {} at step {} after {} queries (pre={}, post={})",
            hex::encode(self.game_id),
            divergence.step,
            divergence.queries,
            short_hex(&proof.pre),
            short_hex(&proof.post)
        );
        let verdict = self
            .ledger
            .step(
                &self.game_id,
                game.disputed,
                proof.state_data,
                proof.proof_data,
                proof.pre,
                proof.post,
            )
            .await?;
        Ok(ControllerAction::Stepped(verdict))
    }
}

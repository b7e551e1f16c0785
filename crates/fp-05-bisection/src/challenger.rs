//! # Challenger Service
//!
//! Polls the ledger for new outputs, recomputes each batch root locally,
//! and opens a dispute game on the first mismatch. Every tick then moves
//! each of its open games forward by one action.

use std::collections::HashMap;
use std::sync::Arc;

use fp_04_dispute_game::{GameId, GameStatus, Ledger, LedgerError};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use shared_types::short_hex;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ChallengerConfig;
use crate::controller::{BisectionController, ControllerAction};
use crate::errors::{BisectionError, BisectionResult};
use crate::ports::{ExecutionOracle, StateProvider};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengerStats {
    pub active_games: usize,
    pub games_won: u64,
    pub games_lost: u64,
    pub outputs_checked: u64,
    pub games_opened: u64,
}

/// Snapshot entry for status reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveGame {
    pub game_id: GameId,
    pub batch_index: u64,
}

struct TrackedGame {
    batch_index: u64,
    controller: Arc<BisectionController>,
}

pub struct Challenger {
    ledger: Arc<dyn Ledger>,
    state: Arc<dyn StateProvider>,
    oracle: Arc<dyn ExecutionOracle>,
    config: ChallengerConfig,
    games: RwLock<HashMap<GameId, TrackedGame>>,
    /// Next output index not yet compared.
    next_output: Mutex<u64>,
    stats: RwLock<ChallengerStats>,
}

impl Challenger {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        state: Arc<dyn StateProvider>,
        oracle: Arc<dyn ExecutionOracle>,
        config: ChallengerConfig,
    ) -> Self {
        Self {
            ledger,
            state,
            oracle,
            config,
            games: RwLock::new(HashMap::new()),
            next_output: Mutex::new(0),
            stats: RwLock::new(ChallengerStats::default()),
        }
    }

    pub fn stats(&self) -> ChallengerStats {
        let mut stats = *self.stats.read();
        stats.active_games = self.games.read().len();
        stats
    }

    pub fn active_games(&self) -> Vec<ActiveGame> {
        let mut games: Vec<ActiveGame> = self
            .games
            .read()
            .iter()
            .map(|(id, tracked)| ActiveGame {
                game_id: *id,
                batch_index: tracked.batch_index,
            })
            .collect();
        games.sort_by_key(|g| g.batch_index);
        games
    }

    /// Poll until shutdown fires.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            "[challenger] Started (poll every {:?}, checking every {} batch(es))",
            self.config.poll_interval, self.config.challenge_every_n
        );
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let cancel = shutdown.clone();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(&cancel).await {
                        warn!("[challenger] Tick failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("[challenger] Shutdown signal received");
                    return;
                }
            }
        }
    }

    /// One polling round: look for bad outputs, then advance open games.
    pub async fn tick(&self, shutdown: &watch::Receiver<bool>) -> BisectionResult<()> {
        self.check_outputs().await?;
        self.advance_games(shutdown).await;
        Ok(())
    }

    async fn check_outputs(&self) -> BisectionResult<()> {
        let Some(latest) = self.ledger.get_latest_output_index().await? else {
            return Ok(());
        };
        let start = *self.next_output.lock();
        let every = self.config.challenge_every_n.max(1);

        for batch_index in start..=latest {
            if batch_index % every == 0 {
                match self.check_output(batch_index).await {
                    Ok(()) => {}
                    // Local state lags the ledger; retry this index next tick.
                    Err(BisectionError::BatchNotFound { .. }) => return Ok(()),
                    Err(e) => return Err(e),
                }
            }
            *self.next_output.lock() = batch_index + 1;
        }
        Ok(())
    }

    async fn check_output(&self, batch_index: u64) -> BisectionResult<()> {
        if self.ledger.has_active_dispute(batch_index).await? {
            debug!("[challenger] Batch {} already disputed", batch_index);
            return Ok(());
        }
        let on_ledger = match self.ledger.get_output_mpt_root(batch_index).await {
            Ok(root) => root,
            Err(LedgerError::OutputNotFound { .. }) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let local = self.state.compute_mpt_root(batch_index).await?;
        self.stats.write().outputs_checked += 1;

        if local == on_ledger {
            debug!(
                "[challenger] Batch {} output OK ({})",
                batch_index,
                short_hex(&local)
            );
            return Ok(());
        }

        warn!(
            "[challenger] Batch {} output mismatch: ledger={}, local={}",
            batch_index,
            short_hex(&on_ledger),
            short_hex(&local)
        );
        let game_id = self.ledger.create_dispute_game(batch_index, local).await?;
        let controller = BisectionController::new(
            Arc::clone(&self.ledger),
            Arc::clone(&self.oracle),
            game_id,
        );
        self.games.write().insert(
            game_id,
            TrackedGame {
                batch_index,
                controller: Arc::new(controller),
            },
        );
        self.stats.write().games_opened += 1;
        info!(
            "[challenger] Opened game {} for batch {}",
            hex::encode(game_id),
            batch_index
        );
        Ok(())
    }

    async fn advance_games(&self, shutdown: &watch::Receiver<bool>) {
        let controllers: Vec<Arc<BisectionController>> = self
            .games
            .read()
            .values()
            .map(|tracked| Arc::clone(&tracked.controller))
            .collect();

        for controller in controllers {
            let game_id = controller.game_id();
            match controller.advance(shutdown).await {
                Ok(ControllerAction::Resolved(status) | ControllerAction::Finished(status)) => {
                    self.finish(game_id, status)
                }
                Ok(_) => {}
                Err(e) => warn!(
                    "[challenger] Game {} not advanced: {}",
                    hex::encode(game_id),
                    e
                ),
            }
        }
    }

    fn finish(&self, game_id: GameId, status: GameStatus) {
        let Some(tracked) = self.games.write().remove(&game_id) else {
            return;
        };
        let mut stats = self.stats.write();
        if status == GameStatus::ChallengerWins {
            stats.games_won += 1;
        } else {
            stats.games_lost += 1;
        }
        info!(
            "[challenger] Game {} for batch {} finished: {:?}",
            hex::encode(game_id),
            tracked.batch_index,
            status
        );
    }
}

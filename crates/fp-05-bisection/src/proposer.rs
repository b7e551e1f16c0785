//! # Proposer Service
//!
//! Submits one output root per batch of local state and defends any game
//! opened against its outputs.
//!
//! An output is the batch's state root plus the VM state after
//! `trace_length` steps of that batch, whose memory the root must be.
//!
//! `corrupt_output` is a fault-injection knob: the root of that batch is
//! submitted with its last bit flipped, and the final state with it, so a
//! challenger has something to dispute.

use std::collections::HashMap;
use std::sync::Arc;

use fp_01_trie::{verify_proof, Proof};
use fp_04_dispute_game::{GameId, GameStatus, Ledger, LedgerError};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use shared_types::short_hex;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ProposerConfig;
use crate::controller::{BisectionController, ControllerAction};
use crate::errors::{BisectionError, BisectionResult};
use crate::ports::{ExecutionOracle, StateProvider};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposerStats {
    pub outputs_submitted: u64,
    pub games_defended: u64,
    pub games_won: u64,
    pub games_lost: u64,
}

pub struct Proposer {
    ledger: Arc<dyn Ledger>,
    state: Arc<dyn StateProvider>,
    oracle: Arc<dyn ExecutionOracle>,
    config: ProposerConfig,
    games: RwLock<HashMap<GameId, Arc<BisectionController>>>,
    /// Own cursor, so an output removed by a lost game is not resubmitted.
    next_batch: Mutex<Option<u64>>,
    stats: RwLock<ProposerStats>,
}

impl Proposer {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        state: Arc<dyn StateProvider>,
        oracle: Arc<dyn ExecutionOracle>,
        config: ProposerConfig,
    ) -> Self {
        Self {
            ledger,
            state,
            oracle,
            config,
            games: RwLock::new(HashMap::new()),
            next_batch: Mutex::new(None),
            stats: RwLock::new(ProposerStats::default()),
        }
    }

    pub fn stats(&self) -> ProposerStats {
        *self.stats.read()
    }

    pub fn defended_games(&self) -> Vec<GameId> {
        self.games.read().keys().copied().collect()
    }

    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            "[proposer] Started (submit every {:?})",
            self.config.submit_interval
        );
        if let Some(batch) = self.config.corrupt_output {
            warn!("[proposer] Fault injection enabled for batch {}", batch);
        }
        let mut interval = tokio::time::interval(self.config.submit_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let cancel = shutdown.clone();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(&cancel).await {
                        warn!("[proposer] Tick failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("[proposer] Shutdown signal received");
                    return;
                }
            }
        }
    }

    pub async fn tick(&self, shutdown: &watch::Receiver<bool>) -> BisectionResult<()> {
        self.submit_outputs().await?;
        self.defend_games(shutdown).await?;
        Ok(())
    }

    /// Inclusion proof for `key` in a batch, checked against the output
    /// root on the ledger rather than the local root.
    pub async fn prove_inclusion(&self, batch_index: u64, key: &[u8]) -> BisectionResult<Proof> {
        let root = self.ledger.get_output_mpt_root(batch_index).await?;
        let proof = self.state.generate_proof(batch_index, key).await?;
        if !verify_proof(&root, &proof) {
            return Err(BisectionError::OutputMismatch { batch_index });
        }
        Ok(proof)
    }

    async fn submit_outputs(&self) -> BisectionResult<()> {
        let Some(latest) = self.state.latest_batch_index().await? else {
            return Ok(());
        };
        let cursor = *self.next_batch.lock();
        let start = match cursor {
            Some(next) => next,
            None => self
                .ledger
                .get_latest_output_index()
                .await?
                .map_or(0, |index| index + 1),
        };

        let trace_length = self.ledger.game_config().await?.trace_length;
        for batch_index in start..=latest {
            let state = self.state.get_verifiable_state(batch_index).await?;
            let mut final_state = self.oracle.run_to_step(batch_index, trace_length).await?;
            if final_state.mem_root != state.state_root {
                return Err(BisectionError::OutputMismatch { batch_index });
            }
            let mut root = state.state_root;
            if self.config.corrupt_output == Some(batch_index) {
                root[31] ^= 1;
                final_state.mem_root = root;
                warn!(
                    "[proposer] Submitting corrupted output for batch {}",
                    batch_index
                );
            }
            match self
                .ledger
                .submit_output(batch_index, root, final_state.encode().to_vec())
                .await
            {
                Ok(()) => {
                    self.stats.write().outputs_submitted += 1;
                    info!(
                        "[proposer] Output for batch {} submitted: {}",
                        batch_index,
                        short_hex(&root)
                    );
                }
                Err(LedgerError::DuplicateOutput { .. }) => {
                    debug!("[proposer] Batch {} already has an output", batch_index);
                }
                Err(e) => return Err(e.into()),
            }
            *self.next_batch.lock() = Some(batch_index + 1);
        }
        Ok(())
    }

    async fn defend_games(&self, shutdown: &watch::Receiver<bool>) -> BisectionResult<()> {
        let me = self.ledger.address();
        for game_id in self.ledger.get_active_games().await? {
            if self.games.read().contains_key(&game_id) {
                continue;
            }
            let game = self.ledger.get_dispute_game(&game_id).await?;
            if game.proposer != me {
                continue;
            }
            info!(
                "[proposer] Defending batch {} in game {}",
                game.batch_index,
                hex::encode(game_id)
            );
            let controller = BisectionController::new(
                Arc::clone(&self.ledger),
                Arc::clone(&self.oracle),
                game_id,
            );
            self.games.write().insert(game_id, Arc::new(controller));
            self.stats.write().games_defended += 1;
        }

        let controllers: Vec<Arc<BisectionController>> =
            self.games.read().values().cloned().collect();
        for controller in controllers {
            let game_id = controller.game_id();
            match controller.advance(shutdown).await {
                Ok(ControllerAction::Resolved(status) | ControllerAction::Finished(status)) => {
                    self.finish(game_id, status)
                }
                Ok(_) => {}
                Err(e) => warn!(
                    "[proposer] Game {} not advanced: {}",
                    hex::encode(game_id),
                    e
                ),
            }
        }
        Ok(())
    }

    fn finish(&self, game_id: GameId, status: GameStatus) {
        if self.games.write().remove(&game_id).is_none() {
            return;
        }
        let mut stats = self.stats.write();
        if status == GameStatus::DefenderWins {
            stats.games_won += 1;
        } else {
            stats.games_lost += 1;
        }
        info!(
            "[proposer] Game {} finished: {:?}",
            hex::encode(game_id),
            status
        );
    }
}

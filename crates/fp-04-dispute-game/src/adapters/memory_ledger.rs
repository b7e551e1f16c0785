//! # In-Memory Ledger
//!
//! Process-local stand-in for the settlement contracts. One shared state
//! behind a reader/writer lock; each participant gets a [`LedgerClient`]
//! bound to its own address.
//!
//! The challenge clock restarts on every move. A game whose clock ran out
//! becomes resolvable even without a step.
//!
//! Outputs are only accepted together with the final VM state they claim:
//! its memory root must be the output root, so a game's root claim binds
//! the output root to a trace both sides can bisect.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{keccak256, short_hex, Address, Hash};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::adapters::MipsStepVerifier;
use crate::domain::{DisputeGame, GameConfig, GameId, GameStatus, OutputProposal, StepVerdict};
use crate::errors::{LedgerError, LedgerResult};
use crate::ports::{Ledger, StepVerifier};

struct GameEntry {
    game: DisputeGame,
    last_move_at: Instant,
}

#[derive(Default)]
struct LedgerState {
    outputs: BTreeMap<u64, OutputProposal>,
    games: HashMap<GameId, GameEntry>,
    /// Creation order, for stable listings.
    order: Vec<GameId>,
}

#[derive(Clone)]
pub struct InMemoryLedger {
    factory: Address,
    config: GameConfig,
    verifier: Arc<dyn StepVerifier>,
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new(factory: Address, config: GameConfig, verifier: Arc<dyn StepVerifier>) -> Self {
        Self {
            factory,
            config,
            verifier,
            state: Arc::new(RwLock::new(LedgerState::default())),
        }
    }

    /// Ledger that settles steps with the MIPS interpreter.
    pub fn with_mips_verifier(factory: Address, config: GameConfig) -> Self {
        Self::new(factory, config, Arc::new(MipsStepVerifier))
    }

    pub fn client(&self, address: Address) -> LedgerClient {
        LedgerClient {
            ledger: self.clone(),
            address,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    /// Deterministic id: last 20 bytes of keccak(factory ‖ batch ‖ root).
    pub fn game_id(&self, batch_index: u64, claimed_root: &Hash) -> GameId {
        let mut preimage = Vec::with_capacity(20 + 8 + 32);
        preimage.extend_from_slice(&self.factory);
        preimage.extend_from_slice(&batch_index.to_be_bytes());
        preimage.extend_from_slice(claimed_root);
        let digest = keccak256(&preimage);
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest[12..]);
        id
    }

    pub fn game_count(&self) -> usize {
        self.state.read().games.len()
    }

    fn with_game<T>(
        &self,
        game_id: &GameId,
        f: impl FnOnce(&mut GameEntry) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut state = self.state.write();
        let entry = state
            .games
            .get_mut(game_id)
            .ok_or(LedgerError::GameNotFound(*game_id))?;
        f(entry)
    }

    fn clock_expired(&self, entry: &GameEntry) -> bool {
        entry.last_move_at.elapsed() >= self.config.challenge_window
    }
}

/// A ledger handle acting as one account.
#[derive(Clone)]
pub struct LedgerClient {
    ledger: InMemoryLedger,
    address: Address,
}

impl LedgerClient {
    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }
}

#[async_trait]
impl Ledger for LedgerClient {
    fn address(&self) -> Address {
        self.address
    }

    async fn game_config(&self) -> LedgerResult<GameConfig> {
        Ok(self.ledger.config.clone())
    }

    async fn create_dispute_game(
        &self,
        batch_index: u64,
        claimed_root: Hash,
    ) -> LedgerResult<GameId> {
        let id = self.ledger.game_id(batch_index, &claimed_root);
        let mut state = self.ledger.state.write();

        let output = state
            .outputs
            .get(&batch_index)
            .cloned()
            .ok_or(LedgerError::OutputNotFound { batch_index })?;
        let active = state
            .games
            .values()
            .any(|e| e.game.batch_index == batch_index && e.game.is_in_progress());
        if active || state.games.contains_key(&id) {
            return Err(LedgerError::DuplicateGame { batch_index });
        }

        let game = DisputeGame::new(
            id,
            batch_index,
            &output,
            claimed_root,
            self.address,
            &self.ledger.config,
        )?;
        state.games.insert(
            id,
            GameEntry {
                game,
                last_move_at: Instant::now(),
            },
        );
        state.order.push(id);

        info!(
            "[ledger] Game {} created for batch {} (output={}, claimed={}, commitment={})",
            hex::encode(id),
            batch_index,
            short_hex(&output.root),
            short_hex(&claimed_root),
            short_hex(&output.trace_commitment)
        );
        Ok(id)
    }

    async fn get_dispute_game(&self, game_id: &GameId) -> LedgerResult<DisputeGame> {
        self.ledger
            .state
            .read()
            .games
            .get(game_id)
            .map(|entry| entry.game.clone())
            .ok_or(LedgerError::GameNotFound(*game_id))
    }

    async fn get_active_games(&self) -> LedgerResult<Vec<GameId>> {
        let state = self.ledger.state.read();
        Ok(state
            .order
            .iter()
            .filter(|id| {
                state
                    .games
                    .get(*id)
                    .is_some_and(|entry| entry.game.is_in_progress())
            })
            .copied()
            .collect())
    }

    async fn has_active_dispute(&self, batch_index: u64) -> LedgerResult<bool> {
        Ok(self
            .ledger
            .state
            .read()
            .games
            .values()
            .any(|e| e.game.batch_index == batch_index && e.game.is_in_progress()))
    }

    async fn get_output_mpt_root(&self, batch_index: u64) -> LedgerResult<Hash> {
        self.ledger
            .state
            .read()
            .outputs
            .get(&batch_index)
            .map(|output| output.root)
            .ok_or(LedgerError::OutputNotFound { batch_index })
    }

    async fn get_latest_output_index(&self) -> LedgerResult<Option<u64>> {
        Ok(self.ledger.state.read().outputs.keys().next_back().copied())
    }

    async fn submit_output(
        &self,
        batch_index: u64,
        root: Hash,
        final_state: Vec<u8>,
    ) -> LedgerResult<()> {
        let output = OutputProposal::from_final_state(
            root,
            &final_state,
            self.address,
            self.ledger.config.trace_length,
        )?;
        let mut state = self.ledger.state.write();
        if state.outputs.contains_key(&batch_index) {
            return Err(LedgerError::DuplicateOutput { batch_index });
        }
        debug!(
            "[ledger] Output for batch {} submitted: {} (commitment {})",
            batch_index,
            short_hex(&root),
            short_hex(&output.trace_commitment)
        );
        state.outputs.insert(batch_index, output);
        Ok(())
    }

    async fn attack(&self, game_id: &GameId, parent_index: usize, claim: Hash) -> LedgerResult<usize> {
        self.ledger.with_game(game_id, |entry| {
            let index = entry.game.attack(parent_index, claim, self.address)?;
            entry.last_move_at = Instant::now();
            debug!(
                "[ledger] Attack on claim {} -> claim {} at step {}",
                parent_index, index, entry.game.claims[index].trace_step
            );
            Ok(index)
        })
    }

    async fn defend(&self, game_id: &GameId, parent_index: usize, claim: Hash) -> LedgerResult<usize> {
        self.ledger.with_game(game_id, |entry| {
            let index = entry.game.defend(parent_index, claim, self.address)?;
            entry.last_move_at = Instant::now();
            debug!(
                "[ledger] Defense of claim {} -> claim {} at step {}",
                parent_index, index, entry.game.claims[index].trace_step
            );
            Ok(index)
        })
    }

    async fn step(
        &self,
        game_id: &GameId,
        claim_index: usize,
        state_data: Vec<u8>,
        proof_data: Vec<u8>,
        pre: Hash,
        post: Hash,
    ) -> LedgerResult<StepVerdict> {
        let verifier = self.ledger.verifier.clone();
        self.ledger.with_game(game_id, |entry| {
            let verdict = entry.game.step(
                claim_index,
                &state_data,
                &proof_data,
                pre,
                post,
                self.address,
                verifier.as_ref(),
            )?;
            entry.last_move_at = Instant::now();
            info!(
                "[ledger] Step on claim {} of game {}: {:?}",
                claim_index,
                hex::encode(game_id),
                verdict
            );
            Ok(verdict)
        })
    }

    async fn resolve(&self, game_id: &GameId) -> LedgerResult<GameStatus> {
        let mut state = self.ledger.state.write();
        let entry = state
            .games
            .get_mut(game_id)
            .ok_or(LedgerError::GameNotFound(*game_id))?;
        let expired = self.ledger.clock_expired(entry);
        let status = entry.game.resolve(expired)?;
        let batch_index = entry.game.batch_index;

        if status == GameStatus::ChallengerWins {
            state.outputs.remove(&batch_index);
            info!("[ledger] Output for batch {} invalidated", batch_index);
        }
        info!(
            "[ledger] Game {} resolved: {:?}",
            hex::encode(game_id),
            status
        );
        Ok(status)
    }

    async fn can_resolve(&self, game_id: &GameId) -> LedgerResult<bool> {
        let state = self.ledger.state.read();
        let entry = state
            .games
            .get(game_id)
            .ok_or(LedgerError::GameNotFound(*game_id))?;
        Ok(entry.game.can_resolve(self.ledger.clock_expired(entry)))
    }

    async fn get_claim_count(&self, game_id: &GameId) -> LedgerResult<usize> {
        self.ledger
            .state
            .read()
            .games
            .get(game_id)
            .map(|entry| entry.game.claim_count())
            .ok_or(LedgerError::GameNotFound(*game_id))
    }
}

//! # Ledger API
//!
//! The settlement layer both parties talk to. Every call is made on
//! behalf of one account, the handle's [`Ledger::address`].

use async_trait::async_trait;
use shared_types::{Address, Hash};

use crate::domain::{DisputeGame, GameConfig, GameId, GameStatus, StepVerdict};
use crate::errors::LedgerResult;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Account the calls are made from.
    fn address(&self) -> Address;

    /// Parameters every game on this ledger is created with.
    async fn game_config(&self) -> LedgerResult<GameConfig>;

    /// Open a game disputing the stored output of `batch_index`.
    async fn create_dispute_game(&self, batch_index: u64, claimed_root: Hash)
        -> LedgerResult<GameId>;

    async fn get_dispute_game(&self, game_id: &GameId) -> LedgerResult<DisputeGame>;

    /// Ids of games still in progress.
    async fn get_active_games(&self) -> LedgerResult<Vec<GameId>>;

    async fn has_active_dispute(&self, batch_index: u64) -> LedgerResult<bool>;

    async fn get_output_mpt_root(&self, batch_index: u64) -> LedgerResult<Hash>;

    /// `None` until the first output lands.
    async fn get_latest_output_index(&self) -> LedgerResult<Option<u64>>;

    /// Record `root` for `batch_index`. `final_state` is the encoded VM
    /// state at step `trace_length`; its memory root must be `root`, and
    /// its hash is what a dispute's root claim commits to.
    async fn submit_output(&self, batch_index: u64, root: Hash, final_state: Vec<u8>)
        -> LedgerResult<()>;

    async fn attack(&self, game_id: &GameId, parent_index: usize, claim: Hash)
        -> LedgerResult<usize>;

    async fn defend(&self, game_id: &GameId, parent_index: usize, claim: Hash)
        -> LedgerResult<usize>;

    async fn step(
        &self,
        game_id: &GameId,
        claim_index: usize,
        state_data: Vec<u8>,
        proof_data: Vec<u8>,
        pre: Hash,
        post: Hash,
    ) -> LedgerResult<StepVerdict>;

    async fn resolve(&self, game_id: &GameId) -> LedgerResult<GameStatus>;

    async fn can_resolve(&self, game_id: &GameId) -> LedgerResult<bool>;

    async fn get_claim_count(&self, game_id: &GameId) -> LedgerResult<usize>;
}

//! # Move Strategies
//!
//! How a participant picks its next move. Real execution compares the
//! latest claim with a locally computed trace. When execution is not
//! available the fallback keeps the game moving with a placeholder
//! commitment; such a branch is expected to lose at the step.

use fp_04_dispute_game::{DisputeGame, MoveKind};
use serde::{Deserialize, Serialize};
use shared_types::{keccak256_concat, Hash};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BisectionStrategy {
    RealExecution,
    Fallback,
}

/// A move ready to submit against the latest claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannedMove {
    pub kind: MoveKind,
    pub parent_index: usize,
    pub trace_step: u64,
    pub claim: Hash,
    pub strategy: BisectionStrategy,
}

/// Agreeing with the latest claim means defending it. The root claim
/// stands for the whole output and can only be attacked.
pub fn choose_kind(game: &DisputeGame, local_hash_at_latest: Option<Hash>) -> MoveKind {
    let latest = game.latest_claim();
    if !latest.is_root() && local_hash_at_latest == Some(latest.value) {
        MoveKind::Defend
    } else {
        MoveKind::Attack
    }
}

/// Placeholder commitment: keccak(claimed_root ‖ parent_index).
pub fn fallback_claim(claimed_root: &Hash, parent_index: usize) -> Hash {
    let index = (parent_index as u64).to_be_bytes();
    keccak256_concat(&[claimed_root.as_slice(), index.as_slice()])
}

/// Fallback move: attack even parents, defend odd ones.
pub fn fallback_move(game: &DisputeGame) -> PlannedMove {
    let parent_index = game.claim_count() - 1;
    let kind = if parent_index % 2 == 0 {
        MoveKind::Attack
    } else {
        MoveKind::Defend
    };
    PlannedMove {
        kind,
        parent_index,
        trace_step: game.next_claim_step(kind),
        claim: fallback_claim(&game.claimed_root, parent_index),
        strategy: BisectionStrategy::Fallback,
    }
}

//! # Divergence Search
//!
//! Binary search for the first step two execution traces disagree on.
//! Both traces agree at step 0 (the absolute prestate) by assumption and
//! disagree at `max_steps`; the search keeps that invariant on `[lo, hi]`
//! and stops when the two are adjacent.
//!
//! The opponent's side of the comparison is an [`Agreement`]: either a
//! second trace, or the claims the opponent made in a game.

use std::sync::Arc;

use async_trait::async_trait;
use fp_04_dispute_game::{DisputeGame, MoveKind, Side};
use shared_types::Hash;
use tokio::sync::watch;

use crate::errors::{BisectionError, BisectionResult};
use crate::ports::ExecutionOracle;

/// Anything that can commit to a state hash per step.
#[async_trait]
pub trait TraceSource: Send + Sync {
    async fn hash_at(&self, step: u64) -> BisectionResult<Hash>;
}

/// Whether the opponent agrees with the local state after `step`.
#[async_trait]
pub trait Agreement: Send + Sync {
    async fn agrees_at(&self, step: u64) -> BisectionResult<bool>;
}

/// An opponent who only committed to a single hash: every comparison is
/// against it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClaim(pub Hash);

#[async_trait]
impl TraceSource for FixedClaim {
    async fn hash_at(&self, _step: u64) -> BisectionResult<Hash> {
        Ok(self.0)
    }
}

/// One batch's trace, produced by an execution oracle.
#[derive(Clone)]
pub struct OracleTrace {
    oracle: Arc<dyn ExecutionOracle>,
    batch_index: u64,
}

impl OracleTrace {
    pub fn new(oracle: Arc<dyn ExecutionOracle>, batch_index: u64) -> Self {
        Self {
            oracle,
            batch_index,
        }
    }
}

#[async_trait]
impl TraceSource for OracleTrace {
    async fn hash_at(&self, step: u64) -> BisectionResult<Hash> {
        self.oracle.state_hash_at(self.batch_index, step).await
    }
}

struct TracePair<'a> {
    local: &'a dyn TraceSource,
    opponent: &'a dyn TraceSource,
}

#[async_trait]
impl<'a> Agreement for TracePair<'a> {
    async fn agrees_at(&self, step: u64) -> BisectionResult<bool> {
        Ok(self.local.hash_at(step).await? == self.opponent.hash_at(step).await?)
    }
}

/// The opponent's position as recorded in a game's claim tree.
///
/// An opponent claim is compared with the local trace. For a claim of our
/// own, the opponent's reply says it: a defense agrees, an attack does not.
pub struct ClaimTree<'a> {
    game: &'a DisputeGame,
    side: Side,
    local: &'a dyn TraceSource,
}

impl<'a> ClaimTree<'a> {
    pub fn new(game: &'a DisputeGame, side: Side, local: &'a dyn TraceSource) -> Self {
        Self { game, side, local }
    }
}

#[async_trait]
impl<'a> Agreement for ClaimTree<'a> {
    async fn agrees_at(&self, step: u64) -> BisectionResult<bool> {
        let claim = self
            .game
            .claims
            .iter()
            .skip(1)
            .find(|claim| claim.trace_step == step)
            .ok_or(BisectionError::StepNotClaimed { step })?;

        if claim.side() != self.side {
            return Ok(self.local.hash_at(step).await? == claim.value);
        }
        let reply = self
            .game
            .claims
            .iter()
            .find(|c| c.parent_index == Some(claim.index))
            .ok_or(BisectionError::StepNotClaimed { step })?;
        Ok(reply.position == MoveKind::Defend.child_position(claim.position))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Divergence {
    /// Last step both traces agree on. The disputed instruction executes
    /// from here.
    pub step: u64,
    /// Steps compared.
    pub queries: u32,
}

/// Locate the divergent instruction in `[0, max_steps)` between two
/// traces. See [`bisect`].
pub async fn find_divergent_step(
    local: &dyn TraceSource,
    opponent: &dyn TraceSource,
    max_steps: u64,
    shutdown: &watch::Receiver<bool>,
) -> BisectionResult<Divergence> {
    bisect(&TracePair { local, opponent }, max_steps, shutdown).await
}

/// Locate the divergent instruction in `[0, max_steps)` with at most
/// ⌈log2 max_steps⌉ queries. Cancellation is checked before every query.
pub async fn bisect(
    agreement: &dyn Agreement,
    max_steps: u64,
    shutdown: &watch::Receiver<bool>,
) -> BisectionResult<Divergence> {
    let mut lo = 0u64;
    let mut hi = max_steps.max(1);
    let mut queries = 0u32;

    while hi - lo > 1 {
        if *shutdown.borrow() {
            return Err(BisectionError::Cancelled);
        }
        let mid = lo + (hi - lo) / 2;
        queries += 1;
        if agreement.agrees_at(mid).await? {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Ok(Divergence { step: lo, queries })
}

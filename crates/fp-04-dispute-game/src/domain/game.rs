//! # Dispute Game
//!
//! Claim-tree state machine. The root claim at index 0 is the proposer's
//! trace commitment: the state hash at step `trace_length`, whose memory
//! root is the output root. Every move appends one claim to the latest
//! claim and halves the disputed range `[step_low, step_high)`:
//!
//! - **Attack** disagrees with the parent: `step_high := parent.step`.
//! - **Defend** agrees with the parent: `step_low := parent.step`.
//!
//! The new claim sits at the midpoint. Once the range is one step wide
//! the disputed claim is settled by replaying that instruction against
//! the game's own local inputs.
//!
//! State progression: InProgress → ChallengerWins | DefenderWins

use fp_02_preimage_oracle::LocalContext;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash};

use super::claim::{Claim, GameId, MoveKind, Side, ROOT_POSITION};
use super::config::GameConfig;
use super::output::OutputProposal;
use crate::errors::{GameError, GameResult};
use crate::ports::StepVerifier;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    InProgress,
    ChallengerWins,
    DefenderWins,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        self != GameStatus::InProgress
    }

    fn won_by(side: Side) -> Self {
        match side {
            Side::Defender => GameStatus::DefenderWins,
            Side::Challenger => GameStatus::ChallengerWins,
        }
    }
}

/// Result of the terminal step against the disputed claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepVerdict {
    /// Replaying the instruction contradicts the disputed claim.
    Countered,
    /// The disputed claim survived the step.
    Upheld,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DisputeGame {
    pub id: GameId,
    pub batch_index: u64,
    /// Output root under dispute.
    pub output_root: Hash,
    /// Output root the challenger believes is correct.
    pub claimed_root: Hash,
    pub status: GameStatus,
    pub claims: Vec<Claim>,
    pub proposer: Address,
    pub challenger: Address,
    pub trace_length: u64,
    pub absolute_prestate: Hash,
    /// Local inputs the disputed program reads, batch index included.
    pub local_context: LocalContext,
    pub step_low: u64,
    pub step_high: u64,
    /// Latest defended claim, committing to `step_low`.
    pub agreed: Option<usize>,
    /// Latest attacked claim, committing to `step_high`.
    pub disputed: usize,
    pub verdict: Option<StepVerdict>,
}

impl DisputeGame {
    /// Open a game over `output`. The root claim is its trace commitment.
    pub fn new(
        id: GameId,
        batch_index: u64,
        output: &OutputProposal,
        claimed_root: Hash,
        challenger: Address,
        config: &GameConfig,
    ) -> GameResult<Self> {
        if !config.trace_length.is_power_of_two() || config.trace_length < 2 {
            return Err(GameError::InvalidTraceLength(config.trace_length));
        }

        let root = Claim {
            index: 0,
            value: output.trace_commitment,
            parent_index: None,
            position: ROOT_POSITION,
            trace_step: config.trace_length,
            claimant: output.proposer,
            countered_by: None,
        };

        Ok(Self {
            id,
            batch_index,
            output_root: output.root,
            claimed_root,
            status: GameStatus::InProgress,
            claims: vec![root],
            proposer: output.proposer,
            challenger,
            trace_length: config.trace_length,
            absolute_prestate: config.absolute_prestate,
            local_context: config.local_inputs.for_batch(batch_index),
            step_low: 0,
            step_high: config.trace_length,
            agreed: None,
            disputed: 0,
            verdict: None,
        })
    }

    pub fn claim(&self, index: usize) -> GameResult<&Claim> {
        self.claims
            .get(index)
            .ok_or(GameError::ClaimNotFound { index })
    }

    pub fn root_claim(&self) -> &Claim {
        &self.claims[0]
    }

    pub fn latest_claim(&self) -> &Claim {
        &self.claims[self.claims.len() - 1]
    }

    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    pub fn width(&self) -> u64 {
        self.step_high - self.step_low
    }

    pub fn at_max_depth(&self) -> bool {
        self.width() == 1
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == GameStatus::InProgress
    }

    /// Hash a step proof must start from.
    pub fn expected_pre_state(&self) -> Hash {
        match self.agreed {
            Some(index) => self.claims[index].value,
            None => self.absolute_prestate,
        }
    }

    /// Step a claim would sit at if made now against the latest claim.
    pub fn next_claim_step(&self, kind: MoveKind) -> u64 {
        let parent_step = self.latest_claim().trace_step;
        let (low, high) = match kind {
            MoveKind::Attack => (self.step_low, parent_step),
            MoveKind::Defend => (parent_step, self.step_high),
        };
        low + (high - low) / 2
    }

    pub fn attack(&mut self, parent_index: usize, value: Hash, claimant: Address) -> GameResult<usize> {
        self.make_move(MoveKind::Attack, parent_index, value, claimant)
    }

    pub fn defend(&mut self, parent_index: usize, value: Hash, claimant: Address) -> GameResult<usize> {
        self.make_move(MoveKind::Defend, parent_index, value, claimant)
    }

    fn make_move(
        &mut self,
        kind: MoveKind,
        parent_index: usize,
        value: Hash,
        claimant: Address,
    ) -> GameResult<usize> {
        if self.status.is_terminal() {
            return Err(GameError::GameResolved);
        }
        let parent = self.claim(parent_index)?;
        let latest = self.claims.len() - 1;
        if parent_index != latest {
            return Err(GameError::OutOfOrderMove {
                parent: parent_index,
                latest,
            });
        }
        if self.at_max_depth() {
            return Err(GameError::MaxDepthReached);
        }
        if kind == MoveKind::Defend && parent.is_root() {
            return Err(GameError::CannotDefendRoot);
        }
        if parent.claimant == claimant {
            return Err(GameError::SelfCounter);
        }

        let parent_step = parent.trace_step;
        let position = kind.child_position(parent.position);
        match kind {
            MoveKind::Attack => {
                self.step_high = parent_step;
                self.disputed = parent_index;
                self.claims[parent_index].countered_by = Some(claimant);
            }
            MoveKind::Defend => {
                self.step_low = parent_step;
                self.agreed = Some(parent_index);
            }
        }

        let index = self.claims.len();
        self.claims.push(Claim {
            index,
            value,
            parent_index: Some(parent_index),
            position,
            trace_step: self.step_low + self.width() / 2,
            claimant,
            countered_by: None,
        });
        Ok(index)
    }

    /// Settle the disputed claim by replaying the instruction at
    /// `step_low`. `pre` must match the agreed claim (or the absolute
    /// prestate when nothing was agreed yet).
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        claim_index: usize,
        state_data: &[u8],
        proof_data: &[u8],
        pre: Hash,
        post: Hash,
        caller: Address,
        verifier: &dyn StepVerifier,
    ) -> GameResult<StepVerdict> {
        if self.status.is_terminal() {
            return Err(GameError::GameResolved);
        }
        if self.verdict.is_some() {
            return Err(GameError::StepAlreadyTaken);
        }
        if !self.at_max_depth() {
            return Err(GameError::NotAtMaxDepth {
                width: self.width(),
            });
        }
        self.claim(claim_index)?;
        if claim_index != self.disputed {
            return Err(GameError::InvalidClaimIndex {
                index: claim_index,
                disputed: self.disputed,
            });
        }

        let expected = self.expected_pre_state();
        if pre != expected {
            return Err(GameError::PreStateMismatch {
                expected,
                actual: pre,
            });
        }

        let verification = verifier.verify(state_data, proof_data, &self.local_context)?;
        if verification.pre != expected {
            return Err(GameError::PreStateMismatch {
                expected,
                actual: verification.pre,
            });
        }

        let disputed = &mut self.claims[claim_index];
        let verdict = if verification.post != post {
            // The submitted post does not follow from the pre-state.
            StepVerdict::Upheld
        } else if verification.post != disputed.value {
            disputed.countered_by = Some(caller);
            StepVerdict::Countered
        } else {
            StepVerdict::Upheld
        };
        self.verdict = Some(verdict);
        Ok(verdict)
    }

    /// Resolvable after a step, or unstepped once the clock has run out.
    ///
    /// On expiry without a step the latest claim stands, unless the range
    /// is already down to one instruction: then the disputed claim stands,
    /// since its opponent owed the step.
    pub fn can_resolve(&self, clock_expired: bool) -> bool {
        self.is_in_progress() && (self.verdict.is_some() || clock_expired)
    }

    pub fn resolve(&mut self, clock_expired: bool) -> GameResult<GameStatus> {
        if self.status.is_terminal() {
            return Err(GameError::GameResolved);
        }
        let disputed_side = Side::of_index(self.disputed);
        let winner = match self.verdict {
            Some(StepVerdict::Countered) => disputed_side.opponent(),
            Some(StepVerdict::Upheld) => disputed_side,
            None if clock_expired && self.at_max_depth() => disputed_side,
            None if clock_expired => self.latest_claim().side(),
            None => return Err(GameError::NotResolvable),
        };
        self.status = GameStatus::won_by(winner);
        Ok(self.status)
    }
}

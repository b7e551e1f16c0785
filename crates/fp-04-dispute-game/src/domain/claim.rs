//! Claims and their place in the binary claim tree.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash};

/// Game identifier on the ledger.
pub type GameId = Address;

/// Root claim position.
pub const ROOT_POSITION: u64 = 0;

/// Which party a claim index belongs to. Even indices (the root included)
/// are the defender's, odd ones the challenger's.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Defender,
    Challenger,
}

impl Side {
    pub fn of_index(index: usize) -> Self {
        if index % 2 == 0 {
            Side::Defender
        } else {
            Side::Challenger
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Side::Defender => Side::Challenger,
            Side::Challenger => Side::Defender,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveKind {
    Attack,
    Defend,
}

impl MoveKind {
    /// Child position in the claim tree.
    pub fn child_position(self, parent: u64) -> u64 {
        match self {
            MoveKind::Attack => parent.wrapping_mul(2).wrapping_add(1),
            MoveKind::Defend => parent.wrapping_mul(2).wrapping_add(2),
        }
    }
}

/// A commitment to the VM state hash at `trace_step`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub index: usize,
    pub value: Hash,
    /// `None` only for the root claim.
    pub parent_index: Option<usize>,
    pub position: u64,
    pub trace_step: u64,
    pub claimant: Address,
    pub countered_by: Option<Address>,
}

impl Claim {
    pub fn side(&self) -> Side {
        Side::of_index(self.index)
    }

    pub fn is_root(&self) -> bool {
        self.parent_index.is_none()
    }
}

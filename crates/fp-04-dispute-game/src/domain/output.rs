//! Output proposals.
//!
//! An output root is the root of the batch state, which is the VM memory
//! at step `trace_length`. The proposer submits the encoded final state
//! alongside it: the state's `mem_root` must be the output root, and its
//! hash becomes the trace commitment the game's root claim stands for.

use fp_03_mips_vm::VmState;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash};

use crate::errors::{GameError, GameResult};

/// An output as recorded on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputProposal {
    pub root: Hash,
    /// State hash at step `trace_length`.
    pub trace_commitment: Hash,
    pub proposer: Address,
}

impl OutputProposal {
    pub fn from_final_state(
        root: Hash,
        final_state: &[u8],
        proposer: Address,
        trace_length: u64,
    ) -> GameResult<Self> {
        let state = VmState::decode(final_state).map_err(GameError::InvalidFinalState)?;
        if state.mem_root != root {
            return Err(GameError::OutputRootMismatch {
                root,
                mem_root: state.mem_root,
            });
        }
        if state.step > trace_length {
            return Err(GameError::FinalStateBeyondTrace {
                step: state.step,
                trace_length,
            });
        }
        Ok(Self {
            root,
            trace_commitment: state.state_hash(),
            proposer,
        })
    }
}

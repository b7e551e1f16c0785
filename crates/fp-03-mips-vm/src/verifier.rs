//! # Step Verifier
//!
//! Replays a single instruction from an encoded pre-state and its witness.
//! This is the check a dispute game runs at maximum depth.

use fp_02_preimage_oracle::PreimageSource;
use serde::{Deserialize, Serialize};
use shared_types::Hash;

use crate::domain::{StepWitness, VmState};
use crate::errors::{VmError, VmResult};
use crate::mips::step;

/// Outcome of replaying one instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepVerification {
    pub pre: Hash,
    pub post: Hash,
    pub post_state: VmState,
}

/// Decode `state_data`, rebuild memory and oracle from `proof_data`, and
/// execute one step. A witnessed local preimage must equal the entry in
/// `local_inputs`.
pub fn verify_step(
    state_data: &[u8],
    proof_data: &[u8],
    local_inputs: &dyn PreimageSource,
) -> VmResult<StepVerification> {
    let pre_state = VmState::decode(state_data)?;
    let witness = StepWitness::decode(proof_data)?;

    let mut memory = witness.memory()?;
    if memory.root() != pre_state.mem_root {
        return Err(VmError::InvalidWitness(
            "memory image does not match mem_root".to_string(),
        ));
    }
    let oracle = witness.oracle(local_inputs)?;

    let post_state = step(&pre_state, &mut memory, &oracle)?;
    Ok(StepVerification {
        pre: pre_state.state_hash(),
        post: post_state.state_hash(),
        post_state,
    })
}

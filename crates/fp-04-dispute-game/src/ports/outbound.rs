//! Driven ports.

use fp_02_preimage_oracle::LocalContext;
use fp_03_mips_vm::{StepVerification, VmResult};

/// Replays one instruction for the terminal step move. `local_inputs` is
/// the disputed game's context; witnessed local preimages must match it.
pub trait StepVerifier: Send + Sync {
    fn verify(
        &self,
        state_data: &[u8],
        proof_data: &[u8],
        local_inputs: &LocalContext,
    ) -> VmResult<StepVerification>;
}

//! Step verification backed by the in-process MIPS interpreter.

use fp_02_preimage_oracle::LocalContext;
use fp_03_mips_vm::{verify_step, StepVerification, VmResult};

use crate::ports::StepVerifier;

#[derive(Clone, Copy, Debug, Default)]
pub struct MipsStepVerifier;

impl StepVerifier for MipsStepVerifier {
    fn verify(
        &self,
        state_data: &[u8],
        proof_data: &[u8],
        local_inputs: &LocalContext,
    ) -> VmResult<StepVerification> {
        verify_step(state_data, proof_data, local_inputs)
    }
}

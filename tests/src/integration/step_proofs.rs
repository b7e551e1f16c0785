//! # Step Proofs
//!
//! Every proof the local executor generates must verify through the same
//! path the ledger uses, including steps that read local inputs. Those
//! only verify against the inputs of the game they were generated for.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fp_02_preimage_oracle::{GameOracle, LocalContext, PreimageStore};
    use fp_03_mips_vm::program::{preimage_reader, sum_to};
    use fp_03_mips_vm::{verify_step, LocalExecutor, VmError, VmStatus};
    use fp_04_dispute_game::{MipsStepVerifier, StepVerifier};

    fn reader_inputs(data: &[u8]) -> LocalContext {
        LocalContext::new().with_input(3, data.to_vec())
    }

    fn reader_executor_over(inputs: LocalContext) -> LocalExecutor {
        let oracle = GameOracle::new(inputs, Arc::new(PreimageStore::new()));
        LocalExecutor::from_program(&preimage_reader(3), Arc::new(oracle)).unwrap()
    }

    fn reader_executor() -> LocalExecutor {
        reader_executor_over(reader_inputs(b"batch inputs for block 42"))
    }

    #[test]
    fn test_every_step_of_reader_trace_verifies() {
        let executor = reader_executor();
        let result = executor.run_to_completion(1_000).unwrap();
        assert_eq!(result.final_state.status(), VmStatus::Valid);

        for step in 0..result.steps {
            let proof = executor.generate_proof(step).unwrap();
            assert_eq!(proof.pre, executor.state_hash_at(step).unwrap());
            assert_eq!(proof.post, executor.state_hash_at(step + 1).unwrap());

            let verified = MipsStepVerifier
                .verify(
                    &proof.state_data,
                    &proof.proof_data,
                    &reader_inputs(b"batch inputs for block 42"),
                )
                .unwrap();
            assert_eq!(verified.pre, proof.pre, "pre mismatch at step {step}");
            assert_eq!(verified.post, proof.post, "post mismatch at step {step}");
        }
    }

    #[test]
    fn test_read_steps_carry_the_preimage() {
        let executor = reader_executor();
        let steps = executor.run_to_completion(1_000).unwrap().steps;
        let with_preimage = (0..steps)
            .map(|step| executor.generate_proof(step).unwrap())
            .filter(|proof| proof.oracle_value.is_some())
            .count();
        assert!(with_preimage > 0);
    }

    #[test]
    fn test_read_steps_only_verify_against_the_games_inputs() {
        let executor = reader_executor();
        let steps = executor.run_to_completion(1_000).unwrap().steps;
        let read = (0..steps)
            .map(|step| executor.generate_proof(step).unwrap())
            .find(|proof| proof.oracle_value.is_some())
            .unwrap();

        let honest = reader_inputs(b"batch inputs for block 42");
        assert!(MipsStepVerifier.verify(&read.state_data, &read.proof_data, &honest).is_ok());

        // The same witness in a game over other inputs, or none at all.
        let other = reader_inputs(b"someone else's block");
        assert!(MipsStepVerifier.verify(&read.state_data, &read.proof_data, &other).is_err());
        assert!(MipsStepVerifier
            .verify(&read.state_data, &read.proof_data, &LocalContext::new())
            .is_err());

        // A prover who runs over forged inputs produces a proof that only
        // its own forged context accepts.
        let forged = reader_executor_over(other.clone()).generate_proof(read.step).unwrap();
        assert!(MipsStepVerifier.verify(&forged.state_data, &forged.proof_data, &honest).is_err());
        assert!(MipsStepVerifier.verify(&forged.state_data, &forged.proof_data, &other).is_ok());
    }

    #[test]
    fn test_tampered_memory_is_rejected() {
        let executor = LocalExecutor::from_program(&sum_to(3), Arc::new(PreimageStore::new())).unwrap();
        let proof = executor.generate_proof(2).unwrap();

        // First word value of the memory image: after the u32 count and
        // the u64 address.
        let mut tampered = proof.proof_data.clone();
        tampered[12] ^= 0xFF;
        assert!(matches!(
            verify_step(&proof.state_data, &tampered, &LocalContext::new()),
            Err(VmError::InvalidWitness(_))
        ));

        assert!(matches!(
            verify_step(&proof.state_data[..100], &proof.proof_data, &LocalContext::new()),
            Err(VmError::InvalidStateData { len: 100, .. })
        ));
    }

    #[test]
    fn test_independent_executors_agree() {
        let a = reader_executor();
        let b = reader_executor();
        assert_eq!(a.absolute_prestate(), b.absolute_prestate());
        for step in [0, 1, 7, 20, 21, 25, 30, 34, 200] {
            assert_eq!(a.state_hash_at(step).unwrap(), b.state_hash_at(step).unwrap());
        }
    }

    #[test]
    fn test_different_preimage_changes_trace() {
        let honest = reader_executor();
        let other = reader_executor_over(reader_inputs(b"different inputs"));

        assert_eq!(honest.absolute_prestate(), other.absolute_prestate());
        let final_honest = honest.run_to_completion(1_000).unwrap();
        let final_other = other.run_to_completion(1_000).unwrap();
        assert_ne!(final_honest.state_hash, final_other.state_hash);
    }
}

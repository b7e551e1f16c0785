//! # State Commitments
//!
//! Output roots as the proposer publishes them and as a verifier checks
//! them: insertion order never matters, proofs verify against the
//! published root, and tampering is caught.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fp_01_trie::{verify_proof, Proof, Trie};
    use fp_02_preimage_oracle::{LocalContext, PreimageStore};
    use fp_03_mips_vm::program::{batch_program, READER_BUF_ADDR};
    use fp_05_bisection::{InMemoryStateProvider, LocalExecutionOracle, StateProvider};
    use rand::seq::SliceRandom;
    use rand::Rng;
    use shared_types::keccak256;

    fn random_entries(count: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|i| {
                let key = keccak256(&(i as u64).to_be_bytes())[..rng.gen_range(1..=32)].to_vec();
                let value: Vec<u8> = (0..rng.gen_range(1..64)).map(|_| rng.gen()).collect();
                (key, value)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_provider_root_ignores_insertion_order() {
        let mut entries = random_entries(200);
        entries.sort();
        entries.dedup_by(|a, b| a.0 == b.0);

        let mut reference = Trie::new();
        for (key, value) in &entries {
            reference.insert(key, value.clone());
        }

        let provider = InMemoryStateProvider::new();
        for batch in 0..4u64 {
            entries.shuffle(&mut rand::thread_rng());
            provider.insert_entries(batch, &entries);
            assert_eq!(
                provider.compute_mpt_root(batch).await.unwrap(),
                reference.root()
            );
        }

        let state = provider.get_verifiable_state(2).await.unwrap();
        assert_eq!(state.state_root, reference.root());
        assert_eq!(state.entries.len(), entries.len());
    }

    #[tokio::test]
    async fn test_provider_proofs_verify_against_published_root() {
        let oracle = LocalExecutionOracle::new(
            &batch_program(2),
            Arc::new(PreimageStore::new()),
            LocalContext::new(),
        )
        .unwrap();
        let provider = InMemoryStateProvider::from_execution(&oracle, 3, 32).unwrap();
        let root = provider.compute_mpt_root(2).await.unwrap();
        let state = provider.get_verifiable_state(2).await.unwrap();

        for (key, value) in &state.entries {
            let proof = provider.generate_proof(2, key).await.unwrap();
            assert_eq!(&proof.value, value);
            assert!(verify_proof(&root, &proof));

            // Survives the wire encoding.
            let decoded = Proof::from_bytes(&proof.to_bytes()).unwrap();
            assert!(verify_proof(&root, &decoded));
        }

        let (key, _) = &state.entries[0];
        let mut forged = provider.generate_proof(2, key).await.unwrap();
        forged.value.push(0);
        assert!(!verify_proof(&root, &forged));

        // A proof from an earlier batch does not verify against a later root.
        let stale = provider
            .generate_proof(0, &READER_BUF_ADDR.to_be_bytes())
            .await
            .unwrap();
        assert!(!verify_proof(&root, &stale));
    }
}

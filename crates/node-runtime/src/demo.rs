//! Demo inputs: the program both parties execute, the local inputs every
//! game hands it, and the preimages the debug server serves.

use fp_02_preimage_oracle::{local_ident, LocalContext, PreimageStore};
use fp_03_mips_vm::program::{batch_program, READER_BUF_ADDR};
use fp_03_mips_vm::Program;

pub const DEMO_CHAIN_ID: u64 = 901;

/// A batch-aware loop long enough to span the whole trace.
///
/// `batch_program(n)` runs `4n + 35` steps; `n` is capped at the largest
/// immediate the loop counter accepts.
pub fn demo_program(trace_length: u64) -> Program {
    let n = (trace_length.saturating_sub(35) / 4).clamp(1, i16::MAX as u64);
    batch_program(n as i16)
}

/// Local inputs shared by every game; each game adds its batch index.
pub fn demo_local_inputs() -> LocalContext {
    LocalContext::new().with_input(local_ident::CHAIN_ID, DEMO_CHAIN_ID.to_be_bytes().to_vec())
}

/// Publish the shared local inputs on the debug server's store.
pub fn seed_preimages(store: &PreimageStore, inputs: &LocalContext) {
    for (ident, data) in inputs.iter() {
        store.add_local_data(ident, data.to_vec());
    }
}

/// State key of the word the demo program writes the batch input's
/// length prefix to. Present in every batch once the input is read.
pub fn batch_input_key() -> [u8; 8] {
    READER_BUF_ADDR.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_02_preimage_oracle::{local_key, GameOracle};
    use fp_03_mips_vm::LocalExecutor;
    use std::sync::Arc;

    #[test]
    fn test_program_spans_trace() {
        for trace_length in [64u64, 1024] {
            let oracle = GameOracle::new(demo_local_inputs().for_batch(3), Arc::new(PreimageStore::new()));
            let executor =
                LocalExecutor::from_program(&demo_program(trace_length), Arc::new(oracle)).unwrap();
            let result = executor.run_to_completion(trace_length * 2).unwrap();
            assert!(result.steps + 4 >= trace_length);
            assert!(result.outcome().is_ok());

            let (_, memory) = executor.run_to_step(trace_length).unwrap();
            assert_eq!(memory.read_word(READER_BUF_ADDR).unwrap(), 8);
            assert!(memory.trie().prove(&batch_input_key()).is_ok());
        }
    }

    #[test]
    fn test_seeded_chain_id() {
        let store = PreimageStore::new();
        seed_preimages(&store, &demo_local_inputs());
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get_preimage(&local_key(local_ident::CHAIN_ID)).unwrap(),
            901u64.to_be_bytes().to_vec()
        );
    }
}

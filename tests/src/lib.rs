//! # Fault-Proof Test Suite
//!
//! Cross-crate tests that no single crate can host on its own.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── fault_proof_benchmarks.rs  # trie roots, VM stepping, state hashing
//! └── src/
//!     ├── fixtures.rs                # shared wiring for dispute scenarios
//!     └── integration/
//!         ├── e2e_dispute.rs         # corrupt output loses, correct one stands
//!         ├── dishonest_parties.rs   # lying traces, silent opponents
//!         ├── step_proofs.rs         # proofs verify against their game inputs
//!         ├── state_commitments.rs   # output roots and inclusion proofs
//!         └── preimage_wire.rs       # wire protocol over TCP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fp-tests
//! cargo test -p fp-tests integration::e2e_dispute
//! cargo bench -p fp-tests
//! ```

pub mod fixtures;
pub mod integration;

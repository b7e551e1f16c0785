pub mod memory_ledger;
pub mod mips_verifier;

pub use memory_ledger::{InMemoryLedger, LedgerClient};
pub use mips_verifier::MipsStepVerifier;

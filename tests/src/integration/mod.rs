//! # Integration Flows
//!
//! Proposer, challenger, ledger and VM wired together the way the node
//! runtime does it, driven tick by tick.

pub mod dishonest_parties;
pub mod e2e_dispute;
pub mod preimage_wire;
pub mod state_commitments;
pub mod step_proofs;

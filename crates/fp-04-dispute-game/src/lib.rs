//! # fp-04-dispute-game
//!
//! Interactive bisection game between a proposer (defender) and a
//! challenger over one output root.
//!
//! ## Rules
//!
//! | Rule | Enforcement |
//! |------|-------------|
//! | Moves extend the latest claim | `OutOfOrderMove` |
//! | Parties alternate | `SelfCounter` |
//! | Root can only be attacked | `CannotDefendRoot` |
//! | No moves once one step remains | `MaxDepthReached` |
//! | Step only at width 1, on the disputed claim | `NotAtMaxDepth`, `InvalidClaimIndex` |
//! | Step starts from the agreed state | `PreStateMismatch` |
//!
//! ## Resolution
//!
//! After a step, a countered disputed claim loses for its side and an
//! upheld one wins. Without a step, once the challenge clock runs out,
//! the side that moved last wins; at one remaining instruction the
//! disputed claim's side wins instead, because the step was owed by its
//! opponent.

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use errors::*;
pub use ports::*;

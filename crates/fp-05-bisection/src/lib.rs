//! # fp-05-bisection
//!
//! Drives dispute games for both parties.
//!
//! - [`controller`]: one action per call on one game (move, step, resolve).
//! - [`challenger`]: recomputes submitted outputs and opens games on a
//!   mismatch.
//! - [`proposer`]: submits outputs and defends games against them.
//! - [`domain`]: the divergence search and move selection, including the
//!   fallback used when execution fails. At max depth the search runs over
//!   the claim tree to find the step to prove.
//! - [`adapters`]: per-batch execution over the local interpreter, and
//!   batch state taken from that execution.
//!
//! ## Move selection
//!
//! ```text
//! local hash at latest claim == claim value  →  Defend (agree, look later)
//! otherwise (or latest claim is the root)     →  Attack (disagree, look earlier)
//! ```
//!
//! The services only talk through the [`fp_04_dispute_game::Ledger`]; they
//! never signal each other directly.

pub mod adapters;
pub mod challenger;
pub mod config;
pub mod controller;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod proposer;

pub use adapters::{InMemoryStateProvider, LocalExecutionOracle};
pub use challenger::{ActiveGame, Challenger, ChallengerStats};
pub use config::{ChallengerConfig, ProposerConfig};
pub use controller::{BisectionController, ControllerAction};
pub use domain::*;
pub use errors::{BisectionError, BisectionResult};
pub use ports::*;
pub use proposer::{Proposer, ProposerStats};

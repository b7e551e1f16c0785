use std::time::Duration;

use fp_02_preimage_oracle::LocalContext;
use serde::{Deserialize, Serialize};
use shared_types::{Hash, ZERO_HASH};

/// Default bisection range: depth 10.
pub const DEFAULT_TRACE_LENGTH: u64 = 1024;
pub const DEFAULT_CHALLENGE_WINDOW: Duration = Duration::from_secs(300);

/// Parameters every game on a ledger shares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of steps under dispute. Must be a power of two.
    pub trace_length: u64,
    /// Time without moves after which a game may resolve unstepped.
    pub challenge_window: Duration,
    /// State hash at step 0 of the program under dispute.
    pub absolute_prestate: Hash,
    /// Local inputs shared by every game. Each game adds its own batch
    /// index on top.
    pub local_inputs: LocalContext,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            trace_length: DEFAULT_TRACE_LENGTH,
            challenge_window: DEFAULT_CHALLENGE_WINDOW,
            absolute_prestate: ZERO_HASH,
            local_inputs: LocalContext::default(),
        }
    }
}

impl GameConfig {
    /// Rounds of bisection until a single instruction remains.
    pub fn max_depth(&self) -> u32 {
        self.trace_length.trailing_zeros()
    }
}

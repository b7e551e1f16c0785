//! Service configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengerConfig {
    pub poll_interval: Duration,
    /// Only batch indices divisible by this are checked.
    pub challenge_every_n: u64,
}

impl Default for ChallengerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            challenge_every_n: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposerConfig {
    pub submit_interval: Duration,
    /// Fault injection: flip one bit of this batch's output root.
    pub corrupt_output: Option<u64>,
}

impl Default for ProposerConfig {
    fn default() -> Self {
        Self {
            submit_interval: Duration::from_millis(5000),
            corrupt_output: None,
        }
    }
}

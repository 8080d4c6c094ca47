//! Core configuration for chrona-animation-core.

use serde::{Deserialize, Serialize};

/// Configuration for scheduler sizing and bounds.
/// Keep this minimal; expand as needed without breaking API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Initial capacity hint for the job arena and the live fan-out list.
    pub job_capacity: usize,

    /// Maximum buffered scheduler events per turn; excess events are dropped
    /// with a warning until the host drains the buffer.
    pub max_events_per_turn: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            job_capacity: 64,
            max_events_per_turn: 1024,
        }
    }
}

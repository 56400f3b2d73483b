//! Expiry reaper configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the booking expiry reaper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Enable/disable the reaper.
    /// When disabled, expired holds are only rejected lazily at confirm
    /// time and their inventory is never released automatically.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How often to scan for lapsed holds (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum holds expired per sweep.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
}

fn default_enabled() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    60
}

fn default_batch_size() -> i64 {
    100
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
        }
    }
}

//! Default value functions for configuration.

use convergence_proto::DEFAULT_DELIMITER;

// =============================================================================
// Bot Defaults
// =============================================================================

pub fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

// =============================================================================
// Scheduler Defaults
// =============================================================================

pub fn default_tick_interval_ms() -> u64 {
    1000
}

pub fn default_allowed_lateness_secs() -> u64 {
    30
}

// =============================================================================
// State Defaults
// =============================================================================

pub fn default_state_path() -> String {
    "convergence.json".to_string()
}

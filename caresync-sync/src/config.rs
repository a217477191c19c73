//! Sync engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the sync engine and its HTTP transport.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL for the sync API (e.g., "https://api.caresync.example").
    pub api_base_url: String,

    /// Stable identifier for this device, stamped on every queued change.
    pub device_id: String,

    /// Interval between periodic sync cycles (seconds).
    pub sync_interval_secs: u64,

    /// Per-request HTTP timeout (seconds).
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.caresync.example".to_string(),
            device_id: "unassigned-device".to_string(),
            sync_interval_secs: 60,
            request_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cycle_interval_is_one_minute() {
        let config = SyncConfig::default();
        assert_eq!(config.sync_interval_secs, 60);
        assert_eq!(config.request_timeout_secs, 30);
    }
}

// Synchronizer timing.
//
// Outbound position updates are throttled to at most one per
// `position_interval_ms`, and only when the local tile actually changed. A
// `ping` goes out every `keepalive_interval_ms` while in a room so the host
// does not evict an idle but connected client.

use pixel_office_sim::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub position_interval_ms: u64,
    pub keepalive_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            position_interval_ms: 200,
            keepalive_interval_ms: 25_000,
        }
    }
}

impl SyncConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = serde_json::from_str(json)?;
        if config.keepalive_interval_ms == 0 {
            return Err(ConfigError::NonPositive {
                field: "keepalive_interval_ms",
            });
        }
        Ok(config)
    }
}

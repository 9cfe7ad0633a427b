// Data-driven engine configuration.
//
// Every tunable the engine reads lives in `OfficeConfig`: tile size, walk
// speed, tick clamping, the remote teleport threshold, and the optional idle
// wander policy for locally driven characters. The engine never hardcodes
// these. All fields have defaults, so a partial JSON document (or `{}`)
// loads cleanly.
//
// See also: `office.rs` which owns an `OfficeConfig`, `character.rs` which
// reads speed and tile size during `advance`.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficeConfig {
    /// Edge length of one tile in pixels. Sub-tile offsets are in pixels.
    pub tile_size_px: f32,
    /// Walk speed. The default of 48 px/s is three 16 px tiles per second.
    pub walk_speed_px_per_sec: f32,
    /// Longest delta a single `tick` will simulate. A stalled frame or a
    /// backgrounded window must not fling characters across the office.
    pub max_tick_delta_ms: u32,
    /// Remote position updates farther than this (Manhattan, in tiles) jump
    /// instead of walking.
    pub teleport_threshold_tiles: u32,
    pub wander: WanderConfig,
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            tile_size_px: 16.0,
            walk_speed_px_per_sec: 48.0,
            max_tick_delta_ms: 100,
            teleport_threshold_tiles: 10,
            wander: WanderConfig::default(),
        }
    }
}

/// Autonomous idle wandering for locally driven, unseated characters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderConfig {
    pub enabled: bool,
    pub min_pause_ms: u32,
    pub max_pause_ms: u32,
    /// Wander targets are drawn within this Manhattan radius of the
    /// character's current tile.
    pub radius: u32,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_pause_ms: 2_000,
            max_pause_ms: 8_000,
            radius: 6,
        }
    }
}

impl OfficeConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: OfficeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size_px.is_nan() || self.tile_size_px <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "tile_size_px",
            });
        }
        if self.walk_speed_px_per_sec.is_nan() || self.walk_speed_px_per_sec <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "walk_speed_px_per_sec",
            });
        }
        if self.max_tick_delta_ms == 0 {
            return Err(ConfigError::NonPositive {
                field: "max_tick_delta_ms",
            });
        }
        Ok(())
    }
}

// Errors surfaced by the sim crate.
//
// Only layout loading and config loading can fail. Engine mutations never
// error: unknown ids, unreachable targets and stale seats are expected under
// eventually-consistent membership and are logged no-ops instead.

use thiserror::Error;

use crate::types::{SeatId, TileCoord};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("grid {cols}x{rows} is outside 1..={max_cols}x1..={max_rows}")]
    Dimensions {
        cols: u32,
        rows: u32,
        max_cols: u32,
        max_rows: u32,
    },

    #[error("layout has {found} tiles, expected {expected}")]
    TileCount { expected: usize, found: usize },

    #[error("furniture {uid} footprint leaves the grid")]
    FurnitureOutOfBounds { uid: String },

    #[error("seat {seat} is declared more than once")]
    DuplicateSeat { seat: SeatId },

    #[error("seat {seat} anchor {anchor} is outside its furniture footprint")]
    AnchorOutsideFootprint { seat: SeatId, anchor: TileCoord },

    #[error("seat {seat} chair cell {chair} is not walkable")]
    ChairBlocked { seat: SeatId, chair: TileCoord },

    #[error("layout spawn {spawn} is not walkable")]
    SpawnBlocked { spawn: TileCoord },

    #[error("invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config field {field} must be positive")]
    NonPositive { field: &'static str },
}

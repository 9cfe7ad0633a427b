// pixel_office_sim: tile-grid movement engine for the shared office.
//
// Everything that decides where characters stand and how they get there:
// the walkability grid, BFS pathfinding, the per-character state machine,
// and the `OfficeState` engine that owns them. No networking and no
// rendering; the sync crate feeds room events in, a presentation layer reads
// characters out.
//
// Module overview:
// - `types.rs`:       TileCoord, Direction, ids, Status, CharacterState, TileKind.
// - `layout.rs`:      OfficeLayout document (terrain + furniture + seats), JSON load/save.
// - `tile_map.rs`:    TileMap built from a layout: walkability, neighbors, seat anchors.
// - `pathfinding.rs`: BFS shortest paths and distance fields.
// - `character.rs`:   Character state machine and sub-tile interpolation.
// - `office.rs`:      OfficeState engine: add/remove, status, seats, moves, tick.
// - `config.rs`:      OfficeConfig + WanderConfig, every tunable the engine reads.
// - `error.rs`:       LayoutError, ConfigError.
// - `prng`:           Re-exported from `pixel_office_prng`, seeds idle wander and spawn picks.
//
// All iteration that can influence outcomes goes through `BTreeMap` or
// row-major `Vec`s, so two engines built from the same layout and seed and
// fed the same calls end up in the same state.

pub mod character;
pub mod config;
pub mod error;
pub mod layout;
pub mod office;
pub mod pathfinding;
pub use pixel_office_prng as prng;
pub mod tile_map;
pub mod types;

pub use character::Character;
pub use config::{OfficeConfig, WanderConfig};
pub use error::{ConfigError, LayoutError};
pub use layout::{FurniturePlacement, OfficeLayout, SeatPlacement, Terrain};
pub use office::{OfficeEvent, OfficeState, TickResult};
pub use pathfinding::{distance_field, find_path, is_reachable};
pub use tile_map::{SeatAnchor, TileMap};
pub use types::{
    CharacterId, CharacterState, Control, Direction, SeatId, Status, TileCoord, TileKind, TileOffset,
};

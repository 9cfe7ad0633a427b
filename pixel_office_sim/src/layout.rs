// Office layout document.
//
// `OfficeLayout` is the data contract shared with the layout loader and the
// editor's save path: grid dimensions, one `Terrain` code per cell
// (row-major), furniture placements with footprints, and optional seats.
// `to_json` / `from_json` are the round-trip the editor relies on;
// `from_json` also validates by building a `TileMap`, so a document that
// loads is a document the engine can run.
//
// Seats are declared on furniture. `SeatPlacement::anchor` is the desk cell,
// relative to the furniture origin, and must lie inside the footprint.
// `SeatPlacement::chair` is relative to the anchor and must end up walkable
// once all furniture is stamped (see `tile_map.rs`).
//
// The grid may be expanded by the editor up to `MAX_COLS` x `MAX_ROWS`;
// that bound also caps worst-case BFS cost (see `pathfinding.rs`).

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::tile_map::TileMap;
use crate::types::{SeatId, TileCoord, TileOffset};

pub const MAX_COLS: u32 = 64;
pub const MAX_ROWS: u32 = 64;

/// Current document version written by `to_json`.
pub const LAYOUT_VERSION: u32 = 1;

/// Base terrain code for one cell, before furniture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    #[default]
    Void,
    Floor,
    Wall,
}

/// A seat carried by a piece of furniture (normally a desk).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPlacement {
    pub id: SeatId,
    /// Desk cell, relative to the furniture origin.
    #[serde(default)]
    pub anchor: TileOffset,
    /// Chair cell, relative to the anchor.
    pub chair: TileOffset,
}

/// One piece of furniture stamped onto the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurniturePlacement {
    pub uid: String,
    pub col: i32,
    pub row: i32,
    #[serde(default = "one")]
    pub width: u32,
    #[serde(default = "one")]
    pub height: u32,
    /// Rugs and similar can be walked over; desks and shelves cannot.
    #[serde(default)]
    pub walkable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat: Option<SeatPlacement>,
}

fn one() -> u32 {
    1
}

fn span(extent: u32) -> i32 {
    i32::try_from(extent).unwrap_or(i32::MAX)
}

impl FurniturePlacement {
    pub fn origin(&self) -> TileCoord {
        TileCoord::new(self.col, self.row)
    }

    /// All cells covered by the footprint, row-major.
    pub fn footprint(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (0..span(self.height)).flat_map(move |dr| {
            (0..span(self.width))
                .map(move |dc| TileCoord::new(self.col.saturating_add(dc), self.row.saturating_add(dr)))
        })
    }

    pub fn covers(&self, cell: TileCoord) -> bool {
        cell.col >= self.col
            && cell.row >= self.row
            && cell.col < self.col.saturating_add(span(self.width))
            && cell.row < self.row.saturating_add(span(self.height))
    }

    /// A 1x1 blocking desk at `desk` whose chair is at `desk + chair`.
    pub fn desk(seat: &str, desk: TileCoord, chair: TileOffset) -> Self {
        Self {
            uid: format!("{seat}-desk"),
            col: desk.col,
            row: desk.row,
            width: 1,
            height: 1,
            walkable: false,
            seat: Some(SeatPlacement {
                id: SeatId::from(seat),
                anchor: TileOffset::default(),
                chair,
            }),
        }
    }
}

/// The full layout document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeLayout {
    #[serde(default = "current_version")]
    pub version: u32,
    pub cols: u32,
    pub rows: u32,
    /// Row-major, `cols * rows` entries.
    pub tiles: Vec<Terrain>,
    #[serde(default)]
    pub furniture: Vec<FurniturePlacement>,
    /// Where newly joined, unseated characters appear. Random walkable cell
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn: Option<TileCoord>,
}

fn current_version() -> u32 {
    LAYOUT_VERSION
}

impl OfficeLayout {
    /// Every cell is floor, no furniture.
    pub fn open_floor(cols: u32, rows: u32) -> Self {
        Self {
            version: LAYOUT_VERSION,
            cols,
            rows,
            tiles: vec![Terrain::Floor; (cols as usize) * (rows as usize)],
            furniture: Vec::new(),
            spawn: None,
        }
    }

    /// Floor surrounded by a one-cell wall border.
    pub fn walled_room(cols: u32, rows: u32) -> Self {
        let mut layout = Self::open_floor(cols, rows);
        for row in 0..rows as i32 {
            for col in 0..cols as i32 {
                let edge = row == 0 || col == 0 || row == rows as i32 - 1 || col == cols as i32 - 1;
                if edge {
                    layout.set_terrain(TileCoord::new(col, row), Terrain::Wall);
                }
            }
        }
        layout
    }

    pub fn with_furniture(mut self, furniture: FurniturePlacement) -> Self {
        self.furniture.push(furniture);
        self
    }

    pub fn with_spawn(mut self, spawn: TileCoord) -> Self {
        self.spawn = Some(spawn);
        self
    }

    pub fn in_bounds(&self, cell: TileCoord) -> bool {
        cell.col >= 0 && cell.row >= 0 && (cell.col as u32) < self.cols && (cell.row as u32) < self.rows
    }

    pub fn terrain(&self, cell: TileCoord) -> Terrain {
        if !self.in_bounds(cell) {
            return Terrain::Void;
        }
        let idx = cell.row as usize * self.cols as usize + cell.col as usize;
        self.tiles.get(idx).copied().unwrap_or_default()
    }

    /// Overwrite one cell's terrain. Out-of-bounds writes are ignored.
    pub fn set_terrain(&mut self, cell: TileCoord, terrain: Terrain) {
        if !self.in_bounds(cell) {
            return;
        }
        let idx = cell.row as usize * self.cols as usize + cell.col as usize;
        if let Some(slot) = self.tiles.get_mut(idx) {
            *slot = terrain;
        }
    }

    pub fn to_json(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a layout document.
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let layout: OfficeLayout = serde_json::from_str(json)?;
        TileMap::from_layout(&layout)?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walled_room_has_wall_border_and_floor_interior() {
        let layout = OfficeLayout::walled_room(5, 4);
        assert_eq!(layout.terrain(TileCoord::new(0, 0)), Terrain::Wall);
        assert_eq!(layout.terrain(TileCoord::new(4, 3)), Terrain::Wall);
        assert_eq!(layout.terrain(TileCoord::new(2, 2)), Terrain::Floor);
        assert_eq!(layout.terrain(TileCoord::new(9, 9)), Terrain::Void);
    }

    #[test]
    fn footprint_covers_width_by_height() {
        let sofa = FurniturePlacement {
            uid: "sofa".into(),
            col: 2,
            row: 1,
            width: 3,
            height: 2,
            walkable: false,
            seat: None,
        };
        let cells: Vec<TileCoord> = sofa.footprint().collect();
        assert_eq!(cells.len(), 6);
        assert!(sofa.covers(TileCoord::new(4, 2)));
        assert!(!sofa.covers(TileCoord::new(5, 2)));
    }

    #[test]
    fn json_roundtrip_keeps_seats_and_spawn() {
        let layout = OfficeLayout::open_floor(6, 6)
            .with_furniture(FurniturePlacement::desk("desk-1", TileCoord::new(3, 3), TileOffset::new(0, 1)))
            .with_spawn(TileCoord::new(0, 0));
        let json = layout.to_json().unwrap();
        let restored = OfficeLayout::from_json(&json).unwrap();
        assert_eq!(restored, layout);
    }

    #[test]
    fn from_json_applies_defaults() {
        let json = r#"{
            "cols": 2, "rows": 1, "tiles": ["floor", "floor"],
            "furniture": [{ "uid": "plant", "col": 1, "row": 0 }]
        }"#;
        let layout = OfficeLayout::from_json(json).unwrap();
        assert_eq!(layout.version, LAYOUT_VERSION);
        assert_eq!(layout.furniture[0].width, 1);
        assert!(!layout.furniture[0].walkable);
    }

    #[test]
    fn from_json_rejects_short_tile_list() {
        let json = r#"{ "cols": 3, "rows": 3, "tiles": ["floor"] }"#;
        assert!(matches!(
            OfficeLayout::from_json(json),
            Err(LayoutError::TileCount { expected: 9, found: 1 })
        ));
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(OfficeLayout::from_json("{nope"), Err(LayoutError::Json(_))));
    }
}

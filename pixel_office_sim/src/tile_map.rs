// Static walkability grid derived from an `OfficeLayout`.
//
// Storage is a flat `Vec<TileKind>` indexed by `col + row * cols`, so every
// lookup is O(1) and iteration order is fixed. Out-of-bounds reads return
// `TileKind::Void`, which is never walkable; callers never need their own
// bounds checks.
//
// Construction stamps furniture over the terrain in declaration order:
// blocking furniture always wins, walkable furniture only covers floor. Each
// seat's anchor cell then becomes `SeatAnchor` (blocked), and only after every
// piece is placed are chair cells checked for walkability, so one desk's
// footprint cannot silently cover another desk's chair.
//
// A `TileMap` is immutable. Rebuilding from a new layout produces a new map;
// the engine (`office.rs`) is responsible for re-pathing characters.
//
// See also: `layout.rs` for the document this is built from,
// `pathfinding.rs` for BFS over `neighbors()`.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::error::LayoutError;
use crate::layout::{MAX_COLS, MAX_ROWS, OfficeLayout, Terrain};
use crate::types::{Direction, SeatId, TileCoord, TileKind};

/// Resolved seat: the blocked desk cell and the walkable chair cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeatAnchor {
    pub anchor: TileCoord,
    pub chair: TileCoord,
}

#[derive(Clone, Debug)]
pub struct TileMap {
    cols: u32,
    rows: u32,
    cells: Vec<TileKind>,
    seats: BTreeMap<SeatId, SeatAnchor>,
}

impl TileMap {
    pub fn from_layout(layout: &OfficeLayout) -> Result<Self, LayoutError> {
        let (cols, rows) = (layout.cols, layout.rows);
        if cols == 0 || rows == 0 || cols > MAX_COLS || rows > MAX_ROWS {
            return Err(LayoutError::Dimensions {
                cols,
                rows,
                max_cols: MAX_COLS,
                max_rows: MAX_ROWS,
            });
        }
        let expected = cols as usize * rows as usize;
        if layout.tiles.len() != expected {
            return Err(LayoutError::TileCount {
                expected,
                found: layout.tiles.len(),
            });
        }

        let cells = layout
            .tiles
            .iter()
            .map(|t| match t {
                Terrain::Void => TileKind::Void,
                Terrain::Floor => TileKind::Floor,
                Terrain::Wall => TileKind::Wall,
            })
            .collect();

        let mut map = Self {
            cols,
            rows,
            cells,
            seats: BTreeMap::new(),
        };

        for piece in &layout.furniture {
            if piece.footprint().any(|cell| !map.in_bounds(cell)) {
                return Err(LayoutError::FurnitureOutOfBounds {
                    uid: piece.uid.clone(),
                });
            }
            for cell in piece.footprint() {
                let current = map.kind(cell);
                let stamped = if !piece.walkable {
                    TileKind::FurnitureBlocking
                } else if current == TileKind::Floor {
                    TileKind::FurnitureWalkable
                } else {
                    current
                };
                map.set(cell, stamped);
            }

            if let Some(seat) = &piece.seat {
                let anchor = match piece.origin().checked_offset(seat.anchor) {
                    Some(anchor) if piece.covers(anchor) => anchor,
                    other => {
                        return Err(LayoutError::AnchorOutsideFootprint {
                            seat: seat.id.clone(),
                            anchor: other.unwrap_or_else(|| piece.origin()),
                        });
                    }
                };
                let Some(chair) = anchor.checked_offset(seat.chair) else {
                    return Err(LayoutError::ChairBlocked {
                        seat: seat.id.clone(),
                        chair: anchor,
                    });
                };
                if map.seats.contains_key(&seat.id) {
                    return Err(LayoutError::DuplicateSeat {
                        seat: seat.id.clone(),
                    });
                }
                map.set(anchor, TileKind::SeatAnchor);
                map.seats.insert(
                    seat.id.clone(),
                    SeatAnchor { anchor, chair },
                );
            }
        }

        for (id, seat) in &map.seats {
            if !map.is_walkable(seat.chair) {
                return Err(LayoutError::ChairBlocked {
                    seat: id.clone(),
                    chair: seat.chair,
                });
            }
        }

        if let Some(spawn) = layout.spawn {
            if !map.is_walkable(spawn) {
                return Err(LayoutError::SpawnBlocked { spawn });
            }
        }

        Ok(map)
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn in_bounds(&self, cell: TileCoord) -> bool {
        cell.col >= 0 && cell.row >= 0 && (cell.col as u32) < self.cols && (cell.row as u32) < self.rows
    }

    /// Flat index of an in-bounds cell.
    pub fn index_of(&self, cell: TileCoord) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.col as usize + cell.row as usize * self.cols as usize)
        } else {
            None
        }
    }

    pub fn coord_of(&self, index: usize) -> TileCoord {
        let cols = self.cols as usize;
        TileCoord::new((index % cols) as i32, (index / cols) as i32)
    }

    pub fn kind(&self, cell: TileCoord) -> TileKind {
        self.index_of(cell)
            .map(|i| self.cells[i])
            .unwrap_or(TileKind::Void)
    }

    fn set(&mut self, cell: TileCoord, kind: TileKind) {
        if let Some(i) = self.index_of(cell) {
            self.cells[i] = kind;
        }
    }

    pub fn is_walkable(&self, cell: TileCoord) -> bool {
        self.kind(cell).is_walkable()
    }

    /// Up to four orthogonal walkable neighbors, in `Direction::ALL` order.
    pub fn neighbors(&self, cell: TileCoord) -> SmallVec<[TileCoord; 4]> {
        Direction::ALL
            .iter()
            .map(|&dir| cell.step(dir))
            .filter(|&next| self.is_walkable(next))
            .collect()
    }

    pub fn walkable_cells(&self) -> Vec<TileCoord> {
        (0..self.cells.len())
            .filter(|&i| self.cells[i].is_walkable())
            .map(|i| self.coord_of(i))
            .collect()
    }

    pub fn seat(&self, seat: &SeatId) -> Option<&SeatAnchor> {
        self.seats.get(seat)
    }

    /// The desk cell of a seat.
    pub fn seat_anchor_cell(&self, seat: &SeatId) -> Option<TileCoord> {
        self.seats.get(seat).map(|s| s.anchor)
    }

    /// The walkable cell a character occupies while seated.
    pub fn chair_cell(&self, seat: &SeatId) -> Option<TileCoord> {
        self.seats.get(seat).map(|s| s.chair)
    }

    pub fn seats(&self) -> impl Iterator<Item = (&SeatId, &SeatAnchor)> {
        self.seats.iter()
    }

    /// Where a walk toward `target` should actually end. A walkable target is
    /// used as-is; a blocked one (a desk, a wall) is redirected to its
    /// orthogonal walkable neighbor closest to `from`.
    pub fn resolve_destination(&self, target: TileCoord, from: TileCoord) -> Option<TileCoord> {
        if self.is_walkable(target) {
            return Some(target);
        }
        self.neighbors(target)
            .into_iter()
            .min_by_key(|cell| cell.manhattan_distance(from))
    }

    /// Closest walkable cell to `origin` by Manhattan distance, searching
    /// outward ring by ring. Used to rescue characters left standing inside
    /// furniture after a layout rebuild.
    pub fn nearest_walkable(&self, origin: TileCoord) -> Option<TileCoord> {
        let reach = self.cols as i32 + self.rows as i32 + origin.col.abs() + origin.row.abs();
        for d in 0..=reach {
            for dc in -d..=d {
                let dr = d - dc.abs();
                let above = TileCoord::new(origin.col + dc, origin.row - dr);
                if self.is_walkable(above) {
                    return Some(above);
                }
                if dr != 0 {
                    let below = TileCoord::new(origin.col + dc, origin.row + dr);
                    if self.is_walkable(below) {
                        return Some(below);
                    }
                }
            }
        }
        None
    }
}

// Core types shared across the office sim.
//
// Grid coordinates (`TileCoord`, `TileOffset`, `Direction`), identifiers
// (`CharacterId`, `SeatId`), and the small enums that describe what a
// character is doing (`Status`, `CharacterState`, `Control`) and what a cell
// is (`TileKind`). Everything derives serde so layouts and engine snapshots
// can be written to JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// A cell on the office grid. `col` grows to the right, `row` grows down
/// (screen convention), so `Direction::Down` is `row + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub col: i32,
    pub row: i32,
}

impl TileCoord {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Saturates at `u32::MAX` for coordinates at opposite ends of the
    /// `i32` range.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        self.col.abs_diff(other.col).saturating_add(self.row.abs_diff(other.row))
    }

    /// The neighboring cell one step in `dir`.
    pub fn step(self, dir: Direction) -> Self {
        let (dc, dr) = dir.delta();
        Self::new(self.col.saturating_add(dc), self.row.saturating_add(dr))
    }

    /// `None` when the result does not fit in `i32`.
    pub fn checked_offset(self, by: TileOffset) -> Option<Self> {
        Some(Self::new(self.col.checked_add(by.col)?, self.row.checked_add(by.row)?))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// A relative displacement in tiles, used by furniture seat placements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileOffset {
    pub col: i32,
    pub row: i32,
}

impl TileOffset {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

/// Facing / traversal direction. Declaration order doubles as the neighbor
/// expansion order for BFS.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// `(d_col, d_row)` for one step.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Direction of a single orthogonal step from `from` to `to`. `None` if
    /// the cells are not orthogonal neighbors.
    pub fn between(from: TileCoord, to: TileCoord) -> Option<Self> {
        let dc = i64::from(to.col) - i64::from(from.col);
        let dr = i64::from(to.row) - i64::from(from.row);
        match (dc, dr) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }

    /// Rough direction toward `to`, preferring the dominant axis. Used to
    /// orient a seated character toward its desk.
    pub fn toward(from: TileCoord, to: TileCoord) -> Option<Self> {
        let dc = i64::from(to.col) - i64::from(from.col);
        let dr = i64::from(to.row) - i64::from(from.row);
        if dc == 0 && dr == 0 {
            None
        } else if dc.abs() >= dr.abs() {
            Some(if dc > 0 { Direction::Right } else { Direction::Left })
        } else {
            Some(if dr > 0 { Direction::Down } else { Direction::Up })
        }
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque per-room participant id. The synchronizer maps protocol player ids
/// onto these one-to-one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub u32);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Named seat, e.g. `"desk-1"`. Serialized as a bare string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(pub String);

impl SeatId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SeatId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SeatId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Behavior enums
// ---------------------------------------------------------------------------

/// What the participant says they are doing. Drives the seated animation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Coding,
    Reading,
    #[default]
    Idle,
    Afk,
}

impl Status {
    /// Coding and reading animate at the desk; idle and afk sit still.
    pub fn is_active(self) -> bool {
        matches!(self, Status::Coding | Status::Reading)
    }
}

/// The character's movement state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterState {
    #[default]
    Idle,
    Walking,
    SittingIdle,
    SittingActive,
}

impl CharacterState {
    pub fn is_sitting(self) -> bool {
        matches!(self, CharacterState::SittingIdle | CharacterState::SittingActive)
    }
}

/// Who decides where a character goes. Remote characters only ever move in
/// response to inbound synchronization events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    Local,
    Remote,
}

/// Classification of one grid cell after furniture has been stamped onto the
/// terrain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    /// Outside the office footprint.
    #[default]
    Void,
    Floor,
    Wall,
    FurnitureBlocking,
    FurnitureWalkable,
    /// The desk cell of a seat. Always blocked.
    SeatAnchor,
}

impl TileKind {
    pub fn is_walkable(self) -> bool {
        matches!(self, TileKind::Floor | TileKind::FurnitureWalkable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = TileCoord::new(0, 0);
        let b = TileCoord::new(3, -4);
        assert_eq!(a.manhattan_distance(b), 7);
        assert_eq!(b.manhattan_distance(a), 7);
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let low = TileCoord::new(i32::MIN, i32::MIN);
        let high = TileCoord::new(i32::MAX, i32::MAX);
        assert_eq!(low.manhattan_distance(high), u32::MAX);
        assert_eq!(TileCoord::new(0, 0).manhattan_distance(TileCoord::new(i32::MIN, 0)), 1 << 31);
        assert_eq!(high.step(Direction::Right), high);
        assert_eq!(low.step(Direction::Up), low);
        assert_eq!(high.checked_offset(TileOffset::new(1, 0)), None);
        assert_eq!(
            TileCoord::new(2, 3).checked_offset(TileOffset::new(-1, 1)),
            Some(TileCoord::new(1, 4))
        );
        assert_eq!(Direction::between(low, high), None);
        assert_eq!(Direction::toward(low, high), Some(Direction::Right));
    }

    #[test]
    fn step_and_between_agree() {
        let origin = TileCoord::new(5, 5);
        for dir in Direction::ALL {
            assert_eq!(Direction::between(origin, origin.step(dir)), Some(dir));
        }
        assert_eq!(Direction::between(origin, TileCoord::new(6, 6)), None);
        assert_eq!(Direction::between(origin, origin), None);
    }

    #[test]
    fn toward_prefers_dominant_axis() {
        let chair = TileCoord::new(3, 4);
        assert_eq!(Direction::toward(chair, TileCoord::new(3, 3)), Some(Direction::Up));
        assert_eq!(Direction::toward(chair, TileCoord::new(7, 5)), Some(Direction::Right));
        assert_eq!(Direction::toward(chair, chair), None);
    }

    #[test]
    fn status_activity() {
        assert!(Status::Coding.is_active());
        assert!(Status::Reading.is_active());
        assert!(!Status::Idle.is_active());
        assert!(!Status::Afk.is_active());
    }

    #[test]
    fn seat_id_serializes_as_plain_string() {
        let seat = SeatId::from("desk-1");
        assert_eq!(serde_json::to_string(&seat).unwrap(), "\"desk-1\"");
        assert_eq!(serde_json::to_string(&Status::Afk).unwrap(), "\"afk\"");
    }
}

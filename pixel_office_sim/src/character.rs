// Per-participant character: movement state machine and sub-tile motion.
//
// States and transitions:
//
//   Idle ──assign_path(non-empty)──> Walking
//   Walking ──path exhausted, at bound chair──> SittingActive | SittingIdle
//   Walking ──path exhausted, otherwise──> Idle
//   Sitting* ──assign_path(non-empty)──> Walking
//   Sitting* ──clear_seat──> Idle
//   SittingIdle <──set_status──> SittingActive
//
// A character only sits when it comes to rest on the chair cell of the seat
// it is bound to. Walking elsewhere keeps the binding but ends `Idle`.
//
// Motion: `tile` is the last cell fully reached. While the path is
// non-empty, `step_progress_px` is the distance already covered toward
// `path.front()`, so the render offset is the traversal direction scaled by
// that progress. A step that has started is committed: re-pathing mid-step
// keeps the front cell and starts the new route from there (`path_origin`),
// so a character never snaps backwards.
//
// The character has no access to the tile map. Callers (see `office.rs`)
// compute paths with `pathfinding::find_path` and pass in the resolved seat.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::tile_map::SeatAnchor;
use crate::types::{CharacterId, CharacterState, Control, Direction, SeatId, Status, TileCoord};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    /// Sprite variant selector. Opaque to the engine.
    pub character_index: u32,
    pub control: Control,
    status: Status,
    seat: Option<SeatId>,
    tile: TileCoord,
    facing: Direction,
    path: VecDeque<TileCoord>,
    step_progress_px: f32,
    state: CharacterState,
    /// Countdown until the next idle wander, for local characters.
    pub(crate) wander_pause_ms: u32,
}

/// What happened during one `advance`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Advance {
    /// Cells reached this step, in order.
    pub entered: SmallVec<[TileCoord; 2]>,
    /// The path ran out this step and the character came to rest.
    pub settled: bool,
}

impl Character {
    pub fn new(id: CharacterId, character_index: u32, control: Control, tile: TileCoord) -> Self {
        Self {
            id,
            character_index,
            control,
            status: Status::default(),
            seat: None,
            tile,
            facing: Direction::default(),
            path: VecDeque::new(),
            step_progress_px: 0.0,
            state: CharacterState::Idle,
            wander_pause_ms: 0,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn seat(&self) -> Option<&SeatId> {
        self.seat.as_ref()
    }

    pub fn tile(&self) -> TileCoord {
        self.tile
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn state(&self) -> CharacterState {
        self.state
    }

    pub fn path(&self) -> &VecDeque<TileCoord> {
        &self.path
    }

    pub fn is_local(&self) -> bool {
        self.control == Control::Local
    }

    /// Where the character will stand once its current path is done.
    pub fn destination(&self) -> TileCoord {
        self.path.back().copied().unwrap_or(self.tile)
    }

    /// True while part-way between `tile` and the next queued cell.
    pub fn is_mid_step(&self) -> bool {
        self.step_progress_px > 0.0 && !self.path.is_empty()
    }

    /// The cell a freshly computed path must start from.
    pub fn path_origin(&self) -> TileCoord {
        match self.path.front() {
            Some(&next) if self.is_mid_step() => next,
            _ => self.tile,
        }
    }

    /// Render offset in pixels from the center of `tile` toward the next
    /// queued cell.
    pub fn pixel_offset(&self) -> (f32, f32) {
        let Some(&next) = self.path.front() else {
            return (0.0, 0.0);
        };
        match Direction::between(self.tile, next) {
            Some(dir) => {
                let (dc, dr) = dir.delta();
                (dc as f32 * self.step_progress_px, dr as f32 * self.step_progress_px)
            }
            None => (0.0, 0.0),
        }
    }

    /// Absolute pixel position of the character's tile origin plus offset.
    pub fn pixel_position(&self, tile_size_px: f32) -> (f32, f32) {
        let (ox, oy) = self.pixel_offset();
        (
            self.tile.col as f32 * tile_size_px + ox,
            self.tile.row as f32 * tile_size_px + oy,
        )
    }

    /// Replace the queued path. `path` must start adjacent to `path_origin()`.
    /// An empty path settles the character where it stands (or where its
    /// committed step lands).
    pub fn assign_path(&mut self, path: Vec<TileCoord>, seat: Option<&SeatAnchor>) {
        let committed = if self.is_mid_step() {
            self.path.front().copied()
        } else {
            None
        };
        self.path.clear();
        self.path.extend(committed);
        self.path.extend(path);
        if !self.is_mid_step() {
            self.step_progress_px = 0.0;
        }

        if self.path.is_empty() {
            self.settle(seat);
        } else {
            self.state = CharacterState::Walking;
        }
    }

    /// Jump to `tile`, dropping any queued path, then settle there.
    pub fn place_at(&mut self, tile: TileCoord, seat: Option<&SeatAnchor>) {
        self.tile = tile;
        self.path.clear();
        self.step_progress_px = 0.0;
        self.settle(seat);
    }

    /// Bind a seat. The caller issues the path to its chair.
    pub fn bind_seat(&mut self, seat: SeatId) {
        self.seat = Some(seat);
    }

    /// Drop the seat binding, standing up if seated. Returns whether a
    /// binding existed.
    pub fn clear_seat(&mut self) -> bool {
        if self.seat.take().is_none() {
            return false;
        }
        if self.state.is_sitting() {
            self.state = CharacterState::Idle;
        }
        true
    }

    /// Returns whether anything observable changed.
    pub fn set_status(&mut self, status: Status) -> bool {
        let before = (self.status, self.state);
        self.status = status;
        if self.state.is_sitting() {
            self.state = self.sitting_state();
        }
        before != (self.status, self.state)
    }

    /// Move along the queued path for `dt_ms`. Distance left over after a
    /// cell is reached carries into the next cell.
    pub fn advance(
        &mut self,
        dt_ms: u32,
        speed_px_per_sec: f32,
        tile_size_px: f32,
        seat: Option<&SeatAnchor>,
    ) -> Advance {
        let mut result = Advance::default();
        if self.state != CharacterState::Walking {
            return result;
        }

        let mut budget = speed_px_per_sec * dt_ms as f32 / 1000.0;
        while budget > 0.0 {
            let Some(&next) = self.path.front() else {
                break;
            };
            if let Some(dir) = Direction::between(self.tile, next) {
                self.facing = dir;
            }
            let remaining = tile_size_px - self.step_progress_px;
            if budget >= remaining {
                budget -= remaining;
                self.step_progress_px = 0.0;
                self.path.pop_front();
                self.tile = next;
                result.entered.push(next);
            } else {
                self.step_progress_px += budget;
                budget = 0.0;
            }
        }

        if self.path.is_empty() {
            self.settle(seat);
            result.settled = true;
        }
        result
    }

    fn settle(&mut self, seat: Option<&SeatAnchor>) {
        self.step_progress_px = 0.0;
        match seat {
            Some(s) if self.seat.is_some() && s.chair == self.tile => {
                if let Some(dir) = Direction::toward(self.tile, s.anchor) {
                    self.facing = dir;
                }
                self.state = self.sitting_state();
            }
            _ => self.state = CharacterState::Idle,
        }
    }

    fn sitting_state(&self) -> CharacterState {
        if self.status.is_active() {
            CharacterState::SittingActive
        } else {
            CharacterState::SittingIdle
        }
    }
}

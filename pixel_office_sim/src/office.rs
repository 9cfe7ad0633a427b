// Office state engine.
//
// `OfficeState` exclusively owns the tile map, the layout it was built from,
// and every `Character` in the current room. All mutation goes through the
// methods here, synchronously, from whichever single thread runs the tick
// loop and drains network input.
//
// Mutations never fail. A request naming an unknown character, an unknown
// seat, or an unreachable target is expected traffic under eventually
// consistent membership: it is logged at debug and returns `false`. The
// `bool` says whether anything changed, which the synchronizer uses to decide
// whether an intent is worth broadcasting.
//
// Characters are held in a `BTreeMap` so `tick` visits them in id order and
// wander choices (drawn from the shared `OfficeRng`) are reproducible for a
// given seed.
//
// See also: `character.rs` for the per-character state machine,
// `pathfinding.rs` for BFS, `tile_map.rs` for walkability and seats, and the
// `pixel_office_sync` crate which drives this engine from room events.

use std::collections::BTreeMap;

use pixel_office_prng::OfficeRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::character::Character;
use crate::config::OfficeConfig;
use crate::error::LayoutError;
use crate::layout::OfficeLayout;
use crate::pathfinding::find_path;
use crate::tile_map::TileMap;
use crate::types::{CharacterId, CharacterState, Control, SeatId, Status, TileCoord};

/// Something a presentation layer may want to react to after a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OfficeEvent {
    TileEntered { id: CharacterId, tile: TileCoord },
    Settled { id: CharacterId, state: CharacterState },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickResult {
    pub events: Vec<OfficeEvent>,
}

pub struct OfficeState {
    config: OfficeConfig,
    layout: OfficeLayout,
    map: TileMap,
    characters: BTreeMap<CharacterId, Character>,
    rng: OfficeRng,
}

impl OfficeState {
    pub fn new(layout: OfficeLayout, config: OfficeConfig, seed: u64) -> Result<Self, LayoutError> {
        let map = TileMap::from_layout(&layout)?;
        Ok(Self {
            config,
            layout,
            map,
            characters: BTreeMap::new(),
            rng: OfficeRng::new(seed),
        })
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Create a character at its seat's chair, else the layout spawn, else a
    /// random walkable cell. An unknown seat is dropped. Returns `false` if
    /// `id` is already present.
    pub fn add_character(
        &mut self,
        id: CharacterId,
        character_index: u32,
        seat: Option<SeatId>,
        control: Control,
    ) -> bool {
        let seat = seat.filter(|s| self.known_seat(id, s));
        let tile = seat
            .as_ref()
            .and_then(|s| self.map.chair_cell(s))
            .or(self.layout.spawn)
            .unwrap_or_else(|| self.random_walkable_cell());
        self.insert_character(id, character_index, seat, control, tile)
    }

    /// Like `add_character`, but placed at a known tile (e.g. a position
    /// reported in a membership snapshot). The seat binding is still kept and
    /// the character sits if `tile` is that seat's chair.
    pub fn add_character_at(
        &mut self,
        id: CharacterId,
        character_index: u32,
        seat: Option<SeatId>,
        control: Control,
        tile: TileCoord,
    ) -> bool {
        if !self.map.in_bounds(tile) {
            debug!(%id, %tile, "spawn tile out of bounds, using default spawn");
            return self.add_character(id, character_index, seat, control);
        }
        let seat = seat.filter(|s| self.known_seat(id, s));
        self.insert_character(id, character_index, seat, control, tile)
    }

    fn insert_character(
        &mut self,
        id: CharacterId,
        character_index: u32,
        seat: Option<SeatId>,
        control: Control,
        tile: TileCoord,
    ) -> bool {
        if self.characters.contains_key(&id) {
            debug!(%id, "add_character: already present");
            return false;
        }
        let mut ch = Character::new(id, character_index, control, tile);
        ch.wander_pause_ms = self.config.wander.min_pause_ms;
        if let Some(s) = seat {
            ch.bind_seat(s);
        }
        let anchor = ch.seat().and_then(|s| self.map.seat(s));
        ch.place_at(tile, anchor);
        debug!(%id, %tile, ?control, "character added");
        self.characters.insert(id, ch);
        true
    }

    pub fn remove_character(&mut self, id: CharacterId) -> bool {
        if self.characters.remove(&id).is_some() {
            debug!(%id, "character removed");
            true
        } else {
            debug!(%id, "remove_character: unknown id");
            false
        }
    }

    /// Drop every character. Used when leaving or switching rooms.
    pub fn clear_characters(&mut self) {
        self.characters.clear();
    }

    // -----------------------------------------------------------------------
    // Behavior
    // -----------------------------------------------------------------------

    pub fn set_status(&mut self, id: CharacterId, status: Status) -> bool {
        match self.characters.get_mut(&id) {
            Some(ch) => ch.set_status(status),
            None => {
                debug!(%id, ?status, "set_status: unknown id");
                false
            }
        }
    }

    /// Bind `seat` and walk to its chair, or with `None` drop the binding and
    /// stay put. Re-applying the current binding while already seated or en
    /// route changes nothing.
    pub fn set_seat(&mut self, id: CharacterId, seat: Option<SeatId>) -> bool {
        let Some(seat) = seat else {
            return match self.characters.get_mut(&id) {
                Some(ch) => ch.clear_seat(),
                None => {
                    debug!(%id, "set_seat: unknown id");
                    false
                }
            };
        };
        let Some(anchor) = self.map.seat(&seat) else {
            debug!(%id, %seat, "set_seat: unknown seat");
            return false;
        };
        let Some(ch) = self.characters.get_mut(&id) else {
            debug!(%id, "set_seat: unknown id");
            return false;
        };

        let rebinding = ch.seat() != Some(&seat);
        let heading_there = ch.destination() == anchor.chair;
        if !rebinding && heading_there && (ch.state().is_sitting() || !ch.path().is_empty()) {
            return false;
        }

        ch.bind_seat(seat.clone());
        match find_path(&self.map, ch.path_origin(), anchor.chair) {
            Some(path) => {
                ch.assign_path(path, Some(anchor));
                true
            }
            None => {
                debug!(%id, %seat, "set_seat: chair unreachable, binding only");
                rebinding
            }
        }
    }

    /// Path to `target` and start walking. A blocked target walks to its
    /// nearest walkable neighbor instead. Unreachable targets are a no-op.
    pub fn move_to(&mut self, id: CharacterId, target: TileCoord) -> bool {
        let Some(ch) = self.characters.get_mut(&id) else {
            debug!(%id, "move_to: unknown id");
            return false;
        };
        let origin = ch.path_origin();
        let Some(dest) = self.map.resolve_destination(target, origin) else {
            debug!(%id, %target, "move_to: no walkable cell at or beside target");
            return false;
        };
        let Some(path) = find_path(&self.map, origin, dest) else {
            debug!(%id, from = %origin, to = %dest, "move_to: unreachable");
            return false;
        };
        let anchor = ch.seat().and_then(|s| self.map.seat(s));
        ch.assign_path(path, anchor);
        true
    }

    /// Jump straight to `target`, dropping any queued path. A blocked target
    /// lands on the nearest walkable cell instead.
    pub fn teleport_to(&mut self, id: CharacterId, target: TileCoord) -> bool {
        if !self.map.in_bounds(target) {
            debug!(%id, %target, "teleport_to: out of bounds");
            return false;
        }
        let target = if self.map.is_walkable(target) {
            target
        } else {
            match self.map.nearest_walkable(target) {
                Some(cell) => cell,
                None => {
                    debug!(%id, %target, "teleport_to: no walkable cell");
                    return false;
                }
            }
        };
        let Some(ch) = self.characters.get_mut(&id) else {
            debug!(%id, "teleport_to: unknown id");
            return false;
        };
        let anchor = ch.seat().and_then(|s| self.map.seat(s));
        ch.place_at(target, anchor);
        true
    }

    /// Swap in a new layout. On error the current map is kept untouched.
    ///
    /// Characters standing on cells that became blocked move to the nearest
    /// walkable cell. Bindings to seats that no longer exist are dropped.
    /// In-flight paths are recomputed toward their old destination, or
    /// dropped if it can no longer be reached.
    pub fn rebuild_from_layout(&mut self, layout: OfficeLayout) -> Result<(), LayoutError> {
        let map = TileMap::from_layout(&layout)?;

        for ch in self.characters.values_mut() {
            if let Some(seat) = ch.seat() {
                if map.seat(seat).is_none() {
                    debug!(id = %ch.id, %seat, "seat removed by layout rebuild");
                    ch.clear_seat();
                }
            }

            let destination = ch.destination();
            let had_path = !ch.path().is_empty();
            let mut tile = ch.tile();
            if !map.is_walkable(tile) {
                if let Some(rescued) = map.nearest_walkable(tile) {
                    debug!(id = %ch.id, from = %tile, to = %rescued, "relocated out of blocked cell");
                    tile = rescued;
                }
            }
            let anchor = ch.seat().and_then(|s| map.seat(s));
            ch.place_at(tile, anchor);

            if had_path {
                let repath = map
                    .resolve_destination(destination, tile)
                    .and_then(|dest| find_path(&map, tile, dest));
                match repath {
                    Some(path) => ch.assign_path(path, anchor),
                    None => debug!(id = %ch.id, %destination, "path dropped by layout rebuild"),
                }
            }
        }

        self.map = map;
        self.layout = layout;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance every character by `dt_ms` (clamped to
    /// `config.max_tick_delta_ms`), then let idle local characters wander if
    /// enabled.
    pub fn tick(&mut self, dt_ms: u32) -> TickResult {
        let dt_ms = dt_ms.min(self.config.max_tick_delta_ms);
        let mut result = TickResult::default();

        for ch in self.characters.values_mut() {
            let anchor = ch.seat().and_then(|s| self.map.seat(s));
            let step = ch.advance(
                dt_ms,
                self.config.walk_speed_px_per_sec,
                self.config.tile_size_px,
                anchor,
            );
            for tile in step.entered {
                result.events.push(OfficeEvent::TileEntered { id: ch.id, tile });
            }
            if step.settled {
                result.events.push(OfficeEvent::Settled {
                    id: ch.id,
                    state: ch.state(),
                });
            }
        }

        if self.config.wander.enabled {
            self.run_wander(dt_ms);
        }
        result
    }

    fn run_wander(&mut self, dt_ms: u32) {
        let wander = &self.config.wander;
        for ch in self.characters.values_mut() {
            if !ch.is_local() || ch.seat().is_some() || ch.state() != CharacterState::Idle {
                continue;
            }
            if ch.wander_pause_ms > dt_ms {
                ch.wander_pause_ms -= dt_ms;
                continue;
            }
            ch.wander_pause_ms = self
                .rng
                .range_f32(wander.min_pause_ms as f32, wander.max_pause_ms as f32)
                as u32;

            let radius = wander.radius as i64;
            if radius == 0 {
                continue;
            }
            let here = ch.tile();
            for _ in 0..8 {
                let dc = self.rng.range_u64(0, (2 * radius + 1) as u64) as i64 - radius;
                let dr = self.rng.range_u64(0, (2 * radius + 1) as u64) as i64 - radius;
                if dc.abs() + dr.abs() > radius || (dc == 0 && dr == 0) {
                    continue;
                }
                let target = TileCoord::new(here.col + dc as i32, here.row + dr as i32);
                if let Some(path) = find_path(&self.map, here, target) {
                    debug!(id = %ch.id, %target, "wander");
                    ch.assign_path(path, None);
                    break;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// All characters in id order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn character_ids(&self) -> Vec<CharacterId> {
        self.characters.keys().copied().collect()
    }

    pub fn contains(&self, id: CharacterId) -> bool {
        self.characters.contains_key(&id)
    }

    pub fn tile_map(&self) -> &TileMap {
        &self.map
    }

    pub fn layout(&self) -> &OfficeLayout {
        &self.layout
    }

    pub fn config(&self) -> &OfficeConfig {
        &self.config
    }

    /// Lowest-id character bound to `seat`, if any.
    pub fn seat_occupant(&self, seat: &SeatId) -> Option<CharacterId> {
        self.characters
            .values()
            .find(|ch| ch.seat() == Some(seat))
            .map(|ch| ch.id)
    }

    /// First seat (in seat-id order) nobody is bound to.
    pub fn first_free_seat(&self) -> Option<SeatId> {
        self.map
            .seats()
            .map(|(id, _)| id)
            .find(|id| self.seat_occupant(id).is_none())
            .cloned()
    }

    fn known_seat(&self, id: CharacterId, seat: &SeatId) -> bool {
        let known = self.map.seat(seat).is_some();
        if !known {
            debug!(%id, %seat, "unknown seat ignored");
        }
        known
    }

    fn random_walkable_cell(&mut self) -> TileCoord {
        let cells = self.map.walkable_cells();
        self.rng
            .choose(&cells)
            .copied()
            .unwrap_or(TileCoord::new(0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WanderConfig;
    use crate::layout::FurniturePlacement;
    use crate::types::TileOffset;

    fn desk_office() -> OfficeState {
        let layout = OfficeLayout::open_floor(10, 10)
            .with_furniture(FurniturePlacement::desk(
                "desk-1",
                TileCoord::new(3, 3),
                TileOffset::new(0, 1),
            ))
            .with_spawn(TileCoord::new(0, 0));
        OfficeState::new(layout, OfficeConfig::default(), 7).unwrap()
    }

    fn run(office: &mut OfficeState, ms: u32) {
        for _ in 0..ms / 50 {
            office.tick(50);
        }
    }

    const A: CharacterId = CharacterId(1);
    const B: CharacterId = CharacterId(2);

    #[test]
    fn add_uses_layout_spawn_and_rejects_duplicates() {
        let mut office = desk_office();
        assert!(office.add_character(A, 0, None, Control::Local));
        assert_eq!(office.character(A).unwrap().tile(), TileCoord::new(0, 0));
        assert!(!office.add_character(A, 3, None, Control::Remote));
        assert_eq!(office.character(A).unwrap().character_index, 0);
    }

    #[test]
    fn add_with_seat_spawns_seated() {
        let mut office = desk_office();
        office.add_character(A, 0, Some(SeatId::from("desk-1")), Control::Remote);
        let ch = office.character(A).unwrap();
        assert_eq!(ch.tile(), TileCoord::new(3, 4));
        assert_eq!(ch.state(), CharacterState::SittingIdle);
    }

    #[test]
    fn unknown_seat_on_add_is_dropped() {
        let mut office = desk_office();
        office.add_character(A, 0, Some(SeatId::from("ghost")), Control::Remote);
        assert!(office.character(A).unwrap().seat().is_none());
    }

    #[test]
    fn mutations_on_unknown_ids_are_noops() {
        let mut office = desk_office();
        assert!(!office.remove_character(A));
        assert!(!office.set_status(A, Status::Coding));
        assert!(!office.set_seat(A, Some(SeatId::from("desk-1"))));
        assert!(!office.move_to(A, TileCoord::new(1, 1)));
        assert!(!office.teleport_to(A, TileCoord::new(1, 1)));
    }

    #[test]
    fn set_seat_walks_to_chair_and_sits() {
        let mut office = desk_office();
        office.add_character(A, 0, None, Control::Local);
        office.set_status(A, Status::Reading);
        assert!(office.set_seat(A, Some(SeatId::from("desk-1"))));
        assert_eq!(office.character(A).unwrap().state(), CharacterState::Walking);
        // (0,0) -> (3,4) is 7 steps at 3 tiles/s.
        run(&mut office, 3_000);
        let ch = office.character(A).unwrap();
        assert_eq!(ch.tile(), TileCoord::new(3, 4));
        assert_eq!(ch.state(), CharacterState::SittingActive);
    }

    #[test]
    fn set_seat_twice_is_idempotent() {
        let mut office = desk_office();
        office.add_character(A, 0, None, Control::Remote);
        let seat = Some(SeatId::from("desk-1"));
        assert!(office.set_seat(A, seat.clone()));
        let path_once: Vec<TileCoord> = office.character(A).unwrap().path().iter().copied().collect();
        assert!(!office.set_seat(A, seat));
        let path_twice: Vec<TileCoord> = office.character(A).unwrap().path().iter().copied().collect();
        assert_eq!(path_once, path_twice);
    }

    #[test]
    fn clearing_seat_leaves_character_in_place() {
        let mut office = desk_office();
        office.add_character(A, 0, Some(SeatId::from("desk-1")), Control::Local);
        assert!(office.set_seat(A, None));
        let ch = office.character(A).unwrap();
        assert_eq!(ch.tile(), TileCoord::new(3, 4));
        assert_eq!(ch.state(), CharacterState::Idle);
        assert!(!office.set_seat(A, None));
    }

    #[test]
    fn unknown_seat_is_a_noop() {
        let mut office = desk_office();
        office.add_character(A, 0, None, Control::Local);
        assert!(!office.set_seat(A, Some(SeatId::from("ghost"))));
        assert!(office.character(A).unwrap().seat().is_none());
    }

    #[test]
    fn move_to_blocked_desk_stops_beside_it() {
        let mut office = desk_office();
        office.add_character(A, 0, None, Control::Local);
        assert!(office.move_to(A, TileCoord::new(3, 3)));
        let dest = office.character(A).unwrap().destination();
        assert_eq!(dest.manhattan_distance(TileCoord::new(3, 3)), 1);
        assert!(office.tile_map().is_walkable(dest));
    }

    #[test]
    fn move_to_unreachable_is_noop() {
        let mut layout = OfficeLayout::open_floor(5, 3);
        for row in 0..3 {
            layout.set_terrain(TileCoord::new(2, row), crate::layout::Terrain::Wall);
        }
        let mut office = OfficeState::new(layout.with_spawn(TileCoord::new(0, 0)), OfficeConfig::default(), 1).unwrap();
        office.add_character(A, 0, None, Control::Local);
        assert!(!office.move_to(A, TileCoord::new(4, 1)));
        let ch = office.character(A).unwrap();
        assert_eq!(ch.tile(), TileCoord::new(0, 0));
        assert_eq!(ch.state(), CharacterState::Idle);
    }

    #[test]
    fn teleport_clears_queue() {
        let mut office = desk_office();
        office.add_character(A, 0, None, Control::Remote);
        office.move_to(A, TileCoord::new(9, 9));
        assert!(office.teleport_to(A, TileCoord::new(5, 0)));
        let ch = office.character(A).unwrap();
        assert_eq!(ch.tile(), TileCoord::new(5, 0));
        assert!(ch.path().is_empty());
        assert_eq!(ch.state(), CharacterState::Idle);
    }

    #[test]
    fn teleport_onto_furniture_lands_beside_it() {
        let mut office = desk_office();
        office.add_character(A, 0, None, Control::Remote);
        assert!(office.teleport_to(A, TileCoord::new(3, 3)));
        let tile = office.character(A).unwrap().tile();
        assert_ne!(tile, TileCoord::new(3, 3));
        assert_eq!(tile.manhattan_distance(TileCoord::new(3, 3)), 1);
        assert!(office.tile_map().is_walkable(tile));
    }

    #[test]
    fn tick_clamps_large_deltas() {
        let mut office = desk_office();
        office.add_character(A, 0, None, Control::Local);
        office.move_to(A, TileCoord::new(0, 9));
        // 10 s would cover the whole path; the clamp allows only 100 ms.
        let result = office.tick(10_000);
        assert!(result.events.is_empty());
        assert_eq!(office.character(A).unwrap().tile(), TileCoord::new(0, 0));
    }

    #[test]
    fn tick_reports_entered_tiles_and_settling() {
        let mut office = desk_office();
        office.add_character(A, 0, None, Control::Local);
        office.move_to(A, TileCoord::new(1, 0));
        let mut events = Vec::new();
        for _ in 0..10 {
            events.extend(office.tick(100).events);
        }
        assert_eq!(
            events,
            vec![
                OfficeEvent::TileEntered { id: A, tile: TileCoord::new(1, 0) },
                OfficeEvent::Settled { id: A, state: CharacterState::Idle },
            ]
        );
    }

    #[test]
    fn rebuild_relocates_and_drops_vanished_seats() {
        let mut office = desk_office();
        office.add_character(A, 0, Some(SeatId::from("desk-1")), Control::Local);
        office.add_character(B, 0, None, Control::Remote);
        office.teleport_to(B, TileCoord::new(6, 6));

        // New layout: no desk, and a bookshelf where B stands.
        let layout = OfficeLayout::open_floor(10, 10).with_furniture(FurniturePlacement {
            uid: "shelf".into(),
            col: 6,
            row: 6,
            width: 1,
            height: 1,
            walkable: false,
            seat: None,
        });
        office.rebuild_from_layout(layout).unwrap();

        let a = office.character(A).unwrap();
        assert!(a.seat().is_none());
        assert_eq!(a.state(), CharacterState::Idle);
        let b = office.character(B).unwrap();
        assert!(office.tile_map().is_walkable(b.tile()));
        assert_eq!(b.tile().manhattan_distance(TileCoord::new(6, 6)), 1);
    }

    #[test]
    fn failed_rebuild_keeps_old_map() {
        let mut office = desk_office();
        let bad = OfficeLayout::open_floor(0, 0);
        assert!(office.rebuild_from_layout(bad).is_err());
        assert!(office.tile_map().seat(&SeatId::from("desk-1")).is_some());
    }

    #[test]
    fn rebuild_repaths_in_flight_walk() {
        let mut office = desk_office();
        office.add_character(A, 0, None, Control::Local);
        office.move_to(A, TileCoord::new(0, 5));
        let layout = OfficeLayout::open_floor(10, 10).with_furniture(FurniturePlacement {
            uid: "cabinet".into(),
            col: 0,
            row: 3,
            width: 1,
            height: 1,
            walkable: false,
            seat: None,
        });
        office.rebuild_from_layout(layout).unwrap();
        let ch = office.character(A).unwrap();
        assert_eq!(ch.destination(), TileCoord::new(0, 5));
        assert!(!ch.path().contains(&TileCoord::new(0, 3)));
        assert_eq!(ch.path().len(), 7);
    }

    #[test]
    fn free_seat_and_occupant_queries() {
        let mut office = desk_office();
        assert_eq!(office.first_free_seat(), Some(SeatId::from("desk-1")));
        office.add_character(B, 0, Some(SeatId::from("desk-1")), Control::Remote);
        assert_eq!(office.seat_occupant(&SeatId::from("desk-1")), Some(B));
        assert_eq!(office.first_free_seat(), None);
    }

    #[test]
    fn wander_moves_only_local_unseated_characters() {
        let config = OfficeConfig {
            wander: WanderConfig {
                enabled: true,
                min_pause_ms: 100,
                max_pause_ms: 200,
                radius: 3,
            },
            ..OfficeConfig::default()
        };
        let layout = OfficeLayout::open_floor(10, 10).with_spawn(TileCoord::new(5, 5));
        let mut office = OfficeState::new(layout, config, 42).unwrap();
        office.add_character(A, 0, None, Control::Local);
        office.add_character(B, 0, None, Control::Remote);

        let mut local_moved = false;
        for _ in 0..50 {
            office.tick(100);
            if office.character(A).unwrap().state() == CharacterState::Walking {
                local_moved = true;
            }
            assert_eq!(office.character(B).unwrap().tile(), TileCoord::new(5, 5));
        }
        assert!(local_moved);
    }
}

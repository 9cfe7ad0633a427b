// Room synchronizer.
//
// `RoomSync` sits between one `OfficeState` and one `Transport`. Inbound
// `ServerMessage`s become engine mutations; local intents become engine
// mutations first and outbound `ClientMessage`s second, so the local view
// never waits on a round trip.
//
// The synchronizer holds no character state. It keeps the room code, the
// local player id, the last membership snapshot and the outbound timers, and
// borrows the engine and transport per call.
//
// Rules applied to inbound traffic:
// - Snapshots (`roomJoined`, `roomSnapshot`) reconcile by set difference
//   against the engine's characters. The local character is never removed
//   this way. Retained remote characters re-apply status, seat and position
//   from the snapshot, last write wins.
// - Events about the local player (status, position, join/leave) are
//   ignored; local state is already applied directly.
// - Remote position: farther than the engine's teleport threshold jumps,
//   closer walks, the same destination does nothing.
// - Malformed frames are dropped with a warning.
//
// Player ids map one-to-one onto character ids.

use std::collections::BTreeSet;

use pixel_office_protocol::{
    ClientMessage, PlayerId, PlayerInfo, PlayerStatus, RoomCode, ServerMessage, Transport,
    TransportError,
};
use pixel_office_sim::{CharacterId, Control, OfficeState, SeatId, Status, TileCoord};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::membership::{MemberRecord, Membership, diff};

/// What the synchronizer observed while applying inbound messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    Joined { room: RoomCode, local: PlayerId },
    MemberAdded { id: PlayerId },
    MemberRemoved { id: PlayerId },
    /// Host rejected a request, e.g. "room not found". Not retried.
    Error { message: String },
}

pub fn character_id(id: PlayerId) -> CharacterId {
    CharacterId(id.0)
}

pub fn player_id(id: CharacterId) -> PlayerId {
    PlayerId(id.0)
}

pub fn sim_status(status: PlayerStatus) -> Status {
    match status {
        PlayerStatus::Coding => Status::Coding,
        PlayerStatus::Reading => Status::Reading,
        PlayerStatus::Idle => Status::Idle,
        PlayerStatus::Afk => Status::Afk,
    }
}

pub fn wire_status(status: Status) -> PlayerStatus {
    match status {
        Status::Coding => PlayerStatus::Coding,
        Status::Reading => PlayerStatus::Reading,
        Status::Idle => PlayerStatus::Idle,
        Status::Afk => PlayerStatus::Afk,
    }
}

pub struct RoomSync {
    config: SyncConfig,
    room: Option<RoomCode>,
    local_id: Option<PlayerId>,
    /// Variant requested in the last create/join, used if the host's record
    /// for us is missing.
    requested_character_index: u32,
    membership: Membership,
    last_sent_tile: Option<TileCoord>,
    last_position_ms: Option<u64>,
    last_ping_ms: Option<u64>,
}

impl RoomSync {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            room: None,
            local_id: None,
            requested_character_index: 0,
            membership: Membership::default(),
            last_sent_tile: None,
            last_position_ms: None,
            last_ping_ms: None,
        }
    }

    pub fn room(&self) -> Option<&RoomCode> {
        self.room.as_ref()
    }

    pub fn local_id(&self) -> Option<PlayerId> {
        self.local_id
    }

    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    pub fn is_in_room(&self) -> bool {
        self.local_id.is_some()
    }

    // -----------------------------------------------------------------------
    // Outbound intents
    // -----------------------------------------------------------------------

    pub fn create_room(
        &mut self,
        transport: &mut impl Transport,
        player_name: &str,
        character_index: u32,
    ) -> Result<(), TransportError> {
        self.requested_character_index = character_index;
        send(
            transport,
            &ClientMessage::CreateRoom {
                player_name: player_name.to_owned(),
                character_index,
            },
        )
    }

    pub fn join_room(
        &mut self,
        transport: &mut impl Transport,
        room: RoomCode,
        player_name: &str,
        character_index: u32,
    ) -> Result<(), TransportError> {
        self.requested_character_index = character_index;
        send(
            transport,
            &ClientMessage::JoinRoom {
                room_id: room,
                player_name: player_name.to_owned(),
                character_index,
            },
        )
    }

    /// Announce departure and tear down local room state. The teardown
    /// happens even if the send fails.
    pub fn leave_room(
        &mut self,
        office: &mut OfficeState,
        transport: &mut impl Transport,
    ) -> Result<(), TransportError> {
        let sent = if self.is_in_room() {
            send(transport, &ClientMessage::LeaveRoom)
        } else {
            Ok(())
        };
        if let Some(room) = &self.room {
            info!(%room, "left room");
        }
        self.teardown(office);
        sent
    }

    /// Apply a status change locally, then broadcast it. Returns whether the
    /// local character changed.
    pub fn set_local_status(
        &mut self,
        office: &mut OfficeState,
        transport: &mut impl Transport,
        status: Status,
    ) -> Result<bool, TransportError> {
        let Some(local) = self.local_id else {
            return Ok(false);
        };
        if !office.set_status(character_id(local), status) {
            return Ok(false);
        }
        if let Some(rec) = self.membership.get_mut(local) {
            rec.status = wire_status(status);
        }
        send(
            transport,
            &ClientMessage::SetStatus {
                status: wire_status(status),
            },
        )?;
        Ok(true)
    }

    /// Bind (or with `None`, clear) the local seat, then broadcast it.
    pub fn set_local_seat(
        &mut self,
        office: &mut OfficeState,
        transport: &mut impl Transport,
        seat: Option<SeatId>,
    ) -> Result<bool, TransportError> {
        let Some(local) = self.local_id else {
            return Ok(false);
        };
        let seat_id = seat.as_ref().map(|s| s.as_str().to_owned());
        if !office.set_seat(character_id(local), seat) {
            return Ok(false);
        }
        if let Some(rec) = self.membership.get_mut(local) {
            rec.seat = seat_id.clone();
        }
        send(transport, &ClientMessage::ReassignSeat { seat_id })?;
        Ok(true)
    }

    /// Walk the local character toward `target`. The resulting tile changes
    /// go out through `update`.
    pub fn move_local(&mut self, office: &mut OfficeState, target: TileCoord) -> bool {
        match self.local_id {
            Some(local) => office.move_to(character_id(local), target),
            None => false,
        }
    }

    /// Periodic outbound work: throttled position updates and keepalive.
    pub fn update(
        &mut self,
        office: &OfficeState,
        transport: &mut impl Transport,
        now_ms: u64,
    ) -> Result<(), TransportError> {
        let Some(local) = self.local_id else {
            return Ok(());
        };

        if let Some(ch) = office.character(character_id(local)) {
            let tile = ch.tile();
            let due = self
                .last_position_ms
                .is_none_or(|last| now_ms.saturating_sub(last) >= self.config.position_interval_ms);
            if self.last_sent_tile != Some(tile) && due {
                send(
                    transport,
                    &ClientMessage::Position {
                        col: tile.col,
                        row: tile.row,
                    },
                )?;
                self.last_sent_tile = Some(tile);
                self.last_position_ms = Some(now_ms);
            }
        }

        match self.last_ping_ms {
            None => self.last_ping_ms = Some(now_ms),
            Some(last) if now_ms.saturating_sub(last) >= self.config.keepalive_interval_ms => {
                send(transport, &ClientMessage::Ping)?;
                self.last_ping_ms = Some(now_ms);
            }
            Some(_) => {}
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Poll the transport and apply everything it has.
    pub fn drain(&mut self, office: &mut OfficeState, transport: &mut impl Transport) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        for msg in transport.poll() {
            events.extend(self.handle_message(office, msg));
        }
        events
    }

    /// Decode and apply one raw JSON payload. Undecodable payloads are dropped.
    pub fn handle_frame(&mut self, office: &mut OfficeState, payload: &[u8]) -> Vec<SyncEvent> {
        match serde_json::from_slice::<ServerMessage>(payload) {
            Ok(msg) => self.handle_message(office, msg),
            Err(e) => {
                warn!(error = %e, len = payload.len(), "dropping malformed server message");
                Vec::new()
            }
        }
    }

    pub fn handle_message(&mut self, office: &mut OfficeState, msg: ServerMessage) -> Vec<SyncEvent> {
        match msg {
            ServerMessage::RoomJoined {
                room_id,
                player_id,
                players,
            } => self.on_room_joined(office, room_id, player_id, &players),
            ServerMessage::RoomSnapshot { players } => {
                if !self.is_in_room() {
                    debug!("snapshot before join ignored");
                    return Vec::new();
                }
                self.membership = Membership::from_snapshot(&players);
                self.reconcile(office)
            }
            ServerMessage::PlayerJoined { player } => self.on_player_joined(office, &player),
            ServerMessage::PlayerLeft { player_id } => {
                if Some(player_id) == self.local_id {
                    return Vec::new();
                }
                self.membership.remove(player_id);
                if office.remove_character(character_id(player_id)) {
                    vec![SyncEvent::MemberRemoved { id: player_id }]
                } else {
                    Vec::new()
                }
            }
            ServerMessage::PlayerStatusChanged { player_id, status } => {
                if Some(player_id) == self.local_id {
                    debug!(id = %player_id, "own status echo ignored");
                    return Vec::new();
                }
                if let Some(rec) = self.membership.get_mut(player_id) {
                    rec.status = status;
                }
                office.set_status(character_id(player_id), sim_status(status));
                Vec::new()
            }
            ServerMessage::PlayerSeatChanged { player_id, seat_id } => {
                if let Some(rec) = self.membership.get_mut(player_id) {
                    rec.seat = seat_id.clone();
                }
                office.set_seat(character_id(player_id), seat_id.map(SeatId::from));
                Vec::new()
            }
            ServerMessage::Position { player_id, col, row } => {
                if Some(player_id) == self.local_id {
                    return Vec::new();
                }
                let tile = TileCoord::new(col, row);
                if let Some(rec) = self.membership.get_mut(player_id) {
                    rec.tile = Some(tile);
                }
                apply_position(office, character_id(player_id), tile);
                Vec::new()
            }
            ServerMessage::Pong => Vec::new(),
            ServerMessage::Error { message } => {
                warn!(%message, "server error");
                vec![SyncEvent::Error { message }]
            }
        }
    }

    fn on_room_joined(
        &mut self,
        office: &mut OfficeState,
        room: RoomCode,
        local: PlayerId,
        players: &[PlayerInfo],
    ) -> Vec<SyncEvent> {
        if self.is_in_room() {
            debug!(old = ?self.room, new = %room, "switching rooms");
            self.teardown(office);
        }
        info!(%room, id = %local, members = players.len(), "joined room");
        self.room = Some(room.clone());
        self.local_id = Some(local);
        self.membership = Membership::from_snapshot(players);

        let record = self.membership.get(local).cloned();
        let character_index = record
            .as_ref()
            .map_or(self.requested_character_index, |r| r.character_index);
        let seat = record.as_ref().and_then(|r| r.seat.clone()).map(SeatId::from);
        let cid = character_id(local);
        match record.as_ref().and_then(|r| r.tile) {
            Some(tile) => office.add_character_at(cid, character_index, seat, Control::Local, tile),
            None => office.add_character(cid, character_index, seat, Control::Local),
        };
        if let Some(status) = record.map(|r| r.status) {
            office.set_status(cid, sim_status(status));
        }

        let mut events = vec![SyncEvent::Joined { room, local }];
        events.extend(self.reconcile(office));
        events
    }

    fn on_player_joined(&mut self, office: &mut OfficeState, player: &PlayerInfo) -> Vec<SyncEvent> {
        if Some(player.id) == self.local_id {
            return Vec::new();
        }
        let record = MemberRecord::from(player);
        self.membership.upsert(record.clone());
        if !self.is_in_room() {
            return Vec::new();
        }
        if office.contains(character_id(player.id)) {
            apply_record(office, &record);
            Vec::new()
        } else {
            add_remote(office, &record);
            vec![SyncEvent::MemberAdded { id: player.id }]
        }
    }

    /// Make the engine's remote characters match the membership exactly.
    fn reconcile(&mut self, office: &mut OfficeState) -> Vec<SyncEvent> {
        let Some(local) = self.local_id else {
            return Vec::new();
        };
        let tracked: BTreeSet<PlayerId> = office.character_ids().into_iter().map(player_id).collect();
        let delta = diff(&tracked, &self.membership.ids(), local);

        let mut events = Vec::new();
        for id in delta.removed {
            if office.remove_character(character_id(id)) {
                debug!(%id, "departed member removed by snapshot");
                events.push(SyncEvent::MemberRemoved { id });
            }
        }
        for id in delta.added {
            if let Some(record) = self.membership.get(id) {
                add_remote(office, record);
                events.push(SyncEvent::MemberAdded { id });
            }
        }
        for id in delta.retained {
            if let Some(record) = self.membership.get(id) {
                apply_record(office, record);
            }
        }
        events
    }

    fn teardown(&mut self, office: &mut OfficeState) {
        office.clear_characters();
        self.room = None;
        self.local_id = None;
        self.membership.clear();
        self.last_sent_tile = None;
        self.last_position_ms = None;
        self.last_ping_ms = None;
    }
}

fn send(transport: &mut impl Transport, msg: &ClientMessage) -> Result<(), TransportError> {
    transport.send(msg).inspect_err(|e| {
        warn!(kind = msg.kind(), error = %e, "send failed");
    })
}

fn add_remote(office: &mut OfficeState, record: &MemberRecord) {
    let cid = character_id(record.id);
    let seat = record.seat.clone().map(SeatId::from);
    match record.tile {
        Some(tile) => office.add_character_at(cid, record.character_index, seat, Control::Remote, tile),
        None => office.add_character(cid, record.character_index, seat, Control::Remote),
    };
    office.set_status(cid, sim_status(record.status));
}

fn apply_record(office: &mut OfficeState, record: &MemberRecord) {
    let cid = character_id(record.id);
    office.set_status(cid, sim_status(record.status));
    office.set_seat(cid, record.seat.clone().map(SeatId::from));
    if let Some(tile) = record.tile {
        apply_position(office, cid, tile);
    }
}

/// Walk or jump a remote character toward a reported tile.
fn apply_position(office: &mut OfficeState, id: CharacterId, target: TileCoord) {
    if !office.tile_map().in_bounds(target) {
        debug!(%id, %target, "position outside the office dropped");
        return;
    }
    let Some(ch) = office.character(id) else {
        debug!(%id, "position for unknown character");
        return;
    };
    if ch.destination() == target {
        return;
    }
    let distance = ch.tile().manhattan_distance(target);
    if distance > office.config().teleport_threshold_tiles {
        office.teleport_to(id, target);
    } else {
        office.move_to(id, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixel_office_protocol::MemoryTransport;
    use pixel_office_sim::{CharacterState, FurniturePlacement, OfficeConfig, OfficeLayout, TileOffset};

    const ME: PlayerId = PlayerId(1);

    fn office() -> OfficeState {
        let layout = OfficeLayout::open_floor(20, 20)
            .with_furniture(FurniturePlacement::desk(
                "desk-1",
                TileCoord::new(3, 3),
                TileOffset::new(0, 1),
            ))
            .with_spawn(TileCoord::new(0, 0));
        OfficeState::new(layout, OfficeConfig::default(), 1).unwrap()
    }

    fn player(id: u32) -> PlayerInfo {
        PlayerInfo::new(PlayerId(id), format!("p{id}"), 0)
    }

    fn player_at(id: u32, col: i32, row: i32) -> PlayerInfo {
        let mut p = player(id);
        p.col = Some(col);
        p.row = Some(row);
        p
    }

    fn joined(office: &mut OfficeState, players: Vec<PlayerInfo>) -> RoomSync {
        let mut sync = RoomSync::new(SyncConfig::default());
        sync.handle_message(
            office,
            ServerMessage::RoomJoined {
                room_id: RoomCode::parse("ABCDEF").unwrap(),
                player_id: ME,
                players,
            },
        );
        sync
    }

    fn remote_ids(office: &OfficeState) -> Vec<CharacterId> {
        office
            .character_ids()
            .into_iter()
            .filter(|&id| id != character_id(ME))
            .collect()
    }

    #[test]
    fn room_joined_adds_local_and_remotes() {
        let mut office = office();
        let sync = joined(&mut office, vec![player(1), player_at(2, 5, 5)]);
        assert_eq!(sync.local_id(), Some(ME));
        let me = office.character(character_id(ME)).unwrap();
        assert_eq!(me.control, Control::Local);
        let other = office.character(CharacterId(2)).unwrap();
        assert_eq!(other.control, Control::Remote);
        assert_eq!(other.tile(), TileCoord::new(5, 5));
    }

    #[test]
    fn reconciliation_matches_snapshot_regardless_of_prior_set() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1), player(2), player(3)]);
        // A stray character the host never mentioned.
        office.add_character(CharacterId(99), 0, None, Control::Remote);

        sync.handle_message(
            &mut office,
            ServerMessage::RoomSnapshot {
                players: vec![player(3), player(4)],
            },
        );
        assert_eq!(remote_ids(&office), vec![CharacterId(3), CharacterId(4)]);
        // Local survives even though the snapshot omitted it.
        assert!(office.contains(character_id(ME)));
    }

    #[test]
    fn snapshot_removes_departed_member_without_leave_event() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1)]);
        sync.handle_message(
            &mut office,
            ServerMessage::RoomSnapshot {
                players: vec![player_at(1, 0, 0), player_at(2, 6, 6)],
            },
        );
        let before = office.character(CharacterId(1)).unwrap().tile();
        let events = sync.handle_message(
            &mut office,
            ServerMessage::RoomSnapshot {
                players: vec![player_at(1, 0, 0)],
            },
        );
        assert_eq!(events, vec![SyncEvent::MemberRemoved { id: PlayerId(2) }]);
        assert!(!office.contains(CharacterId(2)));
        assert_eq!(office.character(CharacterId(1)).unwrap().tile(), before);
    }

    #[test]
    fn own_status_echo_is_ignored() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1)]);
        sync.handle_message(
            &mut office,
            ServerMessage::PlayerStatusChanged {
                player_id: ME,
                status: PlayerStatus::Afk,
            },
        );
        assert_eq!(office.character(character_id(ME)).unwrap().status(), Status::Idle);
    }

    #[test]
    fn status_and_seat_events_are_idempotent() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1), player(2)]);
        let status = ServerMessage::PlayerStatusChanged {
            player_id: PlayerId(2),
            status: PlayerStatus::Coding,
        };
        let seat = ServerMessage::PlayerSeatChanged {
            player_id: PlayerId(2),
            seat_id: Some("desk-1".into()),
        };
        sync.handle_message(&mut office, status.clone());
        sync.handle_message(&mut office, seat.clone());
        let once = office.character(CharacterId(2)).unwrap().clone();
        sync.handle_message(&mut office, status);
        sync.handle_message(&mut office, seat);
        let twice = office.character(CharacterId(2)).unwrap();
        assert_eq!(once.status(), twice.status());
        assert_eq!(once.seat(), twice.seat());
        assert_eq!(once.state(), twice.state());
        assert_eq!(once.path(), twice.path());
    }

    #[test]
    fn far_position_teleports_near_position_walks() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1), player_at(2, 0, 0)]);

        sync.handle_message(
            &mut office,
            ServerMessage::Position {
                player_id: PlayerId(2),
                col: 8,
                row: 3,
            },
        );
        let ch = office.character(CharacterId(2)).unwrap();
        assert_eq!(ch.tile(), TileCoord::new(8, 3));
        assert!(ch.path().is_empty());

        sync.handle_message(
            &mut office,
            ServerMessage::Position {
                player_id: PlayerId(2),
                col: 12,
                row: 3,
            },
        );
        let ch = office.character(CharacterId(2)).unwrap();
        assert_eq!(ch.tile(), TileCoord::new(8, 3));
        assert_eq!(ch.path().back(), Some(&TileCoord::new(12, 3)));
        assert_eq!(ch.state(), CharacterState::Walking);
    }

    #[test]
    fn position_at_threshold_distance_walks() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1), player_at(2, 0, 0)]);
        let target = TileCoord::new(10, 0);
        assert_eq!(
            TileCoord::new(0, 0).manhattan_distance(target),
            office.config().teleport_threshold_tiles
        );

        sync.handle_message(
            &mut office,
            ServerMessage::Position {
                player_id: PlayerId(2),
                col: 10,
                row: 0,
            },
        );
        let ch = office.character(CharacterId(2)).unwrap();
        assert_eq!(ch.tile(), TileCoord::new(0, 0));
        assert_eq!(ch.path().len(), 10);
        assert_eq!(ch.path().back(), Some(&target));
        assert_eq!(ch.state(), CharacterState::Walking);
    }

    #[test]
    fn position_outside_the_office_is_dropped() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1), player_at(2, 5, 5)]);
        for frame in [
            &br#"{"type":"position","playerId":2,"col":-2147483648,"row":0}"#[..],
            &br#"{"type":"position","playerId":2,"col":2147483647,"row":2147483647}"#[..],
            &br#"{"type":"position","playerId":2,"col":20,"row":3}"#[..],
        ] {
            sync.handle_frame(&mut office, frame);
        }
        let ch = office.character(CharacterId(2)).unwrap();
        assert_eq!(ch.tile(), TileCoord::new(5, 5));
        assert!(ch.path().is_empty());
    }

    #[test]
    fn empty_snapshot_keeps_only_the_local_character() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1), player(2), player(3)]);
        let events = sync.handle_message(&mut office, ServerMessage::RoomSnapshot { players: vec![] });
        assert_eq!(office.character_ids(), vec![character_id(ME)]);
        assert_eq!(
            events,
            vec![
                SyncEvent::MemberRemoved { id: PlayerId(2) },
                SyncEvent::MemberRemoved { id: PlayerId(3) },
            ]
        );
        assert!(sync.is_in_room());
    }

    #[test]
    fn own_position_echo_is_ignored() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1)]);
        sync.handle_message(
            &mut office,
            ServerMessage::Position {
                player_id: ME,
                col: 9,
                row: 9,
            },
        );
        assert_eq!(office.character(character_id(ME)).unwrap().tile(), TileCoord::new(0, 0));
    }

    #[test]
    fn malformed_frame_is_dropped() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1)]);
        assert!(sync.handle_frame(&mut office, b"{\"type\":\"bogus\"}").is_empty());
        assert!(sync.handle_frame(&mut office, b"not json").is_empty());
        assert!(office.contains(character_id(ME)));
        let events = sync.handle_frame(&mut office, br#"{"type":"playerJoined","player":{"id":5,"name":"x","characterIndex":1}}"#);
        assert_eq!(events, vec![SyncEvent::MemberAdded { id: PlayerId(5) }]);
    }

    #[test]
    fn room_not_found_surfaces_as_error() {
        let mut office = office();
        let mut sync = RoomSync::new(SyncConfig::default());
        let events = sync.handle_message(
            &mut office,
            ServerMessage::Error {
                message: "room not found".into(),
            },
        );
        assert_eq!(
            events,
            vec![SyncEvent::Error {
                message: "room not found".into()
            }]
        );
        assert!(!sync.is_in_room());
    }

    #[test]
    fn local_status_applies_then_sends() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1)]);
        let mut transport = MemoryTransport::new();
        assert!(sync.set_local_status(&mut office, &mut transport, Status::Coding).unwrap());
        assert_eq!(office.character(character_id(ME)).unwrap().status(), Status::Coding);
        assert_eq!(
            transport.take_sent(),
            vec![ClientMessage::SetStatus {
                status: PlayerStatus::Coding
            }]
        );
        // Unchanged status sends nothing.
        assert!(!sync.set_local_status(&mut office, &mut transport, Status::Coding).unwrap());
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn local_seat_applies_then_sends() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1)]);
        let mut transport = MemoryTransport::new();
        assert!(
            sync.set_local_seat(&mut office, &mut transport, Some(SeatId::from("desk-1")))
                .unwrap()
        );
        assert_eq!(
            transport.take_sent(),
            vec![ClientMessage::ReassignSeat {
                seat_id: Some("desk-1".into())
            }]
        );
        assert!(
            !sync
                .set_local_seat(&mut office, &mut transport, Some(SeatId::from("nowhere")))
                .unwrap()
        );
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn position_updates_are_throttled_and_change_driven() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1)]);
        let mut transport = MemoryTransport::new();

        sync.update(&office, &mut transport, 0).unwrap();
        assert_eq!(transport.take_sent(), vec![ClientMessage::Position { col: 0, row: 0 }]);

        // Unchanged tile: nothing, however long we wait.
        sync.update(&office, &mut transport, 1_000).unwrap();
        assert!(transport.sent().is_empty());

        assert!(sync.move_local(&mut office, TileCoord::new(5, 0)));
        let mut now = 1_000;
        let mut positions = Vec::new();
        for _ in 0..40 {
            office.tick(50);
            now += 50;
            sync.update(&office, &mut transport, now).unwrap();
            positions.extend(transport.take_sent());
        }
        // 5 tiles at 3 tiles/s cross four 200 ms windows at most once each.
        assert!(!positions.is_empty());
        assert!(positions.len() <= 5);
        assert_eq!(positions.last(), Some(&ClientMessage::Position { col: 5, row: 0 }));
    }

    #[test]
    fn keepalive_pings_on_interval() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player_at(1, 0, 0)]);
        let mut transport = MemoryTransport::new();
        sync.update(&office, &mut transport, 0).unwrap();
        transport.take_sent();
        sync.update(&office, &mut transport, 24_999).unwrap();
        assert!(transport.sent().is_empty());
        sync.update(&office, &mut transport, 25_000).unwrap();
        assert_eq!(transport.take_sent(), vec![ClientMessage::Ping]);
    }

    #[test]
    fn rejoin_tears_down_previous_room() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1), player(2), player(3)]);
        sync.handle_message(
            &mut office,
            ServerMessage::RoomJoined {
                room_id: RoomCode::parse("ZZZZZZ").unwrap(),
                player_id: PlayerId(7),
                players: vec![player(7), player(8)],
            },
        );
        assert_eq!(office.character_ids(), vec![CharacterId(7), CharacterId(8)]);
        assert_eq!(sync.room().map(|r| r.as_str()), Some("ZZZZZZ"));
    }

    #[test]
    fn leave_room_clears_everything() {
        let mut office = office();
        let mut sync = joined(&mut office, vec![player(1), player(2)]);
        let mut transport = MemoryTransport::new();
        sync.leave_room(&mut office, &mut transport).unwrap();
        assert_eq!(transport.take_sent(), vec![ClientMessage::LeaveRoom]);
        assert!(office.character_ids().is_empty());
        assert!(!sync.is_in_room());
        assert!(sync.membership().is_empty());
    }

    #[test]
    fn drain_applies_everything_polled() {
        let mut office = office();
        let mut sync = RoomSync::new(SyncConfig::default());
        let mut transport = MemoryTransport::new();
        transport.push_inbound(ServerMessage::RoomJoined {
            room_id: RoomCode::parse("HJKMNP").unwrap(),
            player_id: ME,
            players: vec![player(1)],
        });
        transport.push_inbound(ServerMessage::PlayerJoined { player: player(2) });
        let events = sync.drain(&mut office, &mut transport);
        assert_eq!(events.len(), 2);
        assert!(office.contains(CharacterId(2)));
    }
}

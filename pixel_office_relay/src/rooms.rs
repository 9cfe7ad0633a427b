// Room state for the relay.
//
// `RoomRegistry` is the data structure `server.rs` drives: live rooms keyed
// by code, their members, and which room each player is in. It never touches
// a socket. Every mutation returns the messages it wants delivered as a list
// of `Envelope`s, and the server writes them out. All calls come from the
// server's single main thread, so there is no internal locking.
//
// Key responsibilities:
// - Room lifecycle: create with a code unique among live rooms, drop a room
//   as soon as its last member leaves.
// - Membership: assign player ids (unique for the relay's lifetime, never
//   reused), enforce `max_players`, record each member's last reported
//   status, seat and tile so snapshots describe the room as it is.
// - Fan-out: status/seat/position updates go to the other members of the
//   sender's room. The sender already applied its own change locally.
// - Liveness: any message refreshes a member's `last_seen_ms`;
//   `evict_idle` removes members silent for longer than the timeout.
//
// The relay never runs the office sim and never moves anyone.

use std::collections::BTreeMap;

use pixel_office_prng::OfficeRng;
use pixel_office_protocol::{ClientMessage, PlayerId, PlayerInfo, RoomCode, ServerMessage};
use thiserror::Error;
use tracing::{debug, info};

/// One outgoing message for one player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub to: PlayerId,
    pub msg: ServerMessage,
}

/// Why a create or join was refused. The display text is what the client
/// sees in the `error` message.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("room not found")]
    RoomNotFound,
    #[error("room is full")]
    RoomFull,
    #[error("too many rooms")]
    TooManyRooms,
}

struct Member {
    info: PlayerInfo,
    last_seen_ms: u64,
}

struct Room {
    members: BTreeMap<PlayerId, Member>,
}

impl Room {
    fn players(&self) -> Vec<PlayerInfo> {
        self.members.values().map(|m| m.info.clone()).collect()
    }

    fn to_others(&self, from: PlayerId, msg: &ServerMessage) -> Vec<Envelope> {
        self.members
            .keys()
            .filter(|&&id| id != from)
            .map(|&to| Envelope { to, msg: msg.clone() })
            .collect()
    }
}

pub struct RoomRegistry {
    rooms: BTreeMap<RoomCode, Room>,
    player_rooms: BTreeMap<PlayerId, RoomCode>,
    next_player_id: u32,
    max_players: usize,
    max_rooms: usize,
    rng: OfficeRng,
}

impl RoomRegistry {
    pub fn new(max_players: usize, max_rooms: usize, seed: u64) -> Self {
        Self {
            rooms: BTreeMap::new(),
            player_rooms: BTreeMap::new(),
            next_player_id: 1,
            max_players,
            max_rooms,
            rng: OfficeRng::new(seed),
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn player_count(&self) -> usize {
        self.player_rooms.len()
    }

    pub fn room_of(&self, player: PlayerId) -> Option<&RoomCode> {
        self.player_rooms.get(&player)
    }

    /// Current members of `code`, in id order.
    pub fn members(&self, code: &RoomCode) -> Vec<PlayerInfo> {
        self.rooms.get(code).map(Room::players).unwrap_or_default()
    }

    /// Open a new room with the caller as its only member.
    pub fn create_room(
        &mut self,
        player_name: String,
        character_index: u32,
        now_ms: u64,
    ) -> Result<(PlayerId, Vec<Envelope>), JoinError> {
        if self.rooms.len() >= self.max_rooms {
            return Err(JoinError::TooManyRooms);
        }
        let rooms = &self.rooms;
        let code = RoomCode::generate_unique(&mut self.rng, |c| rooms.contains_key(c));
        info!(room = %code, "room created");
        self.rooms.insert(
            code.clone(),
            Room {
                members: BTreeMap::new(),
            },
        );
        self.admit(code, player_name, character_index, now_ms)
    }

    pub fn join_room(
        &mut self,
        code: &RoomCode,
        player_name: String,
        character_index: u32,
        now_ms: u64,
    ) -> Result<(PlayerId, Vec<Envelope>), JoinError> {
        let room = self.rooms.get(code).ok_or(JoinError::RoomNotFound)?;
        if room.members.len() >= self.max_players {
            return Err(JoinError::RoomFull);
        }
        self.admit(code.clone(), player_name, character_index, now_ms)
    }

    fn admit(
        &mut self,
        code: RoomCode,
        player_name: String,
        character_index: u32,
        now_ms: u64,
    ) -> Result<(PlayerId, Vec<Envelope>), JoinError> {
        let Some(room) = self.rooms.get_mut(&code) else {
            return Err(JoinError::RoomNotFound);
        };
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        let info = PlayerInfo::new(id, player_name, character_index);

        let mut out = room.to_others(id, &ServerMessage::PlayerJoined { player: info.clone() });
        room.members.insert(
            id,
            Member {
                info,
                last_seen_ms: now_ms,
            },
        );
        out.push(Envelope {
            to: id,
            msg: ServerMessage::RoomJoined {
                room_id: code.clone(),
                player_id: id,
                players: room.players(),
            },
        });
        info!(room = %code, player = %id, members = room.members.len(), "player joined");
        self.player_rooms.insert(id, code);
        Ok((id, out))
    }

    /// Remove `player` from its room, telling the others. Empty rooms are
    /// dropped. Unknown players are a no-op.
    pub fn remove_player(&mut self, player: PlayerId) -> Vec<Envelope> {
        let Some(code) = self.player_rooms.remove(&player) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return Vec::new();
        };
        room.members.remove(&player);
        info!(room = %code, %player, members = room.members.len(), "player left");
        if room.members.is_empty() {
            self.rooms.remove(&code);
            info!(room = %code, "room closed");
            return Vec::new();
        }
        room.to_others(player, &ServerMessage::PlayerLeft { player_id: player })
    }

    /// Apply one message from an already-admitted player.
    pub fn handle(&mut self, player: PlayerId, msg: ClientMessage, now_ms: u64) -> Vec<Envelope> {
        if matches!(msg, ClientMessage::LeaveRoom) {
            return self.remove_player(player);
        }
        let Some(code) = self.player_rooms.get(&player) else {
            debug!(%player, kind = msg.kind(), "message from player in no room");
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(code) else {
            return Vec::new();
        };
        let Some(member) = room.members.get_mut(&player) else {
            return Vec::new();
        };
        member.last_seen_ms = now_ms;

        let broadcast = match msg {
            ClientMessage::SetStatus { status } => {
                member.info.status = status;
                ServerMessage::PlayerStatusChanged {
                    player_id: player,
                    status,
                }
            }
            ClientMessage::ReassignSeat { seat_id } => {
                member.info.seat_id = seat_id.clone();
                ServerMessage::PlayerSeatChanged {
                    player_id: player,
                    seat_id,
                }
            }
            ClientMessage::Position { col, row } => {
                member.info.col = Some(col);
                member.info.row = Some(row);
                ServerMessage::Position {
                    player_id: player,
                    col,
                    row,
                }
            }
            ClientMessage::Ping => {
                return vec![Envelope {
                    to: player,
                    msg: ServerMessage::Pong,
                }];
            }
            ClientMessage::CreateRoom { .. } | ClientMessage::JoinRoom { .. } => {
                return vec![Envelope {
                    to: player,
                    msg: ServerMessage::Error {
                        message: "already in a room".into(),
                    },
                }];
            }
            ClientMessage::LeaveRoom => return Vec::new(),
        };
        room.to_others(player, &broadcast)
    }

    /// A full `roomSnapshot` to every member of every room.
    pub fn snapshots(&self) -> Vec<Envelope> {
        let mut out = Vec::new();
        for room in self.rooms.values() {
            let players = room.players();
            for &to in room.members.keys() {
                out.push(Envelope {
                    to,
                    msg: ServerMessage::RoomSnapshot {
                        players: players.clone(),
                    },
                });
            }
        }
        out
    }

    /// Remove every member not heard from in `timeout_ms`. Returns who was
    /// evicted and the departure notices for the remaining members.
    pub fn evict_idle(&mut self, now_ms: u64, timeout_ms: u64) -> (Vec<PlayerId>, Vec<Envelope>) {
        let stale: Vec<PlayerId> = self
            .rooms
            .values()
            .flat_map(|room| room.members.iter())
            .filter(|(_, m)| now_ms.saturating_sub(m.last_seen_ms) > timeout_ms)
            .map(|(&id, _)| id)
            .collect();
        let mut out = Vec::new();
        for &id in &stale {
            info!(player = %id, "evicting idle player");
            out.extend(self.remove_player(id));
        }
        (stale, out)
    }
}

// Protocol messages between office clients and the room host.
//
// Two closed enums define the full vocabulary:
// - `ClientMessage`: intents a client sends (create/join/leave, status,
//   seat, position, keepalive).
// - `ServerMessage`: events the host fans out (membership snapshots,
//   join/leave notices, status/seat/position changes, errors).
//
// On the wire each message is a JSON object with a `type` discriminant and
// camelCase fields, e.g. `{"type":"position","playerId":3,"col":4,"row":2}`.
// An unknown `type` or a missing field fails deserialization; receivers drop
// that one frame and carry on.
//
// `PlayerInfo` is one membership record. Snapshots always carry the complete
// member list; receivers reconcile against it rather than counting joins
// and leaves.

use serde::{Deserialize, Serialize};

use crate::room_code::RoomCode;
use crate::types::{PlayerId, PlayerStatus};

/// Messages sent by a client to the room host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Open a fresh room and join it as its first member.
    CreateRoom {
        player_name: String,
        character_index: u32,
    },
    JoinRoom {
        room_id: RoomCode,
        player_name: String,
        character_index: u32,
    },
    SetStatus { status: PlayerStatus },
    /// `None` stands up from the current seat.
    ReassignSeat { seat_id: Option<String> },
    /// The sender's own tile, rate limited at the sender.
    Position { col: i32, row: i32 },
    /// Keepalive.
    Ping,
    LeaveRoom,
}

/// Messages sent by the room host to a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Join accepted: the receiver's id plus the full current membership.
    RoomJoined {
        room_id: RoomCode,
        player_id: PlayerId,
        players: Vec<PlayerInfo>,
    },
    /// Periodic full membership, the source of truth for departures.
    RoomSnapshot { players: Vec<PlayerInfo> },
    PlayerJoined { player: PlayerInfo },
    PlayerLeft { player_id: PlayerId },
    PlayerStatusChanged {
        player_id: PlayerId,
        status: PlayerStatus,
    },
    PlayerSeatChanged {
        player_id: PlayerId,
        seat_id: Option<String>,
    },
    Position {
        player_id: PlayerId,
        col: i32,
        row: i32,
    },
    Pong,
    Error { message: String },
}

/// One room member as the host last knew it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub character_index: u32,
    #[serde(default)]
    pub status: PlayerStatus,
    #[serde(default)]
    pub seat_id: Option<String>,
    /// Last reported tile. `None` until the player has sent a position.
    #[serde(default)]
    pub col: Option<i32>,
    #[serde(default)]
    pub row: Option<i32>,
}

impl PlayerInfo {
    pub fn new(id: PlayerId, name: impl Into<String>, character_index: u32) -> Self {
        Self {
            id,
            name: name.into(),
            character_index,
            status: PlayerStatus::default(),
            seat_id: None,
            col: None,
            row: None,
        }
    }

    /// The last reported tile, if both coordinates are known.
    pub fn tile(&self) -> Option<(i32, i32)> {
        Some((self.col?, self.row?))
    }
}

impl ClientMessage {
    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::CreateRoom { .. } => "createRoom",
            ClientMessage::JoinRoom { .. } => "joinRoom",
            ClientMessage::SetStatus { .. } => "setStatus",
            ClientMessage::ReassignSeat { .. } => "reassignSeat",
            ClientMessage::Position { .. } => "position",
            ClientMessage::Ping => "ping",
            ClientMessage::LeaveRoom => "leaveRoom",
        }
    }
}

// pixel_office_protocol: wire contract for shared-office rooms.
//
// Message types, room codes, framing and the transport seam used by the room
// synchronizer (`pixel_office_sync`), the relay (`pixel_office_relay`) and
// any other carrier. Independent of the sim: positions are plain `col`/`row`
// and seats are plain strings.
//
// Module overview:
// - `types.rs`:     `PlayerId`, `PlayerStatus`.
// - `room_code.rs`: `RoomCode`, six characters from an unambiguous alphabet.
// - `message.rs`:   `ClientMessage` / `ServerMessage` tagged enums, `PlayerInfo`.
// - `framing.rs`:   4-byte big-endian length prefix + JSON payload over any
//                   `Read`/`Write`.
// - `transport.rs`: `Transport` trait plus an in-memory implementation.
//
// No async runtime: framing works on `std::io` streams, matching the relay's
// thread-per-reader design.

pub mod framing;
pub mod message;
pub mod room_code;
pub mod transport;
pub mod types;

pub use framing::{FrameError, MAX_MESSAGE_SIZE, read_message, recv_frame, send_frame, write_message};
pub use message::{ClientMessage, PlayerInfo, ServerMessage};
pub use room_code::{ROOM_CODE_ALPHABET, ROOM_CODE_LEN, RoomCode, RoomCodeError};
pub use transport::{MemoryTransport, Transport, TransportError};
pub use types::{PlayerId, PlayerStatus};

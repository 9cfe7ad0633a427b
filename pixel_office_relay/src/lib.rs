// pixel_office_relay: thin TCP host for shared-office rooms.
//
// The relay is a message broker. It hands out room codes and player ids,
// keeps each room's roster (name, character, status, seat, last tile) and
// fans every update out to the other members. It never runs an office
// engine; walking, seating and animation happen on each client.
//
// Module overview:
// - `rooms.rs`:  `RoomRegistry`, the pure room bookkeeping. Every operation
//                returns the `Envelope`s to send, so it is testable without
//                sockets.
// - `server.rs`: TCP listener, connection threads (one per client), and the
//                main event loop that drives the registry and owns all
//                write halves. Periodic `roomSnapshot` broadcast and idle
//                eviction run here.
// - `client.rs`: `NetClient`, a `Transport` over a TCP stream.
//
// Dependencies: `pixel_office_protocol` for messages and framing,
// `pixel_office_prng` for room codes. No dependency on the sim crate.

pub mod client;
pub mod rooms;
pub mod server;

pub use client::NetClient;
pub use rooms::{Envelope, JoinError, RoomRegistry};
pub use server::{RelayConfig, RelayHandle, start_relay};

// pixel_office_sync: keeps one office engine aligned with one room.
//
// Module overview:
// - `sync.rs`:       `RoomSync`: inbound message application, outbound intents,
//                    position throttling and keepalive. `SyncEvent`.
// - `membership.rs`: `Membership` snapshot and the set-difference `diff` used
//                    for reconciliation.
// - `config.rs`:     `SyncConfig` timing knobs.
//
// Everything here is synchronous. The caller owns the tick loop and calls
// `drain` + `update` once per frame; the transport's own threads (if any)
// stay behind the `Transport` trait.

pub mod config;
pub mod membership;
pub mod sync;

pub use config::SyncConfig;
pub use membership::{MemberRecord, Membership, MembershipDiff, diff};
pub use sync::{RoomSync, SyncEvent, character_id, player_id, sim_status, wire_status};

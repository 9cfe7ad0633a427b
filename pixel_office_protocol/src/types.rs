// Core ID and status types for the room protocol.
//
// `PlayerId` is assigned by whichever side hosts the room (the relay, in this
// workspace) and is unique within one room. `PlayerStatus` mirrors the sim's
// behavioral status but lives here so the protocol never depends on the sim;
// the sync crate converts between the two.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host-assigned player ID, unique per room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Coding,
    Reading,
    #[default]
    Idle,
    Afk,
}

// Room membership as last reported by the host.
//
// `Membership` is replaced wholesale by every snapshot (`roomJoined`,
// `roomSnapshot`) and patched in place by the incremental events in between.
// Departures are found by diffing a snapshot against the characters the
// engine currently holds, never by counting join and leave notices, so a
// missed `playerLeft` heals at the next snapshot.

use std::collections::{BTreeMap, BTreeSet};

use pixel_office_protocol::{PlayerId, PlayerInfo, PlayerStatus};
use pixel_office_sim::TileCoord;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberRecord {
    pub id: PlayerId,
    pub name: String,
    pub character_index: u32,
    pub status: PlayerStatus,
    pub seat: Option<String>,
    pub tile: Option<TileCoord>,
}

impl From<&PlayerInfo> for MemberRecord {
    fn from(info: &PlayerInfo) -> Self {
        Self {
            id: info.id,
            name: info.name.clone(),
            character_index: info.character_index,
            status: info.status,
            seat: info.seat_id.clone(),
            tile: info.tile().map(|(col, row)| TileCoord::new(col, row)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Membership {
    members: BTreeMap<PlayerId, MemberRecord>,
}

impl Membership {
    pub fn from_snapshot(players: &[PlayerInfo]) -> Self {
        Self {
            members: players.iter().map(|p| (p.id, MemberRecord::from(p))).collect(),
        }
    }

    pub fn upsert(&mut self, record: MemberRecord) {
        self.members.insert(record.id, record);
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<MemberRecord> {
        self.members.remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&MemberRecord> {
        self.members.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut MemberRecord> {
        self.members.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn ids(&self) -> BTreeSet<PlayerId> {
        self.members.keys().copied().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &MemberRecord> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }
}

/// Set difference between what the engine tracks and what a snapshot says.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    /// In the snapshot, not tracked.
    pub added: Vec<PlayerId>,
    /// Tracked, not in the snapshot.
    pub removed: Vec<PlayerId>,
    /// In both.
    pub retained: Vec<PlayerId>,
}

/// Diff `tracked` against `snapshot`, ignoring `local` on both sides.
pub fn diff(tracked: &BTreeSet<PlayerId>, snapshot: &BTreeSet<PlayerId>, local: PlayerId) -> MembershipDiff {
    let wanted: BTreeSet<PlayerId> = snapshot.iter().copied().filter(|&id| id != local).collect();
    let tracked: BTreeSet<PlayerId> = tracked.iter().copied().filter(|&id| id != local).collect();
    MembershipDiff {
        added: wanted.difference(&tracked).copied().collect(),
        removed: tracked.difference(&wanted).copied().collect(),
        retained: wanted.intersection(&tracked).copied().collect(),
    }
}

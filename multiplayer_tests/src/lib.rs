// Test-only office client for multiplayer integration tests.
//
// Wraps the real `NetClient` (from `pixel_office_relay::client`), a real
// `RoomSync` and a real `OfficeState` to give a synchronous, test-friendly
// API over the full pipeline:
// intent → sync → relay → other client's sync → engine → verify state.
//
// The only test-specific code here is the blocking `wait_until` loop around
// `pump`. All networking, synchronization and engine logic runs through the
// same code paths as a real client.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use pixel_office_protocol::RoomCode;
use pixel_office_relay::client::NetClient;
use pixel_office_sim::{
    CharacterId, FurniturePlacement, OfficeConfig, OfficeLayout, OfficeState, SeatId, Status,
    TileCoord, TileOffset,
};
use pixel_office_sync::{RoomSync, SyncConfig, SyncEvent, character_id};

/// Default timeout for blocking waits.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep between pump rounds.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Sim time advanced per pump round.
const TICK_MS: u32 = 50;

/// A 12×10 walled room with two desks. Both clients load the same layout.
pub fn shared_layout() -> OfficeLayout {
    OfficeLayout::walled_room(12, 10)
        .with_furniture(FurniturePlacement::desk(
            "desk-1",
            TileCoord::new(3, 2),
            TileOffset::new(0, 1),
        ))
        .with_furniture(FurniturePlacement::desk(
            "desk-2",
            TileCoord::new(7, 2),
            TileOffset::new(0, 1),
        ))
        .with_spawn(TileCoord::new(5, 7))
}

pub struct TestOfficeClient {
    client: NetClient,
    pub sync: RoomSync,
    pub office: OfficeState,
    pub events: Vec<SyncEvent>,
    now_ms: u64,
}

impl TestOfficeClient {
    pub fn connect(addr: SocketAddr, seed: u64) -> Self {
        let client = NetClient::connect(addr).expect("TestOfficeClient::connect failed");
        let office = OfficeState::new(shared_layout(), OfficeConfig::default(), seed)
            .expect("shared layout is valid");
        Self {
            client,
            sync: RoomSync::new(SyncConfig::default()),
            office,
            events: Vec::new(),
            now_ms: 0,
        }
    }

    /// Create a room and block until the relay admits us.
    pub fn host(addr: SocketAddr, name: &str, character_index: u32) -> Self {
        let mut me = Self::connect(addr, 1);
        me.sync
            .create_room(&mut me.client, name, character_index)
            .expect("create_room failed");
        me.wait_until("roomJoined", |c| c.sync.is_in_room());
        me
    }

    /// Join `room` and block until the relay admits us.
    pub fn join(addr: SocketAddr, room: &RoomCode, name: &str, character_index: u32) -> Self {
        let mut me = Self::connect(addr, 2);
        me.sync
            .join_room(&mut me.client, room.clone(), name, character_index)
            .expect("join_room failed");
        me.wait_until("roomJoined", |c| c.sync.is_in_room());
        me
    }

    pub fn room(&self) -> RoomCode {
        self.sync.room().cloned().expect("not in a room")
    }

    pub fn local_character(&self) -> CharacterId {
        character_id(self.sync.local_id().expect("not in a room"))
    }

    /// One frame: apply inbound messages, tick the engine, send outbound.
    pub fn pump(&mut self) {
        let events = self.sync.drain(&mut self.office, &mut self.client);
        self.events.extend(events);
        self.office.tick(TICK_MS);
        self.now_ms += u64::from(TICK_MS);
        self.sync
            .update(&self.office, &mut self.client, self.now_ms)
            .expect("update failed");
    }

    /// Pump until `pred` holds or the timeout elapses (then panic).
    pub fn wait_until(&mut self, what: &str, pred: impl Fn(&Self) -> bool) {
        let deadline = Instant::now() + POLL_TIMEOUT;
        loop {
            self.pump();
            if pred(self) {
                return;
            }
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn set_status(&mut self, status: Status) -> bool {
        self.sync
            .set_local_status(&mut self.office, &mut self.client, status)
            .expect("set_local_status failed")
    }

    pub fn set_seat(&mut self, seat: Option<&str>) -> bool {
        self.sync
            .set_local_seat(&mut self.office, &mut self.client, seat.map(SeatId::from))
            .expect("set_local_seat failed")
    }

    pub fn walk_to(&mut self, target: TileCoord) -> bool {
        self.sync.move_local(&mut self.office, target)
    }

    pub fn leave(&mut self) {
        let _ = self.sync.leave_room(&mut self.office, &mut self.client);
        self.client.disconnect();
    }
}

/// Pump both clients until `pred` holds or the timeout elapses (then panic).
pub fn wait_pair(
    a: &mut TestOfficeClient,
    b: &mut TestOfficeClient,
    what: &str,
    pred: impl Fn(&TestOfficeClient, &TestOfficeClient) -> bool,
) {
    let deadline = Instant::now() + POLL_TIMEOUT;
    loop {
        a.pump();
        b.pump();
        if pred(a, b) {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(POLL_INTERVAL);
    }
}

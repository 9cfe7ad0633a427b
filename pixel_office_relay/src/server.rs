// TCP server and main event loop for the office relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread**: non-blocking `accept()` loop, spawns one
//   connection thread per stream.
// - **Connection threads** (one per client): read the first frame with a
//   timeout and pass it to the main thread as `InternalEvent::Handshake`
//   together with the write half. Once admitted, `recv_frame` in a loop,
//   forwarding `InternalEvent::MessageFrom`. A frame that fails to decode is
//   dropped with a warning and reading continues; EOF or an I/O error ends
//   the thread with `InternalEvent::Disconnected`.
// - **Main thread**: owns the `RoomRegistry` and every write half. Waits on
//   the channel with a short timeout, and on each wake-up also runs the
//   housekeeping timers (snapshot broadcast, idle eviction).
//
// After the handshake the main thread is the only writer to client streams.
// A silent connection only ever blocks its own thread.
//
// Handshake: the first frame on a connection must be `createRoom` or
// `joinRoom`. Anything else, an unknown room or a full room gets an `error`
// frame and the connection is closed.

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use pixel_office_protocol::framing::{recv_frame, send_frame};
use pixel_office_protocol::{ClientMessage, PlayerId, ServerMessage};
use tracing::{debug, info, warn};

use crate::rooms::{Envelope, JoinError, RoomRegistry};

/// Upper bound on how long the main loop sleeps between housekeeping checks.
const LOOP_WAKE: Duration = Duration::from_millis(50);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

enum InternalEvent {
    /// A connection's first frame, already known to be a room request. The
    /// connection thread waits on `reply` for the assigned id (`None` if
    /// refused) before it starts forwarding frames.
    Handshake {
        writer: BufWriter<TcpStream>,
        request: ClientMessage,
        reply: Sender<Option<PlayerId>>,
    },
    MessageFrom { player_id: PlayerId, message: ClientMessage },
    Disconnected { player_id: PlayerId },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    /// Block until the relay exits on its own.
    pub fn wait(mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub max_players: usize,
    pub max_rooms: usize,
    pub snapshot_interval_ms: u64,
    pub idle_timeout_ms: u64,
    /// Seeds room code generation.
    pub seed: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7878,
            max_players: 16,
            max_rooms: 256,
            snapshot_interval_ms: 5_000,
            idle_timeout_ms: 60_000,
            seed: 0,
        }
    }
}

/// Start the relay on a background thread. Returns a handle and the bound
/// address (port 0 lets the OS pick).
pub fn start_relay(config: RelayConfig) -> std::io::Result<(RelayHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_relay = keep_running.clone();

    info!(%addr, "relay listening");
    let thread = thread::spawn(move || {
        run_relay(listener, config, keep_running_relay);
    });

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

struct Relay {
    config: RelayConfig,
    registry: RoomRegistry,
    writers: BTreeMap<PlayerId, BufWriter<TcpStream>>,
    started: Instant,
    last_snapshot_ms: u64,
}

impl Relay {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn deliver(&mut self, envelopes: Vec<Envelope>) {
        for Envelope { to, msg } in envelopes {
            let Some(writer) = self.writers.get_mut(&to) else {
                continue;
            };
            // A broken pipe is noticed by that client's reader thread.
            if let Err(e) = send_frame(writer, &msg) {
                warn!(player = %to, error = %e, "write failed");
            }
        }
    }

    fn drop_connection(&mut self, player: PlayerId) {
        if let Some(writer) = self.writers.remove(&player) {
            let _ = writer.get_ref().shutdown(Shutdown::Both);
        }
    }

    fn housekeeping(&mut self) {
        let now = self.now_ms();
        if now.saturating_sub(self.last_snapshot_ms) >= self.config.snapshot_interval_ms {
            self.last_snapshot_ms = now;
            let snapshots = self.registry.snapshots();
            self.deliver(snapshots);
        }
        let (evicted, notices) = self.registry.evict_idle(now, self.config.idle_timeout_ms);
        for player in evicted {
            self.drop_connection(player);
        }
        self.deliver(notices);
    }
}

fn run_relay(listener: TcpListener, config: RelayConfig, keep_running: Arc<AtomicBool>) {
    let registry = RoomRegistry::new(config.max_players, config.max_rooms, config.seed);
    let mut relay = Relay {
        config,
        registry,
        writers: BTreeMap::new(),
        started: Instant::now(),
        last_snapshot_ms: 0,
    };

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Non-blocking so the accept thread can notice shutdown.
    listener.set_nonblocking(true).ok();

    let keep_running_listener = keep_running.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "connection accepted");
                    stream.set_nonblocking(false).ok();
                    let tx_conn = tx.clone();
                    let keep_running_conn = keep_running_listener.clone();
                    thread::spawn(move || {
                        connection_thread(stream, tx_conn, keep_running_conn);
                    });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(20));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed, listener stopping");
                    break;
                }
            }
        }
    });

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(LOOP_WAKE) {
            Ok(event) => {
                handle_event(&mut relay, event);
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut relay, event);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        relay.housekeeping();
    }

    let players: Vec<PlayerId> = relay.writers.keys().copied().collect();
    for player in players {
        relay.drop_connection(player);
    }
    info!("relay stopped");
}

fn handle_event(relay: &mut Relay, event: InternalEvent) {
    match event {
        InternalEvent::Handshake {
            writer,
            request,
            reply,
        } => {
            let admitted = admit(relay, writer, request);
            let _ = reply.send(admitted);
        }
        InternalEvent::MessageFrom { player_id, message } => {
            let leaving = matches!(message, ClientMessage::LeaveRoom);
            let now = relay.now_ms();
            let out = relay.registry.handle(player_id, message, now);
            relay.deliver(out);
            if leaving {
                relay.drop_connection(player_id);
            }
        }
        InternalEvent::Disconnected { player_id } => {
            let out = relay.registry.remove_player(player_id);
            relay.drop_connection(player_id);
            relay.deliver(out);
        }
    }
}

/// Apply a room request. On success the writer joins the relay's set;
/// otherwise the client gets an `error` frame and is closed.
fn admit(relay: &mut Relay, writer: BufWriter<TcpStream>, request: ClientMessage) -> Option<PlayerId> {
    let now = relay.now_ms();
    let admitted = match request {
        ClientMessage::CreateRoom {
            player_name,
            character_index,
        } => relay.registry.create_room(player_name, character_index, now),
        ClientMessage::JoinRoom {
            room_id,
            player_name,
            character_index,
        } => relay
            .registry
            .join_room(&room_id, player_name, character_index, now),
        other => {
            debug!(kind = other.kind(), "first frame was not a room request");
            reject(writer, handshake_error());
            return None;
        }
    };

    match admitted {
        Ok((player_id, out)) => {
            relay.writers.insert(player_id, writer);
            relay.deliver(out);
            Some(player_id)
        }
        Err(e) => {
            debug!(error = %e, "join refused");
            reject(writer, e.into());
            None
        }
    }
}

/// Per-connection thread: read the room request, hand it to the main thread,
/// then keep reading frames for the admitted player.
fn connection_thread(stream: TcpStream, tx: Sender<InternalEvent>, keep_running: Arc<AtomicBool>) {
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)).ok();
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let writer = BufWriter::new(stream);

    let request: ClientMessage = match recv_frame(&mut reader) {
        Ok(msg @ (ClientMessage::CreateRoom { .. } | ClientMessage::JoinRoom { .. })) => msg,
        Ok(other) => {
            debug!(kind = other.kind(), "first frame was not a room request");
            reject(writer, handshake_error());
            return;
        }
        Err(e) => {
            warn!(error = %e, "bad handshake frame");
            reject(writer, handshake_error());
            return;
        }
    };
    reader.get_ref().set_read_timeout(None).ok();

    let (reply_tx, reply_rx) = mpsc::channel();
    let handshake = InternalEvent::Handshake {
        writer,
        request,
        reply: reply_tx,
    };
    if tx.send(handshake).is_err() {
        return;
    }
    if let Ok(Some(player_id)) = reply_rx.recv() {
        reader_loop(reader, player_id, tx, keep_running);
    }
}

fn handshake_error() -> ServerMessage {
    ServerMessage::Error {
        message: "expected createRoom or joinRoom".into(),
    }
}

fn reject(mut writer: BufWriter<TcpStream>, msg: ServerMessage) {
    let _ = send_frame(&mut writer, &msg);
    let _ = writer.get_ref().shutdown(Shutdown::Both);
}

fn reader_loop(
    mut reader: BufReader<TcpStream>,
    player_id: PlayerId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match recv_frame::<_, ClientMessage>(&mut reader) {
            Ok(ClientMessage::LeaveRoom) => {
                let _ = tx.send(InternalEvent::MessageFrom {
                    player_id,
                    message: ClientMessage::LeaveRoom,
                });
                break;
            }
            Ok(message) => {
                if tx.send(InternalEvent::MessageFrom { player_id, message }).is_err() {
                    break;
                }
            }
            Err(e) if e.is_recoverable() => {
                warn!(player = %player_id, error = %e, "dropping malformed frame");
            }
            Err(_) => {
                let _ = tx.send(InternalEvent::Disconnected { player_id });
                break;
            }
        }
    }
}

impl From<JoinError> for ServerMessage {
    fn from(e: JoinError) -> Self {
        ServerMessage::Error {
            message: e.to_string(),
        }
    }
}

// TCP client for the office relay.
//
// `NetClient` is the socket-backed `Transport`:
// - `connect()` opens the TCP stream on the calling thread and spawns a
//   background reader thread. No handshake happens here; the first `send`
//   must be `createRoom` or `joinRoom`, and the relay's answer (`roomJoined`
//   or `error`) arrives through `poll` like any other message.
// - The reader thread calls `recv_frame` in a loop and pushes decoded
//   `ServerMessage`s into an `mpsc` channel. Undecodable frames are skipped.
//   EOF or an I/O error marks the client closed.
// - The caller's thread holds the `BufWriter<TcpStream>` and flushes each
//   frame synchronously.
//
// `poll` never blocks, so a frame loop can drive it alongside the sim tick.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use pixel_office_protocol::framing::{recv_frame, send_frame};
use pixel_office_protocol::{ClientMessage, ServerMessage, Transport, TransportError};
use tracing::{debug, warn};

pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    closed: Arc<AtomicBool>,
    _reader_thread: Option<JoinHandle<()>>,
}

impl NetClient {
    pub fn connect(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true).ok();
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);

        let (tx, rx) = mpsc::channel();
        let closed = Arc::new(AtomicBool::new(false));
        let closed_reader = closed.clone();
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx, closed_reader);
        });

        Ok(Self {
            writer,
            inbox: rx,
            closed,
            _reader_thread: Some(reader_thread),
        })
    }

    /// True once the relay has closed the connection or `disconnect` ran.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send `leaveRoom` and close both halves of the socket.
    pub fn disconnect(&mut self) {
        if !self.is_closed() {
            let _ = send_frame(&mut self.writer, &ClientMessage::LeaveRoom);
        }
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

impl Transport for NetClient {
    fn send(&mut self, msg: &ClientMessage) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        send_frame(&mut self.writer, msg)?;
        Ok(())
    }

    fn poll(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

impl Drop for NetClient {
    fn drop(&mut self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

fn reader_loop(mut reader: BufReader<TcpStream>, tx: Sender<ServerMessage>, closed: Arc<AtomicBool>) {
    loop {
        match recv_frame::<_, ServerMessage>(&mut reader) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break;
                }
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "skipping undecodable frame from relay");
            }
            Err(e) => {
                debug!(error = %e, "relay connection ended");
                break;
            }
        }
    }
    closed.store(true, Ordering::SeqCst);
}

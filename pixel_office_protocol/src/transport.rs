// The boundary between room synchronization and whatever carries messages.
//
// `Transport` is deliberately small: fire-and-forget `send`, and a
// non-blocking `poll` that hands back everything received since the last
// call. Reconnects, backoff and socket ownership all live behind it. The
// TCP `NetClient` in `pixel_office_relay` is one implementation;
// `MemoryTransport` below is another, for driving a synchronizer by hand.

use std::collections::VecDeque;

use thiserror::Error;

use crate::framing::FrameError;
use crate::message::{ClientMessage, ServerMessage};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,

    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub trait Transport {
    /// Queue `msg` for delivery. Does not wait for any acknowledgment.
    fn send(&mut self, msg: &ClientMessage) -> Result<(), TransportError>;

    /// Everything received since the last poll, oldest first. Never blocks.
    fn poll(&mut self) -> Vec<ServerMessage>;
}

/// In-process transport: records what was sent, replays what was pushed.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Vec<ClientMessage>,
    inbox: VecDeque<ServerMessage>,
    closed: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `msg` available to the next `poll`.
    pub fn push_inbound(&mut self, msg: ServerMessage) {
        self.inbox.push_back(msg);
    }

    /// Take everything sent so far.
    pub fn take_sent(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.sent)
    }

    pub fn sent(&self) -> &[ClientMessage] {
        &self.sent
    }

    /// Subsequent sends fail with `TransportError::Closed`.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, msg: &ClientMessage) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.sent.push(msg.clone());
        Ok(())
    }

    fn poll(&mut self) -> Vec<ServerMessage> {
        self.inbox.drain(..).collect()
    }
}

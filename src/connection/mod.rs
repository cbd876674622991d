//! Persistent WebSocket connection to the pilight daemon.
//!
//! A [`Connection`] is a cheap, cloneable handle. Accessories subscribe to
//! its event stream and queue outbound frames on it; the client task owns the
//! socket, reconnects on failure and fans decoded frames out to subscribers.
//! The [`ConnectionPool`] hands out one shared handle per address when
//! `sharedWS` is enabled.

mod client;
mod pool;

pub use pool::ConnectionPool;

use crate::error::{BridgeError, Result};
use crate::protocol::OutboundFrame;
use log::info;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EVENT_CAPACITY: usize = 64;

/// Lifecycle and message events delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The socket is open and accepts frames.
    Ready,
    /// The socket failed or was closed.
    Error(String),
    /// A text frame that decoded as JSON.
    Frame(Value),
    /// A text frame that was not valid JSON.
    FrameError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

struct Inner {
    address: String,
    state: RwLock<ConnectionState>,
    events: broadcast::Sender<ConnectionEvent>,
    outbound_tx: mpsc::UnboundedSender<OutboundFrame>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<OutboundFrame>>>,
    cancel: CancellationToken,
}

/// Handle to one pilight WebSocket endpoint.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Create a disconnected handle for `address` (e.g. `ws://localhost:5001/`).
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_cancel(address, CancellationToken::new())
    }

    /// Create a handle whose client task stops when `cancel` fires.
    pub fn with_cancel(address: impl Into<String>, cancel: CancellationToken) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(Inner {
                address: address.into(),
                state: RwLock::new(ConnectionState::Disconnected),
                events,
                outbound_tx,
                outbound_rx: Mutex::new(Some(outbound_rx)),
                cancel,
            }),
        }
    }

    pub fn address(&self) -> &str {
        &self.inner.address
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Subscribe to connection events. Events emitted before the call are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }

    /// Queue a frame for sending.
    ///
    /// Succeeds as soon as the frame is queued; there is no acknowledgement
    /// from pilight and no retry.
    pub fn send(&self, frame: OutboundFrame) -> Result<()> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }
        self.inner
            .outbound_tx
            .send(frame)
            .map_err(|_| BridgeError::NotConnected)
    }

    /// Spawn the WebSocket client task.
    ///
    /// Only the first call on a handle (or any of its clones) spawns a task;
    /// later calls return `None`.
    pub fn connect(&self) -> Option<JoinHandle<()>> {
        let driver = self.take_driver()?;
        info!("[ws] Connecting to {}", self.address());
        Some(tokio::spawn(client::run(driver, self.inner.cancel.clone())))
    }

    /// Stop the client task, if one is running.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    /// Take the transport side of this handle.
    ///
    /// Used by the WebSocket client, and by callers that drive the
    /// connection from another transport. Returns `None` once taken.
    pub fn take_driver(&self) -> Option<Driver> {
        let outbound = self.inner.outbound_rx.lock().take()?;
        Some(Driver {
            connection: self.clone(),
            outbound,
        })
    }
}

/// Transport side of a [`Connection`]: publishes state and events, drains
/// outbound frames.
pub struct Driver {
    connection: Connection,
    outbound: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl Driver {
    pub fn address(&self) -> &str {
        self.connection.address()
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.connection.inner.state.write() = state;
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: ConnectionEvent) {
        let _ = self.connection.inner.events.send(event);
    }

    /// Take a queued outbound frame without waiting.
    pub fn try_next_outbound(&mut self) -> Option<OutboundFrame> {
        self.outbound.try_recv().ok()
    }
}

pub mod codec;
pub mod loopback;
pub mod websocket;

mod lifecycle;

use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use crate::config::{TransportConfig, TransportKind};
use crate::events::price::PriceEvent;

pub use loopback::LoopbackChannel;
pub use websocket::WebSocketChannel;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Error,
}

impl ConnectionState {
    /// Connecting or open: `open()` is a no-op in these states.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }

    pub fn as_gauge(&self) -> i64 {
        match self {
            ConnectionState::Idle => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Open => 2,
            ConnectionState::Error => 3,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Error => "error",
        };
        f.write_str(label)
    }
}

/// A single logical duplex connection carrying [`PriceEvent`]s.
///
/// None of these calls block or fail: connection work runs on background
/// tasks, and every transport failure is folded into
/// [`ConnectionState::Error`]. Callers retry by calling `open()` again.
pub trait PriceTransport: Send + Sync {
    fn open(&self);

    /// Cancel in-flight work and return to `Idle`. Idempotent. Nothing from
    /// the closed connection is published after this returns.
    fn close(&self);

    fn send(&self, event: &PriceEvent);

    fn state(&self) -> ConnectionState;

    fn watch_state(&self) -> watch::Receiver<ConnectionState>;

    /// Inbound events decoded from the connection, in arrival order.
    fn subscribe(&self) -> broadcast::Receiver<PriceEvent>;
}

pub fn build_transport(config: &TransportConfig) -> Arc<dyn PriceTransport> {
    match config.kind {
        TransportKind::WebSocket => Arc::new(WebSocketChannel::new(config.clone())),
        TransportKind::Loopback => Arc::new(LoopbackChannel::new(config.event_buffer)),
    }
}

use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    WebSocket,
    Loopback,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
    pub url: String,
    pub connect_timeout_ms: u64,
    pub keepalive_interval_ms: u64,
    pub event_buffer: usize,
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.kind == TransportKind::WebSocket && self.url.trim().is_empty() {
            return Err(Error::ConfigError("transport.url must not be empty".to_string()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::ConfigError("transport.connect_timeout_ms must be positive".to_string()));
        }
        if self.keepalive_interval_ms == 0 {
            return Err(Error::ConfigError("transport.keepalive_interval_ms must be positive".to_string()));
        }
        if self.event_buffer == 0 {
            return Err(Error::ConfigError("transport.event_buffer must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            kind: TransportKind::WebSocket,
            url: "wss://ws.postman-echo.com/raw".to_string(),
            connect_timeout_ms: 30_000,     // 30 seconds
            keepalive_interval_ms: 20_000,  // 20 seconds
            event_buffer: 1024,
        }
    }
}

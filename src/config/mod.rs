use serde::{Deserialize, Serialize};

pub mod feed;
pub mod transport;
pub mod loader;

pub use feed::{FeedConfig, SymbolEntry};
pub use loader::AppConfig;
pub use transport::{TransportConfig, TransportKind};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

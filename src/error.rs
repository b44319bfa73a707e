use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Transport Errors
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("Connection attempt timed out after {0} ms")]
    ConnectTimeout(u64),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    // Codec Errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Event deserialization failed: {0}")]
    DeserializationError(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(f64),

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    // Feed Errors
    #[error("Duplicate symbol in universe: {0}")]
    DuplicateSymbol(String),

    #[error("Security universe is empty")]
    EmptyUniverse,

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single price observation, as carried on the wire in both directions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceEvent {
    pub symbol: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl PriceEvent {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        PriceEvent {
            symbol: symbol.into(),
            price,
            timestamp: Utc::now(),
        }
    }
}

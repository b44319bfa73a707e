use std::collections::HashSet;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::feed::universe::default_universe;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SymbolEntry {
    pub symbol: String,
    pub name: String,
}

impl SymbolEntry {
    pub fn new(symbol: &str, name: &str) -> Self {
        SymbolEntry {
            symbol: symbol.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    pub tick_interval_ms: u64,
    pub max_delta: f64,
    pub price_floor: f64,
    pub seed_price_min: f64,
    pub seed_price_max: f64,
    pub rng_seed: Option<u64>,
    pub universe: Vec<SymbolEntry>,
}

impl FeedConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_bounds()?;
        check_symbols(self.universe.iter().map(|entry| entry.symbol.as_str()))
    }

    /// Validate the timing and price parameters, ignoring the universe.
    pub fn validate_bounds(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::ConfigError("feed.tick_interval_ms must be positive".to_string()));
        }
        if !self.max_delta.is_finite() || self.max_delta < 0.0 {
            return Err(Error::ConfigError(format!("feed.max_delta is invalid: {}", self.max_delta)));
        }
        if !self.price_floor.is_finite() || self.price_floor <= 0.0 {
            return Err(Error::ConfigError(format!("feed.price_floor is invalid: {}", self.price_floor)));
        }
        if !(self.seed_price_min > 0.0 && self.seed_price_min <= self.seed_price_max)
            || !self.seed_price_max.is_finite()
        {
            return Err(Error::ConfigError(format!(
                "feed seed price range is invalid: [{}, {}]",
                self.seed_price_min, self.seed_price_max
            )));
        }
        Ok(())
    }
}

/// Reject an empty universe, blank symbols and duplicates.
pub fn check_symbols<'a>(symbols: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for symbol in symbols {
        if symbol.trim().is_empty() {
            return Err(Error::InvalidSymbol(symbol.to_string()));
        }
        if !seen.insert(symbol) {
            return Err(Error::DuplicateSymbol(symbol.to_string()));
        }
    }

    if seen.is_empty() {
        return Err(Error::EmptyUniverse);
    }
    Ok(())
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            tick_interval_ms: 2_000,  // 2 seconds
            max_delta: 10.0,
            price_floor: 1.0,
            seed_price_min: 50.0,
            seed_price_max: 500.0,
            rng_seed: None,
            universe: default_universe(),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeDirection {
    Up,
    Down,
    Neutral,
}

impl ChangeDirection {
    pub fn between(previous: f64, current: f64) -> Self {
        if current > previous {
            ChangeDirection::Up
        } else if current < previous {
            ChangeDirection::Down
        } else {
            ChangeDirection::Neutral
        }
    }
}

/// A tracked instrument and its last two observed prices.
///
/// `previous_price` and `current_price` only move together through
/// [`Security::apply_price`], so the derived change metrics always describe
/// the most recent update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Security {
    symbol: String,
    name: String,
    current_price: f64,
    previous_price: f64,
    change_direction: ChangeDirection,
}

impl Security {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, initial_price: f64) -> Self {
        Security {
            symbol: symbol.into(),
            name: name.into(),
            current_price: initial_price,
            previous_price: initial_price,
            change_direction: ChangeDirection::Neutral,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    pub fn previous_price(&self) -> f64 {
        self.previous_price
    }

    pub fn change_direction(&self) -> ChangeDirection {
        self.change_direction
    }

    /// Snapshot the current price into `previous_price`, then overwrite it.
    pub fn apply_price(&mut self, new_price: f64) {
        self.previous_price = self.current_price;
        self.current_price = new_price;
        self.change_direction = ChangeDirection::between(self.previous_price, new_price);
    }

    pub fn change_amount(&self) -> f64 {
        self.current_price - self.previous_price
    }

    pub fn change_percent(&self) -> f64 {
        if self.previous_price > 0.0 {
            self.change_amount() / self.previous_price * 100.0
        } else {
            0.0
        }
    }
}

// Prices are always finite and positive, so bitwise equality agrees with `==`.
impl Eq for Security {}

impl Hash for Security {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
        self.name.hash(state);
        self.current_price.to_bits().hash(state);
        self.previous_price.to_bits().hash(state);
        self.change_direction.hash(state);
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.change_direction {
            ChangeDirection::Up => "▲",
            ChangeDirection::Down => "▼",
            ChangeDirection::Neutral => "-",
        };
        write!(
            f,
            "{:<6} {:>10.2} {} {:+.2} ({:+.2}%)",
            self.symbol,
            self.current_price,
            arrow,
            self.change_amount(),
            self.change_percent()
        )
    }
}

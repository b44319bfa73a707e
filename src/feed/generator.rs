use std::fmt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::config::FeedConfig;
use crate::events::price::PriceEvent;
use crate::types::security::Security;

/// Synthesizes outbound price movement for the tracked universe.
///
/// Each call to [`PriceGenerator::generate`] draws one delta per security
/// from `[-max_delta, max_delta]` and clamps the candidate at `price_floor`.
/// Local state is never touched here; candidates only take effect once
/// they come back through the transport.
pub struct PriceGenerator {
    max_delta: f64,
    price_floor: f64,
    deltas: Box<dyn FnMut(f64) -> f64 + Send>,
}

impl PriceGenerator {
    pub fn new(config: &FeedConfig) -> Self {
        let mut rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self::with_deltas(config, move |max_delta| rng.gen_range(-max_delta..=max_delta))
    }

    /// Use a custom delta source. It receives the configured `max_delta`.
    pub fn with_deltas<F>(config: &FeedConfig, deltas: F) -> Self
    where
        F: FnMut(f64) -> f64 + Send + 'static,
    {
        PriceGenerator {
            max_delta: config.max_delta,
            price_floor: config.price_floor,
            deltas: Box::new(deltas),
        }
    }

    pub fn candidate_price(&mut self, current_price: f64) -> f64 {
        let delta = (self.deltas)(self.max_delta);
        (current_price + delta).max(self.price_floor)
    }

    pub fn generate(&mut self, securities: &[Security]) -> Vec<PriceEvent> {
        securities
            .iter()
            .map(|security| {
                let price = self.candidate_price(security.current_price());
                PriceEvent::new(security.symbol(), price)
            })
            .collect()
    }
}

impl fmt::Debug for PriceGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceGenerator")
            .field("max_delta", &self.max_delta)
            .field("price_floor", &self.price_floor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn securities() -> Vec<Security> {
        vec![
            Security::new("AAPL", "Apple Inc.", 150.0),
            Security::new("MSFT", "Microsoft Corporation", 90.0),
        ]
    }

    #[test]
    fn applies_delta_to_every_security() {
        let mut generator = PriceGenerator::with_deltas(&FeedConfig::default(), |_| 5.0);

        let events = generator.generate(&securities());

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].symbol, "AAPL");
        assert_eq!(events[0].price, 155.0);
        assert_eq!(events[1].symbol, "MSFT");
        assert_eq!(events[1].price, 95.0);
    }

    #[test]
    fn clamps_at_price_floor() {
        let mut generator = PriceGenerator::with_deltas(&FeedConfig::default(), |_| -10.0);

        assert_eq!(generator.candidate_price(4.0), 1.0);
        assert_eq!(generator.candidate_price(1.0), 1.0);
    }

    #[test]
    fn random_deltas_stay_within_bounds() {
        let config = FeedConfig {
            rng_seed: Some(3),
            ..FeedConfig::default()
        };
        let mut generator = PriceGenerator::new(&config);

        for _ in 0..1_000 {
            let candidate = generator.candidate_price(100.0);
            assert!((90.0..=110.0).contains(&candidate));
        }
    }

    #[test]
    fn delta_source_sees_configured_bound() {
        let config = FeedConfig {
            max_delta: 2.5,
            ..FeedConfig::default()
        };
        let mut generator = PriceGenerator::with_deltas(&config, |max_delta| max_delta);

        assert_eq!(generator.candidate_price(10.0), 12.5);
    }

    #[test]
    fn seeded_generators_repeat() {
        let config = FeedConfig {
            rng_seed: Some(11),
            ..FeedConfig::default()
        };
        let mut first = PriceGenerator::new(&config);
        let mut second = PriceGenerator::new(&config);

        for _ in 0..10 {
            assert_eq!(first.candidate_price(200.0), second.candidate_price(200.0));
        }
    }
}

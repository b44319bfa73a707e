use crate::config::*;
use crate::error::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub transport: TransportConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Layer `config/default`, `config/<env>` and `STOCK_TICKER_*` variables
    /// (e.g. `STOCK_TICKER_TRANSPORT__URL`) over the built-in defaults.
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("STOCK_TICKER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Self::finish(config)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self> {
        let app: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        app.transport.validate()?;
        app.feed.validate()?;
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_yields_defaults() {
        let app = AppConfig::from_toml_str("").unwrap();

        assert_eq!(app.transport.kind, TransportKind::WebSocket);
        assert_eq!(app.transport.url, "wss://ws.postman-echo.com/raw");
        assert_eq!(app.transport.keepalive_interval_ms, 20_000);
        assert_eq!(app.feed.tick_interval_ms, 2_000);
        assert_eq!(app.feed.universe.len(), 25);
        assert_eq!(app.logging.level, "info");
    }

    #[test]
    fn sections_override_defaults() {
        let app = AppConfig::from_toml_str(
            r#"
            [transport]
            kind = "loopback"
            url = "ws://127.0.0.1:9001"

            [feed]
            tick_interval_ms = 250
            max_delta = 2.5
            rng_seed = 7

            [[feed.universe]]
            symbol = "AAPL"
            name = "Apple Inc."

            [[feed.universe]]
            symbol = "MSFT"
            name = "Microsoft Corporation"
            "#,
        )
        .unwrap();

        assert_eq!(app.transport.kind, TransportKind::Loopback);
        assert_eq!(app.transport.url, "ws://127.0.0.1:9001");
        assert_eq!(app.transport.connect_timeout_ms, 30_000);
        assert_eq!(app.feed.tick_interval_ms, 250);
        assert_eq!(app.feed.max_delta, 2.5);
        assert_eq!(app.feed.rng_seed, Some(7));
        assert_eq!(
            app.feed.universe,
            vec![
                SymbolEntry::new("AAPL", "Apple Inc."),
                SymbolEntry::new("MSFT", "Microsoft Corporation"),
            ]
        );
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
            [[feed.universe]]
            symbol = "AAPL"
            name = "Apple Inc."

            [[feed.universe]]
            symbol = "AAPL"
            name = "Apple again"
            "#,
        );

        assert!(matches!(result, Err(Error::DuplicateSymbol(symbol)) if symbol == "AAPL"));
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(matches!(
            AppConfig::from_toml_str("[feed]\nseed_price_min = 600.0"),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            AppConfig::from_toml_str("[transport]\nkeepalive_interval_ms = 0"),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            AppConfig::from_toml_str("[transport]\nkind = \"carrier-pigeon\""),
            Err(Error::ConfigError(_))
        ));
    }
}

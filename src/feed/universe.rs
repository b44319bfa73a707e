use rand::Rng;
use crate::config::{FeedConfig, SymbolEntry};
use crate::types::security::Security;

const DEFAULT_SYMBOLS: [(&str, &str); 25] = [
    ("AAPL", "Apple Inc."),
    ("GOOG", "Alphabet Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("AMZN", "Amazon.com Inc."),
    ("TSLA", "Tesla Inc."),
    ("NVDA", "NVIDIA Corporation"),
    ("META", "Meta Platforms Inc."),
    ("BRK.B", "Berkshire Hathaway Inc."),
    ("V", "Visa Inc."),
    ("JNJ", "Johnson & Johnson"),
    ("WMT", "Walmart Inc."),
    ("JPM", "JPMorgan Chase & Co."),
    ("MA", "Mastercard Inc."),
    ("PG", "Procter & Gamble Co."),
    ("UNH", "UnitedHealth Group Inc."),
    ("DIS", "The Walt Disney Company"),
    ("HD", "The Home Depot Inc."),
    ("BAC", "Bank of America Corp."),
    ("ADBE", "Adobe Inc."),
    ("NFLX", "Netflix Inc."),
    ("CRM", "Salesforce Inc."),
    ("XOM", "Exxon Mobil Corporation"),
    ("PFE", "Pfizer Inc."),
    ("CSCO", "Cisco Systems Inc."),
    ("INTC", "Intel Corporation"),
];

pub fn default_universe() -> Vec<SymbolEntry> {
    DEFAULT_SYMBOLS
        .iter()
        .map(|(symbol, name)| SymbolEntry::new(symbol, name))
        .collect()
}

/// Build one security per configured symbol with a uniform seed price.
pub fn seed_securities<R: Rng>(config: &FeedConfig, rng: &mut R) -> Vec<Security> {
    config
        .universe
        .iter()
        .map(|entry| {
            let price = rng.gen_range(config.seed_price_min..=config.seed_price_max);
            Security::new(entry.symbol.clone(), entry.name.clone(), price)
        })
        .collect()
}

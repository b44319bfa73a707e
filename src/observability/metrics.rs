use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Transport metrics
    pub static ref PRICE_EVENTS_SENT: IntCounter = IntCounter::new(
        "price_events_sent_total",
        "Total number of price events submitted to the transport"
    ).expect("valid metric definition");

    pub static ref PRICE_EVENTS_RECEIVED: IntCounter = IntCounter::new(
        "price_events_received_total",
        "Total number of price events decoded from the transport"
    ).expect("valid metric definition");

    pub static ref DECODE_FAILURES: IntCounter = IntCounter::new(
        "decode_failures_total",
        "Total number of inbound frames that failed to decode"
    ).expect("valid metric definition");

    pub static ref TRANSPORT_ERRORS: IntCounter = IntCounter::new(
        "transport_errors_total",
        "Total number of connect, send and receive failures"
    ).expect("valid metric definition");

    pub static ref CONNECTION_STATE: IntGauge = IntGauge::new(
        "connection_state",
        "Transport state: 0 idle, 1 connecting, 2 open, 3 error"
    ).expect("valid metric definition");

    // Feed metrics
    pub static ref FEED_TICKS: IntCounter = IntCounter::new(
        "feed_ticks_total",
        "Total number of generator ticks that produced price events"
    ).expect("valid metric definition");

    pub static ref PRICE_EVENTS_APPLIED: IntCounter = IntCounter::new(
        "price_events_applied_total",
        "Total number of inbound price events applied to a security"
    ).expect("valid metric definition");

    pub static ref UNKNOWN_SYMBOL_DROPS: IntCounter = IntCounter::new(
        "unknown_symbol_drops_total",
        "Total number of inbound price events for symbols outside the universe"
    ).expect("valid metric definition");
}

pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(PRICE_EVENTS_SENT.clone()))?;
    REGISTRY.register(Box::new(PRICE_EVENTS_RECEIVED.clone()))?;
    REGISTRY.register(Box::new(DECODE_FAILURES.clone()))?;
    REGISTRY.register(Box::new(TRANSPORT_ERRORS.clone()))?;
    REGISTRY.register(Box::new(CONNECTION_STATE.clone()))?;
    REGISTRY.register(Box::new(FEED_TICKS.clone()))?;
    REGISTRY.register(Box::new(PRICE_EVENTS_APPLIED.clone()))?;
    REGISTRY.register(Box::new(UNKNOWN_SYMBOL_DROPS.clone()))?;
    Ok(())
}

/// Render the registry in the prometheus text exposition format.
pub fn gather_metrics() -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

use crate::error::{Error, Result};
use crate::events::price::PriceEvent;

/// Serialize an event to its JSON text frame.
pub fn encode(event: &PriceEvent) -> Result<String> {
    validate(event)?;
    serde_json::to_string(event).map_err(|e| Error::SerializationError(e.to_string()))
}

/// Decode one inbound frame. Text and binary frames share the same JSON body.
pub fn decode(payload: &[u8]) -> Result<PriceEvent> {
    let event: PriceEvent = serde_json::from_slice(payload)
        .map_err(|e| Error::DeserializationError(e.to_string()))?;
    validate(&event)?;
    Ok(event)
}

fn validate(event: &PriceEvent) -> Result<()> {
    if event.symbol.trim().is_empty() {
        return Err(Error::InvalidSymbol(event.symbol.clone()));
    }
    if !event.price.is_finite() || event.price <= 0.0 {
        return Err(Error::InvalidPrice(event.price));
    }
    Ok(())
}

use tracing::Span;

pub fn trace_connection(transport: &str, url: &str, epoch: u64) -> Span {
    tracing::info_span!(
        "connection",
        transport = transport,
        url = url,
        epoch = epoch,
    )
}

pub fn trace_feed_tick(session: u64) -> Span {
    tracing::debug_span!(
        "feed_tick",
        session = session,
    )
}

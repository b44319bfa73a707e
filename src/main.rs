use std::env;
use anyhow::Context;
use stock_ticker::config::AppConfig;
use stock_ticker::feed::{FeedCoordinator, FeedSnapshot};
use stock_ticker::observability::logging::init_tracing;
use stock_ticker::observability::metrics::{gather_metrics, register_metrics};
use stock_ticker::transport::build_transport;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

fn render(snapshot: &FeedSnapshot, connection: impl std::fmt::Display) {
    println!(
        "\n== {} | connection: {} | v{} ==",
        if snapshot.running { "RUNNING" } else { "STOPPED" },
        connection,
        snapshot.version
    );
    for security in &snapshot.securities {
        println!("{}  {}", security, security.name());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_name = env::var("STOCK_TICKER_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env_name).context("failed to load configuration")?;

    init_tracing(&config.logging).context("failed to initialize logging")?;
    register_metrics().context("failed to register metrics")?;

    info!(
        env = %env_name,
        transport = ?config.transport.kind,
        url = %config.transport.url,
        "Starting stock ticker"
    );

    let transport = build_transport(&config.transport);
    let feed = FeedCoordinator::new(config.feed.clone(), transport)
        .context("failed to build feed")?;

    feed.toggle_running();

    let mut snapshots = WatchStream::new(feed.subscribe());
    let mut connection = feed.watch_connection();

    loop {
        tokio::select! {
            Some(snapshot) = snapshots.next() => {
                render(&snapshot, feed.connection_state());
            }
            changed = connection.changed() => {
                if changed.is_err() {
                    warn!("Transport dropped its state channel");
                    break;
                }
                let state = *connection.borrow_and_update();
                info!(state = %state, "Connection state changed");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    if feed.is_running() {
        feed.toggle_running();
    }

    match gather_metrics() {
        Ok(metrics) => debug!("Final metrics:\n{}", metrics),
        Err(e) => warn!(error = %e, "Failed to gather metrics"),
    }

    info!("Stock ticker stopped");
    Ok(())
}

use std::sync::Arc;
use std::time::Duration;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, interval_at, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{Instrument, debug, info};
use crate::config::TransportConfig;
use crate::error::Error;
use crate::events::price::PriceEvent;
use crate::observability::tracing::trace_connection;
use crate::transport::lifecycle::ChannelCore;
use crate::transport::{ConnectionState, PriceTransport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Duplex WebSocket connection to an echo-style price endpoint.
///
/// Outbound events go out as JSON text frames; inbound text and binary
/// frames are decoded one at a time by a single receive loop. While open, a
/// ping is queued every `keepalive_interval` so idle connections are not
/// timed out by the server. Each write, and the closing handshake, is bounded
/// by `connect_timeout`, so a peer that stops reading cannot pin the socket.
/// There is no automatic reconnect.
pub struct WebSocketChannel {
    core: Arc<ChannelCore<Message>>,
    config: TransportConfig,
}

impl WebSocketChannel {
    pub fn new(config: TransportConfig) -> Self {
        WebSocketChannel {
            core: Arc::new(ChannelCore::new("websocket", config.event_buffer)),
            config,
        }
    }
}

impl PriceTransport for WebSocketChannel {
    fn open(&self) {
        let core = self.core.clone();
        let url = self.config.url.clone();
        let connect_timeout = self.config.connect_timeout();
        let keepalive = self.config.keepalive_interval();

        self.core.begin_open(move |epoch| {
            let span = trace_connection("websocket", &url, epoch);
            connect(core, url, connect_timeout, keepalive, epoch).instrument(span)
        });
    }

    fn close(&self) {
        self.core.close(Some(Message::Close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "client closing".into(),
        }))));
    }

    fn send(&self, event: &PriceEvent) {
        self.core.send(event, Message::Text);
    }

    fn state(&self) -> ConnectionState {
        self.core.state()
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.core.watch_state()
    }

    fn subscribe(&self) -> broadcast::Receiver<PriceEvent> {
        self.core.subscribe()
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.close();
    }
}

async fn connect(
    core: Arc<ChannelCore<Message>>,
    url: String,
    connect_timeout: Duration,
    keepalive: Duration,
    epoch: u64,
) {
    info!("Connecting");

    let ws = match timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((ws, _response))) => ws,
        Ok(Err(e)) => {
            core.fail(epoch, &Error::ConnectFailed(e.to_string()));
            return;
        }
        Err(_) => {
            core.fail(epoch, &Error::ConnectTimeout(connect_timeout.as_millis() as u64));
            return;
        }
    };

    let (sink, stream) = ws.split();
    let (outbound, frames) = mpsc::unbounded_channel();

    let task_core = core.clone();
    let opened = core.complete_open(epoch, outbound, move |tasks| {
        tasks.spawn(
            "receive",
            receive_loop(task_core.clone(), stream, epoch).in_current_span(),
        );
        tasks.spawn(
            "keepalive",
            keepalive_loop(task_core, keepalive, epoch).in_current_span(),
        );
    });

    if opened {
        let writer = tokio::spawn(
            write_loop(core.clone(), sink, frames, connect_timeout, epoch).in_current_span(),
        );
        core.set_writer(epoch, writer);
        info!("WebSocket connected successfully");
    } else {
        debug!("Connection completed after close; dropping it");
    }
}

/// Drains the outbound queue until it is dropped or a close frame goes out.
/// Returning drops the sink, which releases the socket.
async fn write_loop(
    core: Arc<ChannelCore<Message>>,
    mut sink: SplitSink<WsStream, Message>,
    mut frames: mpsc::UnboundedReceiver<Message>,
    write_timeout: Duration,
    epoch: u64,
) {
    while let Some(frame) = frames.recv().await {
        let closing = matches!(frame, Message::Close(_));
        match timeout(write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                core.fail(epoch, &Error::SendFailed(e.to_string()));
                return;
            }
            Err(_) => {
                core.fail(
                    epoch,
                    &Error::SendFailed(format!("write stalled for {} ms", write_timeout.as_millis())),
                );
                return;
            }
        }
        if closing {
            break;
        }
    }

    if timeout(write_timeout, sink.close()).await.is_err() {
        debug!("Closing handshake timed out; dropping socket");
    }
    debug!("Writer finished");
}

async fn receive_loop(core: Arc<ChannelCore<Message>>, mut stream: SplitStream<WsStream>, epoch: u64) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => core.deliver(epoch, text.as_bytes()),
            Ok(Message::Binary(data)) => core.deliver(epoch, &data),
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| format!("code {}: {}", u16::from(f.code), f.reason))
                    .unwrap_or_else(|| "No reason".to_string());
                info!(reason = %reason, "WebSocket closed by peer");
                core.remote_closed(epoch);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                core.fail(epoch, &Error::ReceiveFailed(e.to_string()));
                return;
            }
        }
    }

    info!("WebSocket stream ended");
    core.remote_closed(epoch);
}

async fn keepalive_loop(core: Arc<ChannelCore<Message>>, period: Duration, epoch: u64) {
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        ticker.tick().await;
        if !core.send_frame(Some(epoch), Message::Ping(Vec::new())) {
            break;
        }
        debug!("Keep-alive ping queued");
    }
}

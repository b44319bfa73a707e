#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use futures_util::{SinkExt, StreamExt};
use stock_ticker::config::TransportConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// How the test server answers each text frame.
#[derive(Clone, Copy, Debug)]
pub enum Script {
    Echo,
    /// Send an undecodable frame ahead of every echo.
    GarbageFirst,
    /// Close the connection on the first text frame.
    CloseOnFirstFrame,
    /// Complete the handshake, then stop reading until `ServerLog::release`
    /// is notified. After that, frames are counted but never answered.
    StallUntilReleased,
}

#[derive(Default)]
pub struct ServerLog {
    pub connections: AtomicUsize,
    pub texts: AtomicUsize,
    pub pings: AtomicUsize,
    pub close_codes: Mutex<Vec<u16>>,
    /// Set once a connection's stream has ended.
    pub finished: AtomicBool,
    pub release: Notify,
}

impl ServerLog {
    pub fn close_codes(&self) -> Vec<u16> {
        self.close_codes.lock().unwrap().clone()
    }
}

pub struct TestServer {
    pub url: String,
    pub log: Arc<ServerLog>,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_server(script: Script) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let log = Arc::new(ServerLog::default());

    let accept_log = log.clone();
    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream, script, accept_log.clone()));
        }
    });

    TestServer { url, log, handle }
}

async fn serve(stream: TcpStream, script: Script, log: Arc<ServerLog>) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    log.connections.fetch_add(1, Ordering::SeqCst);

    if let Script::StallUntilReleased = script {
        log.release.notified().await;
    }

    while let Some(Ok(frame)) = ws.next().await {
        match frame {
            Message::Text(text) => {
                log.texts.fetch_add(1, Ordering::SeqCst);
                match script {
                    Script::Echo => {
                        let _ = ws.send(Message::Text(text)).await;
                    }
                    Script::GarbageFirst => {
                        let _ = ws.send(Message::Text("not a price".to_string())).await;
                        let _ = ws.send(Message::Text(text)).await;
                    }
                    Script::StallUntilReleased => {}
                    Script::CloseOnFirstFrame => {
                        let _ = ws
                            .close(Some(CloseFrame {
                                code: CloseCode::Normal,
                                reason: "done".into(),
                            }))
                            .await;
                    }
                }
            }
            Message::Ping(_) => {
                log.pings.fetch_add(1, Ordering::SeqCst);
            }
            Message::Close(frame) => {
                let code = frame.map(|f| u16::from(f.code)).unwrap_or(0);
                log.close_codes.lock().unwrap().push(code);
            }
            _ => {}
        }
    }
    log.finished.store(true, Ordering::SeqCst);
}

/// A TCP listener that accepts connections but never answers the
/// WebSocket handshake.
pub async fn spawn_silent_listener() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    (url, handle)
}

/// An address nothing listens on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

pub fn transport_config(url: &str) -> TransportConfig {
    TransportConfig {
        url: url.to_string(),
        connect_timeout_ms: 2_000,
        ..TransportConfig::default()
    }
}

pub async fn within<T>(future: impl Future<Output = T>) -> T {
    timeout(Duration::from_secs(5), future).await.expect("timed out")
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    within(async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
}

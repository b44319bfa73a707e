use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use crate::error::Error;
use crate::events::price::PriceEvent;
use crate::transport::lifecycle::ChannelCore;
use crate::transport::{ConnectionState, PriceTransport};

/// In-process echo endpoint: every frame sent comes back as the next
/// inbound frame, going through the same encode/decode path as the wire.
pub struct LoopbackChannel {
    core: Arc<ChannelCore<String>>,
}

impl LoopbackChannel {
    pub fn new(event_buffer: usize) -> Self {
        LoopbackChannel {
            core: Arc::new(ChannelCore::new("loopback", event_buffer)),
        }
    }

    /// Push a raw inbound frame as if the remote end had sent it.
    /// Returns false unless the channel is open.
    pub fn inject(&self, frame: impl Into<String>) -> bool {
        self.core.send_frame(None, frame.into())
    }

    /// Simulate a transport-level receive failure.
    pub fn sever(&self) {
        self.core.fail_current(&Error::ReceiveFailed("loopback severed".to_string()));
    }
}

async fn echo_loop(core: Arc<ChannelCore<String>>, mut frames: mpsc::UnboundedReceiver<String>, epoch: u64) {
    while let Some(frame) = frames.recv().await {
        core.deliver(epoch, frame.as_bytes());
    }
}

impl PriceTransport for LoopbackChannel {
    fn open(&self) {
        let core = self.core.clone();
        self.core.begin_open(move |epoch| async move {
            let (outbound, frames) = mpsc::unbounded_channel();
            let echo_core = core.clone();
            core.complete_open(epoch, outbound, move |tasks| {
                tasks.spawn("echo", echo_loop(echo_core, frames, epoch));
            });
        });
    }

    fn close(&self) {
        self.core.close(None);
    }

    fn send(&self, event: &PriceEvent) {
        self.core.send(event, |payload| payload);
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

impl Drop for LoopbackChannel {
    fn drop(&mut self) {
        self.core.close(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, timeout};

    async fn wait_for_state(channel: &LoopbackChannel, expected: ConnectionState) {
        let mut watcher = channel.watch_state();
        timeout(Duration::from_secs(2), watcher.wait_for(|state| *state == expected))
            .await
            .expect("state change in time")
            .expect("channel alive");
    }

    #[tokio::test]
    async fn echoes_sent_events() {
        let channel = LoopbackChannel::new(16);
        let mut inbound = channel.subscribe();

        channel.open();
        wait_for_state(&channel, ConnectionState::Open).await;

        let event = PriceEvent::new("AAPL", 155.0);
        channel.send(&event);

        let echoed = timeout(Duration::from_secs(2), inbound.recv()).await.unwrap().unwrap();
        assert_eq!(echoed, event);
    }

    #[tokio::test]
    async fn send_before_open_is_dropped() {
        let channel = LoopbackChannel::new(16);
        let mut inbound = channel.subscribe();

        channel.send(&PriceEvent::new("AAPL", 155.0));
        channel.open();
        wait_for_state(&channel, ConnectionState::Open).await;

        assert!(timeout(Duration::from_millis(50), inbound.recv()).await.is_err());
    }

    #[tokio::test]
    async fn injected_garbage_is_skipped() {
        let channel = LoopbackChannel::new(16);
        let mut inbound = channel.subscribe();
        channel.open();
        wait_for_state(&channel, ConnectionState::Open).await;

        assert!(channel.inject("not a price"));
        channel.send(&PriceEvent::new("MSFT", 91.0));

        let event = timeout(Duration::from_secs(2), inbound.recv()).await.unwrap().unwrap();
        assert_eq!(event.symbol, "MSFT");
        assert_eq!(channel.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn sever_moves_to_error_until_reopened() {
        let channel = LoopbackChannel::new(16);
        channel.open();
        wait_for_state(&channel, ConnectionState::Open).await;

        channel.sever();
        assert_eq!(channel.state(), ConnectionState::Error);
        assert!(!channel.inject("{}"));

        channel.open();
        wait_for_state(&channel, ConnectionState::Open).await;
    }

    #[tokio::test]
    async fn close_stops_echoes_in_flight() {
        let channel = LoopbackChannel::new(16);
        let mut inbound = channel.subscribe();
        channel.open();
        wait_for_state(&channel, ConnectionState::Open).await;

        channel.send(&PriceEvent::new("AAPL", 155.0));
        channel.close();

        assert_eq!(channel.state(), ConnectionState::Idle);
        assert!(timeout(Duration::from_millis(50), inbound.recv()).await.is_err());
    }
}

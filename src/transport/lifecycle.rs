use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use crate::error::Error;
use crate::events::price::PriceEvent;
use crate::observability::metrics::{
    CONNECTION_STATE, DECODE_FAILURES, PRICE_EVENTS_RECEIVED, PRICE_EVENTS_SENT, TRANSPORT_ERRORS,
};
use crate::transport::{ConnectionState, codec};
use crate::utils::task_supervisor::TaskSupervisor;

/// Connection bookkeeping shared by every transport implementation.
///
/// `F` is the outbound frame type handed to the writer side. Each connection
/// attempt gets a fresh `epoch`; completions carrying an older epoch are
/// discarded, which is what makes `close()` synchronous for callers even
/// while I/O is still in flight on other tasks.
pub(crate) struct ChannelCore<F> {
    transport: &'static str,
    inner: Mutex<CoreInner<F>>,
    status: watch::Sender<ConnectionState>,
    events: broadcast::Sender<PriceEvent>,
}

struct CoreInner<F> {
    state: ConnectionState,
    epoch: u64,
    outbound: Option<mpsc::UnboundedSender<F>>,
    tasks: TaskSupervisor,
    // Kept outside `tasks` so `close()` can let it flush the farewell frame.
    writer: Option<JoinHandle<()>>,
}

impl<F: Send + 'static> ChannelCore<F> {
    pub(crate) fn new(transport: &'static str, event_buffer: usize) -> Self {
        let (status, _) = watch::channel(ConnectionState::Idle);
        let (events, _) = broadcast::channel(event_buffer.max(1));

        ChannelCore {
            transport,
            inner: Mutex::new(CoreInner {
                state: ConnectionState::Idle,
                epoch: 0,
                outbound: None,
                tasks: TaskSupervisor::new(),
                writer: None,
            }),
            status,
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoreInner<F>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.lock().state
    }

    pub(crate) fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.status.subscribe()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<PriceEvent> {
        self.events.subscribe()
    }

    /// Start a connection attempt unless one is already connecting or open.
    /// `connect` receives the epoch of the new attempt.
    pub(crate) fn begin_open<C, Fut>(&self, connect: C)
    where
        C: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.lock();
        if inner.state.is_active() {
            debug!(transport = self.transport, state = %inner.state, "Open ignored");
            return;
        }

        inner.epoch += 1;
        let epoch = inner.epoch;
        Self::teardown(&mut inner);
        self.transition(&mut inner, ConnectionState::Connecting);
        inner.tasks.spawn("connect", connect(epoch));
    }

    /// Finish a connection attempt: install the outbound queue, start the
    /// per-connection tasks and move to `Open`. Returns false when the
    /// attempt was superseded by `close()` or a newer `open()`.
    pub(crate) fn complete_open<S>(
        &self,
        epoch: u64,
        outbound: mpsc::UnboundedSender<F>,
        start: S,
    ) -> bool
    where
        S: FnOnce(&mut TaskSupervisor),
    {
        let mut inner = self.lock();
        if inner.epoch != epoch || inner.state != ConnectionState::Connecting {
            return false;
        }

        inner.outbound = Some(outbound);
        start(&mut inner.tasks);
        self.transition(&mut inner, ConnectionState::Open);
        true
    }

    /// Register the task draining the outbound queue of `epoch`.
    ///
    /// The writer is aborted on failure or remote close. After `close()` it
    /// is left to send the farewell frame; it must bound its own I/O.
    pub(crate) fn set_writer(&self, epoch: u64, writer: JoinHandle<()>) {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return;
        }

        if inner.state == ConnectionState::Open {
            if let Some(previous) = inner.writer.replace(writer) {
                previous.abort();
            }
        } else {
            writer.abort();
        }
    }

    /// Record a transport failure for `epoch`. Stale failures are ignored.
    pub(crate) fn fail(&self, epoch: u64, err: &Error) {
        let mut inner = self.lock();
        if inner.epoch != epoch || !inner.state.is_active() {
            debug!(transport = self.transport, error = %err, "Ignoring failure from a finished connection");
            return;
        }

        TRANSPORT_ERRORS.inc();
        warn!(transport = self.transport, error = %err, "Transport failure");
        Self::teardown(&mut inner);
        self.transition(&mut inner, ConnectionState::Error);
    }

    pub(crate) fn fail_current(&self, err: &Error) {
        let epoch = self.lock().epoch;
        self.fail(epoch, err);
    }

    /// The peer closed the connection or the stream ended.
    pub(crate) fn remote_closed(&self, epoch: u64) {
        let mut inner = self.lock();
        if inner.epoch != epoch || !inner.state.is_active() {
            return;
        }

        Self::teardown(&mut inner);
        self.transition(&mut inner, ConnectionState::Idle);
    }

    /// Cancel everything for the current connection and return to `Idle`.
    /// `farewell` is queued to the writer before the outbound queue is dropped.
    pub(crate) fn close(&self, farewell: Option<F>) {
        let mut inner = self.lock();
        inner.epoch += 1;

        if let Some(outbound) = inner.outbound.take() {
            if let Some(frame) = farewell {
                let _ = outbound.send(frame);
            }
        }
        inner.writer = None;
        inner.tasks.abort_all();
        self.transition(&mut inner, ConnectionState::Idle);
    }

    /// Decode one inbound frame and publish it if `epoch` is still open.
    pub(crate) fn deliver(&self, epoch: u64, payload: &[u8]) {
        let event = match codec::decode(payload) {
            Ok(event) => event,
            Err(e) => {
                DECODE_FAILURES.inc();
                warn!(transport = self.transport, error = %e, "Failed to decode message");
                return;
            }
        };

        let inner = self.lock();
        if inner.epoch != epoch || inner.state != ConnectionState::Open {
            debug!(transport = self.transport, symbol = %event.symbol, "Discarding frame from a closed connection");
            return;
        }

        PRICE_EVENTS_RECEIVED.inc();
        if self.events.send(event).is_err() {
            debug!(transport = self.transport, "No subscribers for inbound event");
        }
    }

    /// Encode and queue `event`. A no-op unless the channel is `Open`.
    pub(crate) fn send<M>(&self, event: &PriceEvent, frame: M)
    where
        M: FnOnce(String) -> F,
    {
        let mut inner = self.lock();
        if inner.state != ConnectionState::Open {
            debug!(transport = self.transport, symbol = %event.symbol, state = %inner.state, "Cannot send: transport not open");
            return;
        }

        let payload = match codec::encode(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(transport = self.transport, symbol = %event.symbol, error = %e, "Failed to encode price update");
                return;
            }
        };

        let submitted = inner
            .outbound
            .as_ref()
            .is_some_and(|outbound| outbound.send(frame(payload)).is_ok());
        if submitted {
            PRICE_EVENTS_SENT.inc();
            return;
        }

        TRANSPORT_ERRORS.inc();
        warn!(transport = self.transport, "Outbound queue closed while open");
        Self::teardown(&mut inner);
        self.transition(&mut inner, ConnectionState::Error);
    }

    /// Queue a pre-built frame. `None` targets whatever connection is current.
    pub(crate) fn send_frame(&self, epoch: Option<u64>, frame: F) -> bool {
        let inner = self.lock();
        if epoch.is_some_and(|epoch| epoch != inner.epoch) || inner.state != ConnectionState::Open {
            return false;
        }

        inner
            .outbound
            .as_ref()
            .is_some_and(|outbound| outbound.send(frame).is_ok())
    }

    fn teardown(inner: &mut CoreInner<F>) {
        inner.outbound = None;
        inner.tasks.abort_all();
        if let Some(writer) = inner.writer.take() {
            writer.abort();
        }
    }

    fn transition(&self, inner: &mut CoreInner<F>, next: ConnectionState) {
        if inner.state == next {
            return;
        }

        info!(transport = self.transport, from = %inner.state, to = %next, "Connection state changed");
        inner.state = next;
        CONNECTION_STATE.set(next.as_gauge());
        self.status.send_replace(next);
    }
}

pub mod generator;
pub mod universe;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};
use crate::config::FeedConfig;
use crate::config::feed::check_symbols;
use crate::error::{Error, Result};
use crate::events::price::PriceEvent;
use crate::observability::metrics::{FEED_TICKS, PRICE_EVENTS_APPLIED, UNKNOWN_SYMBOL_DROPS};
use crate::observability::tracing::trace_feed_tick;
use crate::transport::{ConnectionState, PriceTransport};
use crate::types::security::Security;
use crate::utils::task_supervisor::TaskSupervisor;

pub use generator::PriceGenerator;

/// Point-in-time view of the feed published to observers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedSnapshot {
    /// Sorted by current price, highest first.
    pub securities: Vec<Security>,
    pub running: bool,
    pub version: u64,
}

/// Owns the security universe and drives it from a [`PriceTransport`].
///
/// While running, a generator task sends one candidate price per security
/// every tick, and an inbound task applies whatever the transport decodes.
/// Prices only change when an event comes back through the transport, so
/// with an echo endpoint every candidate is observed one round trip later.
///
/// All mutation happens under a single lock. A session counter is bumped on
/// every start and stop; work tagged with an older session is dropped, so
/// nothing is applied or sent once `toggle_running` has returned `false`.
pub struct FeedCoordinator {
    shared: Arc<FeedShared>,
}

struct FeedShared {
    config: FeedConfig,
    transport: Arc<dyn PriceTransport>,
    state: Mutex<FeedState>,
    snapshot: watch::Sender<FeedSnapshot>,
}

struct FeedState {
    securities: Vec<Security>,
    running: bool,
    session: u64,
    version: u64,
    generator: PriceGenerator,
    tasks: TaskSupervisor,
}

impl FeedCoordinator {
    /// Build a stopped feed over the configured universe with random seed
    /// prices.
    pub fn new(config: FeedConfig, transport: Arc<dyn PriceTransport>) -> Result<Self> {
        config.validate()?;

        let generator = PriceGenerator::new(&config);
        let coordinator = Self::build(config, transport, generator);
        coordinator.initialize();
        Ok(coordinator)
    }

    /// Build a stopped feed over explicit seed securities and a custom
    /// generator. The configured universe is only used by a later
    /// [`FeedCoordinator::initialize`].
    pub fn with_securities(
        config: FeedConfig,
        transport: Arc<dyn PriceTransport>,
        generator: PriceGenerator,
        securities: Vec<Security>,
    ) -> Result<Self> {
        config.validate_bounds()?;
        check_symbols(securities.iter().map(Security::symbol))?;
        if let Some(bad) = securities
            .iter()
            .find(|s| !(s.current_price().is_finite() && s.current_price() > 0.0))
        {
            return Err(Error::InvalidPrice(bad.current_price()));
        }

        let coordinator = Self::build(config, transport, generator);
        coordinator.shared.replace_securities(securities);
        Ok(coordinator)
    }

    fn build(config: FeedConfig, transport: Arc<dyn PriceTransport>, generator: PriceGenerator) -> Self {
        let (snapshot, _) = watch::channel(FeedSnapshot::default());

        FeedCoordinator {
            shared: Arc::new(FeedShared {
                config,
                transport,
                state: Mutex::new(FeedState {
                    securities: Vec::new(),
                    running: false,
                    session: 0,
                    version: 0,
                    generator,
                    tasks: TaskSupervisor::new(),
                }),
                snapshot,
            }),
        }
    }

    /// Reseed every configured security with a price drawn uniformly from
    /// the seed range.
    pub fn initialize(&self) {
        let config = &self.shared.config;
        let mut rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let securities = universe::seed_securities(config, &mut rng);

        info!(count = securities.len(), "Feed universe initialized");
        self.shared.replace_securities(securities);
    }

    /// Start or stop the feed and return the new running flag.
    ///
    /// Starting opens the transport and spawns the generator and inbound
    /// tasks. Stopping cancels both, then closes the transport. Prices are
    /// left as they were.
    pub fn toggle_running(&self) -> bool {
        let mut state = self.shared.lock();
        state.running = !state.running;
        state.session += 1;
        let session = state.session;

        if state.running {
            // Subscribe before opening so the first echo cannot be missed.
            let inbound = self.shared.transport.subscribe();
            self.shared.transport.open();

            state.tasks.spawn("inbound", inbound_loop(self.shared.clone(), inbound, session));
            state.tasks.spawn(
                "generator",
                generator_loop(self.shared.clone(), self.shared.config.tick_interval(), session),
            );
            info!(session, "Feed started");
        } else {
            state.tasks.abort_all();
            self.shared.transport.close();
            info!(session, "Feed stopped");
        }

        self.shared.publish(&mut state);
        state.running
    }

    /// Run one generator tick now instead of waiting for the timer.
    /// Does nothing while stopped.
    pub fn tick_now(&self) {
        let session = self.shared.lock().session;
        self.shared.tick(session);
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Current securities, sorted by price descending.
    pub fn securities(&self) -> Vec<Security> {
        self.shared.lock().securities.clone()
    }

    pub fn lookup(&self, symbol: &str) -> Option<Security> {
        self.shared
            .lock()
            .securities
            .iter()
            .find(|s| s.symbol() == symbol)
            .cloned()
    }

    /// Same as [`FeedCoordinator::lookup`], but a miss is logged.
    pub fn resolve_symbol(&self, symbol: &str) -> Option<Security> {
        let found = self.lookup(symbol);
        if found.is_none() {
            info!(symbol, "Symbol not found in universe");
        }
        found
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Observe snapshots. A new value is published after every applied
    /// price and every start or stop.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.transport.state()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.shared.transport.watch_state()
    }
}

impl Drop for FeedCoordinator {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.session += 1;
        state.tasks.abort_all();
        if state.running {
            state.running = false;
            self.shared.transport.close();
        }
    }
}

impl FeedShared {
    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace_securities(&self, mut securities: Vec<Security>) {
        sort_by_price(&mut securities);
        let mut state = self.lock();
        state.securities = securities;
        self.publish(&mut state);
    }

    fn publish(&self, state: &mut FeedState) {
        state.version += 1;
        self.snapshot.send_replace(FeedSnapshot {
            securities: state.securities.clone(),
            running: state.running,
            version: state.version,
        });
    }

    /// Send one candidate price per security. Returns false once `session`
    /// is no longer current.
    fn tick(&self, session: u64) -> bool {
        let mut state = self.lock();
        if !state.running || state.session != session {
            return false;
        }

        let _span = trace_feed_tick(session).entered();
        if self.transport.state() != ConnectionState::Open {
            debug!("Transport not open; skipping tick");
            return true;
        }

        let FeedState { generator, securities, .. } = &mut *state;
        let events = generator.generate(securities);
        for event in &events {
            self.transport.send(event);
        }

        FEED_TICKS.inc();
        debug!(sent = events.len(), "Tick sent");
        true
    }

    /// Apply one inbound event. Unknown symbols are dropped.
    fn apply(&self, session: u64, event: PriceEvent) {
        let mut state = self.lock();
        if !state.running || state.session != session {
            debug!(symbol = %event.symbol, "Discarding event from stopped session");
            return;
        }

        let Some(security) = state.securities.iter_mut().find(|s| s.symbol() == event.symbol) else {
            UNKNOWN_SYMBOL_DROPS.inc();
            debug!(symbol = %event.symbol, "Dropping event for unknown symbol");
            return;
        };

        security.apply_price(event.price);
        PRICE_EVENTS_APPLIED.inc();
        sort_by_price(&mut state.securities);
        self.publish(&mut state);
    }
}

fn sort_by_price(securities: &mut [Security]) {
    securities.sort_by(|a, b| b.current_price().total_cmp(&a.current_price()));
}

async fn inbound_loop(shared: Arc<FeedShared>, mut inbound: broadcast::Receiver<PriceEvent>, session: u64) {
    loop {
        match inbound.recv().await {
            Ok(event) => shared.apply(session, event),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Inbound price events lagged; oldest were dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn generator_loop(shared: Arc<FeedShared>, period: Duration, session: u64) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !shared.tick(session) {
            break;
        }
    }
}

//! Stream client: owner of the single feed connection
//!
//! Every mutation of the active session, the ping counter and the epoch
//! happens under `ClientState`'s mutex, which is never held across an
//! await. Background tasks report back with the epoch they were spawned
//! for, and anything carrying a stale epoch is ignored.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use super::liveness::{self, LivenessMonitor, ProbeDecision};
use super::session::{self, Session, SessionPhase};
use crate::config::Config;
use crate::decoder::Payload;
use crate::metrics::FeedMetrics;
use crate::store::{ConnectionState, PriceStore};

/// Generation number of one connection's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Epoch(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ClientState {
    last_epoch: Epoch,
    session: Option<Session>,
    liveness: LivenessMonitor,
}

impl ClientState {
    /// Session for `epoch`, if that epoch is still the live one
    fn session_for(&mut self, epoch: Epoch) -> Option<&mut Session> {
        self.session.as_mut().filter(|s| s.epoch == epoch)
    }
}

struct Inner {
    config: Arc<Config>,
    feed_url: String,
    prices: PriceStore,
    connection: ConnectionState,
    metrics: FeedMetrics,
    state: Mutex<ClientState>,
}

/// Streaming client for the price feed
///
/// Clones share the same connection and state.
#[derive(Clone)]
pub struct StreamClient {
    inner: Arc<Inner>,
}

impl StreamClient {
    /// Create a disconnected client publishing into `prices` and `connection`
    pub fn new(
        config: Arc<Config>,
        prices: PriceStore,
        connection: ConnectionState,
        metrics: FeedMetrics,
    ) -> Self {
        let feed_url = config.feed_url();
        let liveness = LivenessMonitor::new(config.max_ping_attempts);
        Self {
            inner: Arc::new(Inner {
                config,
                feed_url,
                prices,
                connection,
                metrics,
                state: Mutex::new(ClientState {
                    last_epoch: Epoch(0),
                    session: None,
                    liveness,
                }),
            }),
        }
    }

    /// Open a connection unless one is already active.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut state = self.inner.state.lock();
        if let Some(session) = &state.session {
            debug!(epoch = %session.epoch, "Already connected, ignoring connect");
            return;
        }
        self.start_session(&mut state);
    }

    /// Tear down the active connection, if any, and publish `false`
    pub fn disconnect(&self) {
        let mut state = self.inner.state.lock();
        self.teardown(&mut state);
    }

    /// Tear down and immediately open a fresh connection epoch
    pub fn reconnect(&self) {
        let mut state = self.inner.state.lock();
        self.teardown(&mut state);
        self.start_session(&mut state);
    }

    pub fn prices(&self) -> &PriceStore {
        &self.inner.prices
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.inner.connection
    }

    pub fn metrics(&self) -> &FeedMetrics {
        &self.inner.metrics
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn feed_url(&self) -> &str {
        &self.inner.feed_url
    }

    /// Whether a connection handle exists (connecting, open, or failed but
    /// not yet torn down)
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().session.is_some()
    }

    /// Epoch of the active connection
    pub fn current_epoch(&self) -> Option<Epoch> {
        self.inner.state.lock().session.as_ref().map(|s| s.epoch)
    }

    /// Unanswered liveness probes on the active connection
    pub fn ping_attempts(&self) -> u32 {
        self.inner.state.lock().liveness.attempts()
    }

    fn start_session(&self, state: &mut ClientState) {
        let epoch = state.last_epoch.next();
        state.last_epoch = epoch;
        state.liveness.reset();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let io_task = tokio::spawn(session::run(
            self.clone(),
            epoch,
            self.inner.feed_url.clone(),
            outbound_rx,
        ));
        let liveness_task = tokio::spawn(liveness::run(
            self.clone(),
            epoch,
            self.inner.config.ping_interval(),
        ));

        state.session = Some(Session::new(epoch, outbound_tx, io_task, liveness_task));
        self.inner.metrics.sessions_started.inc();
        info!(%epoch, "Connection epoch started");
    }

    fn teardown(&self, state: &mut ClientState) {
        if let Some(session) = state.session.take() {
            info!(epoch = %session.epoch, "Clearing connection");
            session.abort();
        }
        state.liveness.reset();
        self.set_connected(false);
    }

    fn set_connected(&self, connected: bool) {
        self.inner.connection.set(connected);
        self.inner.metrics.connected.set(i64::from(connected));
    }

    pub(crate) fn on_opened(&self, epoch: Epoch) {
        let mut state = self.inner.state.lock();
        if let Some(session) = state.session_for(epoch) {
            session.phase = SessionPhase::Open;
            self.set_connected(true);
        }
    }

    pub(crate) fn on_closed(&self, epoch: Epoch) {
        let mut state = self.inner.state.lock();
        if let Some(session) = state.session_for(epoch) {
            session.phase = SessionPhase::Closed;
            self.set_connected(false);
        }
    }

    pub(crate) fn on_payload(&self, epoch: Epoch, payload: Payload<'_>) {
        let update = match payload.decode() {
            Ok(update) => update,
            Err(e) => {
                warn!(%epoch, error = %e, "Dropping malformed message");
                self.inner.metrics.decode_errors.inc();
                return;
            }
        };

        let mut state = self.inner.state.lock();
        if state.session_for(epoch).is_none() {
            debug!(%epoch, "Ignoring message from stale connection");
            return;
        }
        self.inner.metrics.messages_received.inc();
        self.inner.prices.merge(update);
    }

    pub(crate) fn on_probe_ack(&self, epoch: Epoch) {
        let mut state = self.inner.state.lock();
        if state.session_for(epoch).is_some() {
            state.liveness.acknowledge();
        }
    }

    pub(crate) fn on_probe_failed(&self, epoch: Epoch) {
        let mut state = self.inner.state.lock();
        if state.session_for(epoch).is_some() {
            self.inner.metrics.probe_failures.inc();
        }
    }

    /// Run one liveness tick for `epoch`. Returns false once the timer for
    /// that epoch should stop.
    pub(crate) fn probe_tick(&self, epoch: Epoch) -> bool {
        let mut state = self.inner.state.lock();
        let alive = match state.session_for(epoch) {
            Some(session) => session.phase != SessionPhase::Closed,
            None => return false,
        };

        match state.liveness.on_tick(alive) {
            ProbeDecision::Probe { attempt } => {
                debug!(%epoch, attempt, "Sending liveness probe");
                self.inner.metrics.probes_sent.inc();
                let sent = state
                    .session_for(epoch)
                    .map(|s| s.outbound.send(Message::Ping(Vec::new())).is_ok())
                    .unwrap_or(false);
                if !sent {
                    self.inner.metrics.probe_failures.inc();
                }
                true
            }
            ProbeDecision::Reconnect => {
                warn!(
                    %epoch,
                    transport_alive = alive,
                    attempts = state.liveness.attempts(),
                    "Connection not responding, reconnecting"
                );
                self.inner.metrics.reconnects.inc();
                self.teardown(&mut state);
                self.start_session(&mut state);
                false
            }
        }
    }
}

impl fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamClient")
            .field("feed_url", &self.inner.feed_url)
            .field("epoch", &self.current_epoch())
            .field("connected", &self.inner.connection.current())
            .finish()
    }
}

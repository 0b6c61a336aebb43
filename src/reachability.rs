//! Network reachability handling
//!
//! `ReachabilityWatcher` turns path status updates into connect and
//! disconnect calls, independent of the feed's own failure detection.
//! `PathMonitor` is the default status source: it periodically dials the
//! feed host over TCP.

use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::websocket::StreamClient;

/// Whether the network path to the feed is usable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Satisfied,
    Unsatisfied,
}

/// Connection operations the watcher drives. None of them may block.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionControl: Send + Sync + 'static {
    fn connect(&self);
    fn disconnect(&self);
    fn is_active(&self) -> bool;
}

impl ConnectionControl for StreamClient {
    fn connect(&self) {
        StreamClient::connect(self)
    }

    fn disconnect(&self) {
        StreamClient::disconnect(self)
    }

    fn is_active(&self) -> bool {
        StreamClient::is_active(self)
    }
}

/// Reacts to path status updates arriving on a single channel
pub struct ReachabilityWatcher<C> {
    control: C,
    updates: mpsc::Receiver<PathStatus>,
}

impl<C: ConnectionControl> ReachabilityWatcher<C> {
    pub fn new(control: C, updates: mpsc::Receiver<PathStatus>) -> Self {
        Self { control, updates }
    }

    /// Apply one status update
    pub fn handle(&self, status: PathStatus) {
        match status {
            PathStatus::Satisfied => {
                if !self.control.is_active() {
                    info!("Network reachable, connecting");
                    self.control.connect();
                }
            }
            PathStatus::Unsatisfied => {
                info!("Network unreachable, disconnecting");
                self.control.disconnect();
            }
        }
    }

    /// Process updates until every sender is gone
    pub async fn run(mut self) {
        while let Some(status) = self.updates.recv().await {
            debug!(?status, "Path status update");
            self.handle(status);
        }
        debug!("Path status channel closed, reachability watcher exiting");
    }

    /// Spawn `run` on the runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Periodic TCP reachability check against the feed host
#[derive(Debug, Clone)]
pub struct PathMonitor {
    target: String,
    period: Duration,
    connect_timeout: Duration,
}

impl PathMonitor {
    pub fn new(target: impl Into<String>, period: Duration, connect_timeout: Duration) -> Self {
        Self {
            target: target.into(),
            period,
            connect_timeout,
        }
    }

    /// Monitor the host and port of the configured feed endpoint
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.path_check_target()?,
            config.path_check_interval(),
            config.path_check_timeout(),
        ))
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Dial the target once
    pub async fn check(&self) -> PathStatus {
        match timeout(self.connect_timeout, TcpStream::connect(&self.target)).await {
            Ok(Ok(_)) => PathStatus::Satisfied,
            Ok(Err(e)) => {
                debug!(target = %self.target, error = %e, "Path check failed");
                PathStatus::Unsatisfied
            }
            Err(_) => {
                debug!(target = %self.target, "Path check timed out");
                PathStatus::Unsatisfied
            }
        }
    }

    /// Emit the first status and every change after it into `tx`
    pub async fn run(self, tx: mpsc::Sender<PathStatus>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<PathStatus> = None;

        loop {
            ticker.tick().await;
            let status = self.check().await;
            if last == Some(status) {
                continue;
            }
            if last.is_some() {
                warn!(target = %self.target, ?status, "Network path changed");
            }
            last = Some(status);
            if tx.send(status).await.is_err() {
                debug!("Path status receiver dropped, path monitor exiting");
                return;
            }
        }
    }

    /// Start monitoring; returns the status channel the watcher consumes
    pub fn spawn(self) -> (mpsc::Receiver<PathStatus>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }
}

//! Liveness probing for the active feed connection
//!
//! A closed socket is not always reported promptly; the transport may take
//! anywhere from 30 seconds to two minutes to notice a dead network. The
//! monitor bounds the number of unanswered pings instead and asks for a
//! reconnect once the budget is spent.

use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use super::{Epoch, StreamClient};

/// Outcome of one probe tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeDecision {
    /// Send a ping; `attempt` is the number of unanswered pings including this one
    Probe { attempt: u32 },
    /// Transport is dead or the ping budget is spent
    Reconnect,
}

/// Unanswered-ping bookkeeping for one connection epoch
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    attempts: u32,
    max_attempts: u32,
}

impl LivenessMonitor {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
        }
    }

    /// Decide what to do when the probe timer fires
    pub fn on_tick(&mut self, transport_alive: bool) -> ProbeDecision {
        if transport_alive && self.attempts < self.max_attempts {
            self.attempts += 1;
            ProbeDecision::Probe {
                attempt: self.attempts,
            }
        } else {
            ProbeDecision::Reconnect
        }
    }

    /// A pong arrived for the current epoch
    pub fn acknowledge(&mut self) {
        self.attempts = 0;
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Probe timer for one epoch. Exits once the epoch is stale or a reconnect
/// has been issued.
pub(crate) async fn run(client: StreamClient, epoch: Epoch, interval: Duration) {
    loop {
        sleep(interval).await;
        if !client.probe_tick(epoch) {
            debug!(%epoch, "Liveness timer stopped");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnects_after_max_unanswered_probes() {
        let mut monitor = LivenessMonitor::new(2);

        assert_eq!(monitor.on_tick(true), ProbeDecision::Probe { attempt: 1 });
        assert_eq!(monitor.on_tick(true), ProbeDecision::Probe { attempt: 2 });
        assert_eq!(monitor.on_tick(true), ProbeDecision::Reconnect);
        assert_eq!(monitor.attempts(), 2);
    }

    #[test]
    fn test_acknowledgement_resets_attempts() {
        let mut monitor = LivenessMonitor::new(2);

        monitor.on_tick(true);
        monitor.on_tick(true);
        monitor.acknowledge();
        assert_eq!(monitor.attempts(), 0);

        assert_eq!(monitor.on_tick(true), ProbeDecision::Probe { attempt: 1 });
        monitor.acknowledge();
        assert_eq!(monitor.on_tick(true), ProbeDecision::Probe { attempt: 1 });
    }

    #[test]
    fn test_dead_transport_reconnects_immediately() {
        let mut monitor = LivenessMonitor::new(2);
        assert_eq!(monitor.on_tick(false), ProbeDecision::Reconnect);
        assert_eq!(monitor.attempts(), 0);
    }

    #[test]
    fn test_reset() {
        let mut monitor = LivenessMonitor::new(3);
        monitor.on_tick(true);
        monitor.reset();
        assert_eq!(monitor.attempts(), 0);
        assert_eq!(monitor.max_attempts(), 3);
    }
}

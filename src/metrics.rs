//! Prometheus collectors for the feed client

use prometheus::{IntCounter, IntGauge, Registry};

use crate::error::Result;

/// Counters and gauges describing feed traffic and connection health
#[derive(Debug, Clone)]
pub struct FeedMetrics {
    pub messages_received: IntCounter,
    pub decode_errors: IntCounter,
    pub probes_sent: IntCounter,
    pub probe_failures: IntCounter,
    pub reconnects: IntCounter,
    pub sessions_started: IntCounter,
    pub connected: IntGauge,
}

impl FeedMetrics {
    /// Create the collectors without registering them
    pub fn new() -> Result<Self> {
        Ok(Self {
            messages_received: IntCounter::new(
                "feed_messages_received_total",
                "Data frames received from the price feed",
            )?,
            decode_errors: IntCounter::new(
                "feed_decode_errors_total",
                "Feed messages dropped because they could not be decoded",
            )?,
            probes_sent: IntCounter::new(
                "feed_liveness_probes_total",
                "Liveness pings sent to the feed",
            )?,
            probe_failures: IntCounter::new(
                "feed_liveness_probe_failures_total",
                "Liveness pings that could not be written",
            )?,
            reconnects: IntCounter::new(
                "feed_reconnects_total",
                "Reconnections forced by the liveness monitor",
            )?,
            sessions_started: IntCounter::new(
                "feed_sessions_started_total",
                "Connection epochs started",
            )?,
            connected: IntGauge::new("feed_connected", "1 while the feed connection is open")?,
        })
    }

    /// Create the collectors and register them in `registry`
    pub fn register(registry: &Registry) -> Result<Self> {
        let metrics = Self::new()?;
        registry.register(Box::new(metrics.messages_received.clone()))?;
        registry.register(Box::new(metrics.decode_errors.clone()))?;
        registry.register(Box::new(metrics.probes_sent.clone()))?;
        registry.register(Box::new(metrics.probe_failures.clone()))?;
        registry.register(Box::new(metrics.reconnects.clone()))?;
        registry.register(Box::new(metrics.sessions_started.clone()))?;
        registry.register(Box::new(metrics.connected.clone()))?;
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_exposes_all_collectors() {
        let registry = Registry::new();
        let metrics = FeedMetrics::register(&registry).unwrap();
        metrics.messages_received.inc();
        metrics.connected.set(1);

        let families = registry.gather();
        assert_eq!(families.len(), 7);
        assert!(families
            .iter()
            .any(|f| f.get_name() == "feed_messages_received_total"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        FeedMetrics::register(&registry).unwrap();
        assert!(FeedMetrics::register(&registry).is_err());
    }
}

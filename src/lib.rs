//! CrypTraces price feed client
//!
//! This crate keeps a persistent WebSocket connection to the CoinCap price
//! feed, maintains the latest price per tracked asset, and publishes that
//! snapshot together with the connection state for consumers.

pub mod config;
pub mod decoder;
pub mod error;
pub mod metrics;
pub mod reachability;
pub mod store;
pub mod websocket;

pub use config::Config;
pub use decoder::{decode, Payload};
pub use error::{FeedError, Result};
pub use metrics::FeedMetrics;
pub use reachability::{ConnectionControl, PathMonitor, PathStatus, ReachabilityWatcher};
pub use store::{ConnectionState, PriceRecord, PriceStore, PriceUpdate, Symbol};
pub use websocket::{Epoch, LivenessMonitor, StreamClient};

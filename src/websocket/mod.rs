//! WebSocket module for the price feed connection

mod liveness;
mod manager;
mod session;

pub use liveness::{LivenessMonitor, ProbeDecision};
pub use manager::{Epoch, StreamClient};
pub use session::SessionPhase;

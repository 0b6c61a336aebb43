//! Published client state
//!
//! Holds the latest price per symbol and the connection signal. Both are
//! cheap-to-clone handles over `tokio::sync::watch` channels, so consumers
//! can read the current value or subscribe to changes.

mod connection;
mod prices;

pub use connection::ConnectionState;
pub use prices::PriceStore;

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

/// Identifier of a tracked asset, e.g. `bitcoin`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Latest known price of one symbol
///
/// Records are replaced wholesale on update, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub display_name: String,
    pub value: f64,
}

impl PriceRecord {
    pub fn new(display_name: impl Into<String>, value: f64) -> Self {
        Self {
            display_name: display_name.into(),
            value,
        }
    }
}

/// Prices decoded from one feed message, or a full store snapshot
pub type PriceUpdate = HashMap<Symbol, PriceRecord>;

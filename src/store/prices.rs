//! Latest price per symbol
//!
//! Merges run inside the watch channel's write lock, so readers observe
//! either the whole update or none of it.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

use super::{PriceRecord, PriceUpdate, Symbol};

/// Thread-safe store of the last reported price for every symbol
#[derive(Debug, Clone)]
pub struct PriceStore {
    tx: Arc<watch::Sender<PriceUpdate>>,
}

impl PriceStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PriceUpdate::new());
        Self { tx: Arc::new(tx) }
    }

    /// Insert or replace every record in `update`; other symbols are kept.
    ///
    /// Returns true when at least one record changed, which is also the only
    /// case in which subscribers are notified.
    pub fn merge(&self, update: PriceUpdate) -> bool {
        if update.is_empty() {
            return false;
        }

        self.tx.send_if_modified(|prices| {
            let mut changed = false;
            for (symbol, record) in update {
                if prices.get(&symbol) == Some(&record) {
                    continue;
                }
                trace!(symbol = %symbol, value = record.value, "Price updated");
                prices.insert(symbol, record);
                changed = true;
            }
            changed
        })
    }

    /// Consistent copy of the store at the time of the call
    pub fn snapshot(&self) -> PriceUpdate {
        self.tx.borrow().clone()
    }

    pub fn get(&self, symbol: &str) -> Option<PriceRecord> {
        self.tx.borrow().get(symbol).cloned()
    }

    /// Symbols reported so far, sorted
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.tx.borrow().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Change stream; the receiver can also read the current snapshot
    pub fn subscribe(&self) -> watch::Receiver<PriceUpdate> {
        self.tx.subscribe()
    }
}

impl Default for PriceStore {
    fn default() -> Self {
        Self::new()
    }
}

//! Decoder for price feed messages
//!
//! The feed pushes flat JSON objects mapping asset ids to price strings,
//! e.g. `{"bitcoin":"61234.50","ethereum":"3021.10"}`, as text or binary
//! frames.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{FeedError, Result};
use crate::store::{PriceRecord, PriceUpdate, Symbol};

/// Raw inbound frame body
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
}

impl<'a> Payload<'a> {
    /// Decode this frame into prices. Binary frames are read as UTF-8 text first.
    pub fn decode(self) -> Result<PriceUpdate> {
        match self {
            Payload::Text(text) => decode(text),
            Payload::Binary(bytes) => decode(std::str::from_utf8(bytes)?),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct PriceMessage(HashMap<String, String>);

/// Decode one feed message.
///
/// A malformed message is a [`FeedError::Decode`]. A price that is not a
/// number does not fail the message; it is recorded as `0.0`.
pub fn decode(raw: &str) -> Result<PriceUpdate> {
    let PriceMessage(prices) =
        serde_json::from_str(raw).map_err(|e| FeedError::Decode(e.to_string()))?;

    Ok(prices
        .into_iter()
        .map(|(id, raw_value)| {
            let value = parse_price(&id, &raw_value).unwrap_or_else(|e| {
                debug!(error = %e, "Substituting 0.0 for invalid price");
                0.0
            });
            let record = PriceRecord::new(capitalize(&id), value);
            (Symbol::new(id), record)
        })
        .collect())
}

fn parse_price(symbol: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>().map_err(|_| FeedError::ValueParse {
        symbol: symbol.to_string(),
        raw: raw.to_string(),
    })
}

/// Upper-case the first letter of each whitespace separated word and
/// lower-case the rest (`bitcoin` -> `Bitcoin`, `usd-coin` -> `Usd-coin`).
pub fn capitalize(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut word_start = true;
    for c in id.chars() {
        if c.is_whitespace() {
            word_start = true;
            out.push(c);
        } else if word_start {
            word_start = false;
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

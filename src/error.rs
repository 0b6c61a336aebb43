//! Error types for the price feed client

use thiserror::Error;

/// Price feed client errors
///
/// None of these are fatal to the process. Decode and value errors drop or
/// patch a single message, probe errors are counted, and transport errors
/// end the current connection epoch.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to decode message: {0}")]
    Decode(String),

    #[error("Invalid price for {symbol}: {raw:?}")]
    ValueParse { symbol: String, raw: String },

    #[error("Liveness probe failed: {0}")]
    Probe(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}

impl From<std::str::Utf8Error> for FeedError {
    fn from(err: std::str::Utf8Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for FeedError {
    fn from(err: url::ParseError) -> Self {
        FeedError::Config(err.to_string())
    }
}

impl From<prometheus::Error> for FeedError {
    fn from(err: prometheus::Error) -> Self {
        FeedError::Metrics(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

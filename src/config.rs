//! Configuration module for the price feed client

use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{FeedError, Result};
use crate::store::Symbol;

const DEFAULT_SYMBOLS: &str = "bitcoin,ethereum,monero,litecoin,dogecoin";
const DEFAULT_WS_ENDPOINT: &str = "wss://ws.coincap.io";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Tracked assets, in subscription order (e.g., ["bitcoin", "ethereum"])
    pub symbols: Vec<Symbol>,

    /// WebSocket base endpoint of the price feed
    pub ws_endpoint: String,

    /// Liveness probe settings
    pub ping_interval_ms: u64,
    pub max_ping_attempts: u32,

    /// Network path monitor settings
    pub path_check_interval_ms: u64,
    pub path_check_timeout_ms: u64,

    /// Port for the health/metrics HTTP server
    pub health_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            symbols: parse_symbols(
                &env::var("SYMBOLS").unwrap_or_else(|_| DEFAULT_SYMBOLS.to_string()),
            ),
            ws_endpoint: env::var("WS_ENDPOINT").unwrap_or(defaults.ws_endpoint),
            ping_interval_ms: env_or("PING_INTERVAL_MS", defaults.ping_interval_ms),
            max_ping_attempts: env_or("MAX_PING_ATTEMPTS", defaults.max_ping_attempts),
            path_check_interval_ms: env_or(
                "PATH_CHECK_INTERVAL_MS",
                defaults.path_check_interval_ms,
            ),
            path_check_timeout_ms: env_or("PATH_CHECK_TIMEOUT_MS", defaults.path_check_timeout_ms),
            health_port: env_or("HEALTH_PORT", defaults.health_port),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the client cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(FeedError::Config("no symbols configured".to_string()));
        }
        self.endpoint_url()?;
        if self.max_ping_attempts == 0 {
            return Err(FeedError::Config(
                "MAX_PING_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        if self.ping_interval_ms == 0 || self.path_check_interval_ms == 0 {
            return Err(FeedError::Config("intervals must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Parsed feed endpoint. Only `ws` and `wss` URLs with a host are accepted.
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.ws_endpoint)?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(FeedError::Config(format!(
                    "unsupported endpoint scheme: {}",
                    other
                )))
            }
        }
        if url.host_str().is_none() {
            return Err(FeedError::Config(format!(
                "endpoint has no host: {}",
                self.ws_endpoint
            )));
        }
        Ok(url)
    }

    /// Subscription URL for every configured symbol, in configuration order
    pub fn feed_url(&self) -> String {
        let assets = self
            .symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/prices?assets={}",
            self.ws_endpoint.trim_end_matches('/'),
            assets
        )
    }

    /// `host:port` the path monitor dials to decide reachability
    pub fn path_check_target(&self) -> Result<String> {
        let url = self.endpoint_url()?;
        let host = url
            .host_str()
            .ok_or_else(|| FeedError::Config("endpoint has no host".to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| FeedError::Config("endpoint has no port".to_string()))?;
        Ok(format!("{}:{}", host, port))
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn path_check_interval(&self) -> Duration {
        Duration::from_millis(self.path_check_interval_ms)
    }

    pub fn path_check_timeout(&self) -> Duration {
        Duration::from_millis(self.path_check_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: parse_symbols(DEFAULT_SYMBOLS),
            ws_endpoint: DEFAULT_WS_ENDPOINT.to_string(),
            ping_interval_ms: 5000,
            max_ping_attempts: 2,
            path_check_interval_ms: 3000,
            path_check_timeout_ms: 2000,
            health_port: 9090,
        }
    }
}

/// Split a comma separated list into symbols, keeping the first occurrence order
pub fn parse_symbols(raw: &str) -> Vec<Symbol> {
    let mut symbols: Vec<Symbol> = Vec::new();
    for part in raw.split(',') {
        let part = part.trim().to_lowercase();
        if part.is_empty() {
            continue;
        }
        let symbol = Symbol::new(part);
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_url_joins_symbols_in_order() {
        let config = Config {
            symbols: parse_symbols("bitcoin,ethereum,monero"),
            ..Default::default()
        };
        assert_eq!(
            config.feed_url(),
            "wss://ws.coincap.io/prices?assets=bitcoin,ethereum,monero"
        );
    }

    #[test]
    fn test_feed_url_trims_trailing_slash() {
        let config = Config {
            symbols: parse_symbols("bitcoin"),
            ws_endpoint: "ws://127.0.0.1:9000/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.feed_url(), "ws://127.0.0.1:9000/prices?assets=bitcoin");
    }

    #[test]
    fn test_parse_symbols_normalizes_and_dedups() {
        let symbols = parse_symbols(" Bitcoin, ethereum,,bitcoin ,DOGECOIN");
        let names: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
        assert_eq!(names, vec!["bitcoin", "ethereum", "dogecoin"]);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.symbols.len(), 5);
        assert_eq!(config.max_ping_attempts, 2);
        assert_eq!(config.ping_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let config = Config {
            ws_endpoint: "https://ws.coincap.io".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(FeedError::Config(_))));

        let config = Config {
            ws_endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(FeedError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_symbols_and_zero_attempts() {
        let config = Config {
            symbols: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_ping_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_path_check_target_uses_default_port() {
        let config = Config::default();
        assert_eq!(config.path_check_target().unwrap(), "ws.coincap.io:443");

        let config = Config {
            ws_endpoint: "ws://127.0.0.1:8081".to_string(),
            ..Default::default()
        };
        assert_eq!(config.path_check_target().unwrap(), "127.0.0.1:8081");
    }
}

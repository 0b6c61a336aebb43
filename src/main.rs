//! CrypTraces price feed daemon
//!
//! Streams CoinCap prices, keeps the connection alive across network
//! changes, and serves the current snapshot for local consumers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use prometheus::{Encoder, Registry, TextEncoder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cryptraces_feed::{
    Config, ConnectionState, FeedMetrics, PathMonitor, PriceStore, ReachabilityWatcher,
    StreamClient, Symbol,
};

/// Application state shared with the HTTP handlers
#[derive(Clone)]
struct AppState {
    client: StreamClient,
    registry: Registry,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting CrypTraces price feed");

    let config = Arc::new(Config::load()?);
    info!(symbols = ?config.symbols, endpoint = %config.ws_endpoint, "Configuration loaded");

    let registry = Registry::new();
    let metrics = FeedMetrics::register(&registry)?;

    let client = StreamClient::new(
        config.clone(),
        PriceStore::new(),
        ConnectionState::new(),
        metrics,
    );
    client.connect();

    // Network path changes drive connect/disconnect
    let (path_updates, _monitor) = PathMonitor::from_config(&config)?.spawn();
    let _watcher = ReachabilityWatcher::new(client.clone(), path_updates).spawn();

    tokio::spawn(log_status(client.clone(), config.symbols.clone()));

    let state = AppState {
        client: client.clone(),
        registry,
    };
    let port = config.health_port;
    tokio::spawn(async move {
        if let Err(e) = start_health_server(state, port).await {
            warn!(error = %e, "Health server error");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    client.disconnect();

    Ok(())
}

/// Follow the published state and log what a status display would show
async fn log_status(client: StreamClient, symbols: Vec<Symbol>) {
    let mut prices = client.prices().subscribe();
    let mut connection = client.connection_state().subscribe();

    loop {
        tokio::select! {
            changed = prices.changed() => if changed.is_err() { return },
            changed = connection.changed() => if changed.is_err() { return },
        }

        let connected = *connection.borrow_and_update();
        let snapshot = prices.borrow_and_update().clone();
        if !connected {
            info!("Price feed offline");
            continue;
        }
        for symbol in &symbols {
            match snapshot.get(symbol) {
                Some(record) => info!(
                    symbol = %symbol,
                    name = %record.display_name,
                    value = record.value,
                    "Price"
                ),
                None => info!(symbol = %symbol, "Updating..."),
            }
        }
    }
}

/// Start HTTP server for health checks, snapshot and metrics
async fn start_health_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/prices", get(prices))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "Starting health check server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let connected = state.client.connection_state().current();
    Json(serde_json::json!({
        "status": if connected { "healthy" } else { "degraded" },
        "component": "price-feed",
        "connected": connected,
        "epoch": state.client.current_epoch().map(|e| e.value()),
        "ping_attempts": state.client.ping_attempts(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn prices(State(state): State<AppState>) -> Json<cryptraces_feed::PriceUpdate> {
    Json(state.client.prices().snapshot())
}

async fn metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

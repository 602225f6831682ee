//! Backend for a lemonade stand loyalty card.
//!
//! Customers collect stamps (max 10) and points for purchases, then trade a
//! full enough card for free drinks or spend points on catalog rewards.
//! Workers unlock a shared PIN, look customers up by their 4-digit client id
//! (typed in or scanned from the customer's QR pass), and grant stamps and
//! points.
//!
//!
//!
//! # General Infrastructure
//!
//! - Customer and worker devices talk to this server over HTTP
//! - Every card lives in Redis; a presence room mirrors the public slice of
//!   each card so any device converges on the same counts
//! - Server instances subscribe to room changes, so a worker's grant on one
//!   instance is visible to a customer polling another
//! - Stamp redemptions are cooldown-gated; the gate is a pure time predicate
//!   evaluated on each request, never a scheduled task
//!
//!
//!
//! # Environment
//!
//! - `RUST_PORT`: listen port (default 1111)
//! - `REDIS_URL`: Redis endpoint (default `redis://127.0.0.1:6379`)
//! - `PUBLIC_URL`: base URL embedded in customer QR passes
//! - `CATALOG_PATH` / `CATALOG_URL`: reward catalog JSON, local or fetched;
//!   falls back to the built-in catalog
//! - `REDEEM_COOLDOWN_MS`: overrides the catalog's redemption cooldown
//! - `/run/secrets/WORKER_PIN`: the shared worker PIN
//!
//!
//!
//! # Notes
//!
//! ## Redis as the single store
//!
//! Cards are tiny JSON blobs and every operation is a single-key read or
//! write, so an in-memory database with O(1) hash lookups covers both the
//! authoritative cards and the presence room without a second system.
//! Two devices writing the same client concurrently resolve to whichever
//! write Redis applies last; counts are never merged.

use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, HeaderName, Method},
    routing::{get, post},
    Router,
};
use tokio::{
    net::TcpListener,
    signal::{self, unix::SignalKind},
};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod database;
pub mod error;
pub mod presence;
pub mod routes;
pub mod state;
pub mod worker;

use routes::{
    card_handler, catalog_handler, pass_handler, redeem_handler, redeem_points_handler,
    register_handler, worker_login_handler, worker_logout_handler, worker_lookup_handler,
    worker_points_handler, worker_stamp_handler, WORKER_TOKEN_HEADER,
};
use state::State;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(WORKER_TOKEN_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/register", post(register_handler))
        .route("/catalog", get(catalog_handler))
        .route("/card/{client_id}", get(card_handler))
        .route("/card/{client_id}/redeem", post(redeem_handler))
        .route("/card/{client_id}/redeem-points", post(redeem_points_handler))
        .route("/card/{client_id}/pass", get(pass_handler))
        .route("/worker/login", post(worker_login_handler))
        .route("/worker/logout", post(worker_logout_handler))
        .route("/worker/clients/{client_id}", get(worker_lookup_handler))
        .route("/worker/clients/{client_id}/stamp", post(worker_stamp_handler))
        .route("/worker/clients/{client_id}/points", post(worker_points_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

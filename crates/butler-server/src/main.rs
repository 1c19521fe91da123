//! Redis Butler Server
//!
//! Web console for inspecting and mutating data across several named Redis
//! deployments ("environments"). One connection per environment is opened on
//! first use and kept until shutdown.

mod config;
mod extractors;
mod handlers;
mod services;
mod storage;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Settings;
use crate::services::{ConnectionCache, KeyService};
use crate::storage::RedisConnector;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<ConnectionCache>,
    pub keys: Arc<KeyService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(connections: Arc<ConnectionCache>) -> Self {
        Self {
            keys: Arc::new(KeyService::new(connections.clone())),
            connections,
            started_at: Utc::now(),
        }
    }
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting Redis Butler v{}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;
    let registry = Arc::new(settings.registry()?);
    if registry.is_empty() {
        warn!("No environments configured");
    }
    info!(
        "Config loaded: bind={}, environments={:?}",
        settings.bind_address,
        registry.names()
    );

    let connections = Arc::new(ConnectionCache::new(registry, Arc::new(RedisConnector::new())));
    let state = AppState::new(connections.clone());

    let app = router(state, settings.static_dir.as_deref());

    let addr: SocketAddr = settings
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Server listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    // Connections are released even when serving failed
    info!("Shutting down, releasing connections...");
    connections.release_all().await;

    served
}

pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/redis", api_routes());

    if let Some(dir) = static_dir {
        info!("Serving static files from {}", dir.display());
        app = app.fallback_service(
            ServeDir::new(dir).not_found_service(ServeFile::new(dir.join("index.html"))),
        );
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/environments", get(handlers::environments::list))
        .route("/test-connection", post(handlers::environments::test_connection))
        .route(
            "/key",
            get(handlers::keys::get)
                .post(handlers::keys::set)
                .delete(handlers::keys::delete),
        )
        .route("/keys", get(handlers::keys::list))
        .route("/key-info", get(handlers::keys::info))
        .route("/key-type", get(handlers::keys::key_type))
        .route("/exists", get(handlers::keys::exists))
        .route("/ttl", get(handlers::keys::ttl))
        .route("/expire", post(handlers::keys::expire))
        .route("/db-size", get(handlers::database::size))
        .route("/flush-db", post(handlers::database::flush))
        .route("/batch-delete", post(handlers::batch::delete))
        .route("/batch-expire", post(handlers::batch::expire))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

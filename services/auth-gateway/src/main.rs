//! Agent Auth Gateway
//!
//! Single-binary Rust service that:
//! 1. Runs the OAuth login flow against a GitHub-style identity provider
//! 2. Issues and validates short-lived bearer sessions
//! 3. Issues share tokens that delegate access to one agent session
//! 4. Sweeps expired sessions and shares in the background

mod auth;
mod config;
mod error;
mod metrics;
mod shares;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use session_auth::{OAuthSessionManager, RedirectPolicy, SessionSettings, StandardOAuthProvider, spawn_sweeper};
use session_share::{MemoryShareStore, ShareRegistry};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::metrics::ServiceMetrics;

/// Time allowed for in-flight requests after the shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<OAuthSessionManager>,
    pub shares: ShareRegistry,
    /// Lifetime for shares whose request names none
    pub share_default_ttl: Option<Duration>,
    pub metrics: ServiceMetrics,
    pub prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections`.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        .route("/shares", post(shares::create))
        .route(
            "/shares/{token}",
            get(shares::resolve).delete(shares::revoke),
        )
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting agent-auth-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        provider = %config.oauth.provider,
        redirect_allow_list = config.oauth.allowed_redirect_uris.len(),
        session_ttl_secs = config.sessions.ttl_secs,
        "configuration loaded"
    );

    let http_client = reqwest::Client::builder()
        .timeout(config.oauth.request_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let provider = Arc::new(StandardOAuthProvider::new(
        config.oauth.provider.clone(),
        config.oauth.endpoints(),
        http_client,
    ));
    let sessions = Arc::new(OAuthSessionManager::new(
        provider,
        RedirectPolicy::new(&config.oauth.allowed_redirect_uris),
        SessionSettings {
            ttl: config.sessions.ttl(),
            provider_timeout: config.oauth.request_timeout(),
        },
    ));
    let shares = ShareRegistry::new(Arc::new(MemoryShareStore::new()));

    // Background maintenance, stopped after the server drains
    let sweeper = spawn_sweeper(sessions.clone(), config.sessions.sweep_interval());
    let cleanup_cancel = CancellationToken::new();
    let cleanup = shares::spawn_cleanup(
        shares.clone(),
        config.shares.cleanup_interval(),
        cleanup_cancel.clone(),
    );

    let app_state = AppState {
        sessions,
        shares,
        share_default_ttl: config.shares.default_ttl(),
        metrics: ServiceMetrics::new(),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts: notify the server to drain, then race it against the timeout.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    sweeper.stop().await;
    cleanup_cancel.cancel();
    if let Err(e) = cleanup.await {
        warn!(error = %e, "share cleanup task ended abnormally");
    }

    info!("shutdown complete");
    Ok(())
}

/// Count every request for `/health` and record it in Prometheus.
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let started = Instant::now();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let response = next.run(request).await;
    metrics::record_request(
        response.status().as_u16(),
        &method,
        started.elapsed().as_secs_f64(),
    );
    response
}

/// Health endpoint: status, uptime, live sessions, requests served.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.metrics.uptime_secs(),
        "sessions_active": state.sessions.active_sessions().await,
        "requests_served": state.metrics.requests_served(),
    });
    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint: returns metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

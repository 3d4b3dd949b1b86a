//! HTTP surface for the tutoring pipeline.
//!
//! Routes:
//! - `POST /chat`   chat turn, buffered JSON or raw provider SSE
//! - `GET  /health` liveness check with the current cache size
//!
//! Every route answers CORS preflights with permissive headers.

mod handlers;

use crate::cache::CacheSweeper;
use crate::config::{Config, GatewayConfig};
use crate::pipeline::ChatPipeline;
use crate::store::SqliteTutorStore;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<ChatPipeline>) -> Self {
        Self { pipeline }
    }

    /// Open the configured store and wire a pipeline on top of it.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = SqliteTutorStore::connect(
            &config.store.database_url,
            config.store.max_connections,
        )
        .await
        .context("open tutor store")?;
        let pipeline = ChatPipeline::from_config(config, Arc::new(store));
        Ok(Self::new(Arc::new(pipeline)))
    }
}

pub fn router(state: AppState, gateway: &GatewayConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handlers::handle_chat))
        .route("/health", get(handlers::handle_health))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(gateway.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(gateway.request_timeout_secs),
        ))
        .layer(cors)
}

/// Serve until `shutdown` resolves. The cache sweeper lives exactly as long
/// as the server.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    config: &Config,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sweeper = CacheSweeper::start(
        state.pipeline.cache().clone(),
        Duration::from_secs(config.cache.sweep_interval_secs),
    );

    let app = router(state, &config.gateway);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    sweeper.stop().await;
    served.context("gateway server error")
}

/// Bind to the configured host and port and run until Ctrl+C.
pub async fn run_gateway(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    run_gateway_with_listener(listener, config).await
}

pub async fn run_gateway_with_listener(listener: TcpListener, config: Config) -> Result<()> {
    let actual_port = listener.local_addr()?.port();
    let display_addr = SocketAddr::new(
        config
            .gateway
            .host
            .parse()
            .unwrap_or_else(|_| std::net::Ipv4Addr::LOCALHOST.into()),
        actual_port,
    );

    let state = AppState::from_config(&config).await?;

    println!("{}", t!("gateway.listening", addr = display_addr));
    println!("  {}", t!("gateway.route_chat"));
    println!("  {}", t!("gateway.route_health"));
    println!("  {}\n", t!("gateway.stop_hint"));

    tracing::info!(
        addr = %display_addr,
        model = %config.tutoring.default_model,
        cache_ttl_secs = config.cache.ttl_secs,
        "Gateway started"
    );

    serve(listener, state, &config, shutdown_signal()).await?;
    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "Ctrl+C handler unavailable; serving until killed");
        std::future::pending::<()>().await;
    }
}

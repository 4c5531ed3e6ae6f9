use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use analytics_api_server::{config::Settings, handlers, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,analytics_api_server=debug".to_string()),
        )
        .with_target(true)
        .json()
        .init();

    let settings = Settings::load()?;
    info!("configuration loaded");

    let state = AppState::build(settings.clone())?;
    info!(
        tickets = state.dispatcher.health().body["totals"]["tickets"].as_u64(),
        "dataset snapshot ready"
    );

    let app = build_router(state);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    info!(%addr, "analytics engine listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/analytics/health", get(handlers::health))
        .route("/analytics/refresh", post(handlers::refresh))
        .route("/analytics/{*endpoint}", get(handlers::analytics))
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}

//! HTTP API server
//!
//! Axum-based JSON API over the research pipeline: job creation, status,
//! deletion, export, configuration catalogs and health.

pub mod auth;
pub mod export;
pub mod geo;
mod handlers;
mod types;

pub use handlers::AppState;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use auth::{auth_middleware, AuthState};

/// Create the API router with all routes.
pub fn create_router(app_state: AppState, auth_state: AuthState) -> Router {
    let api = Router::new()
        .route("/research", post(handlers::create_research))
        .route("/research/config/countries", get(handlers::list_countries))
        .route("/research/config/languages", get(handlers::list_languages))
        .route(
            "/research/:id",
            get(handlers::get_research).delete(handlers::delete_research),
        )
        .route("/research/:id/export", get(handlers::export_research))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(app_state.clone());

    Router::new()
        // Health stays outside auth so probes keep working.
        .route("/health", get(handlers::health))
        .with_state(app_state)
        .nest("/api", api)
}

/// Run the HTTP server until shutdown.
pub async fn serve(app_state: AppState, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let config = app_state.config.clone();
    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .context("Invalid listen address")?;

    let auth_state = AuthState::new(config.server.api_keys.clone());
    let mut app = create_router(app_state, auth_state);

    if config.server.cors_enabled {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
            .allow_origin(Any);
        app = app.layer(cors);
    }
    app = app.layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&addr)
        .await
        .context("Failed to bind HTTP server")?;

    info!("HTTP API server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown.recv().await;
        info!("HTTP server shutting down");
    })
    .await
    .context("HTTP server error")?;

    Ok(())
}

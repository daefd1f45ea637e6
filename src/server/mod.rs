pub mod api;

use crate::context::SharedContext;
use crate::error::Result;
use axum::{extract::FromRef, routing::get, Router};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub ctx: SharedContext,
}

impl FromRef<AppState> for SharedContext {
    fn from_ref(app_state: &AppState) -> SharedContext {
        app_state.ctx.clone()
    }
}

/// Routes of the JSON API
pub fn router(ctx: SharedContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health_handler))
        .route("/signal/{symbol}", get(api::signal_handler))
        .route("/state/{symbol}", get(api::state_handler))
        .route("/overview", get(api::overview_handler))
        .route("/price/{symbol}", get(api::price_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { ctx })
}

/// Start the axum server
pub async fn serve(ctx: SharedContext, port: u16) -> Result<()> {
    tracing::info!("Registering routes:");
    tracing::info!("  GET /health");
    tracing::info!("  GET /signal/{{symbol}}");
    tracing::info!("  GET /state/{{symbol}}");
    tracing::info!("  GET /overview");
    tracing::info!("  GET /price/{{symbol}}");

    let app = router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use analyzer::RatioEngine;
use axum::{Router, routing::get};
use database::SnapshotStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SnapshotStore>,
    pub engine: RatioEngine,
}

/// Builds the dashboard API routes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/snapshots", get(handlers::list_snapshots))
        .route("/api/snapshots/dates", get(handlers::list_dates))
        .route("/api/snapshots/latest", get(handlers::latest_snapshot))
        .route("/api/snapshots/:date", get(handlers::get_snapshot))
        .route("/api/snapshots/:date/comparison", get(handlers::compare_with_previous))
        .with_state(state)
        .layer(cors)
        // Logs every incoming request.
        .layer(TraceLayer::new_for_http())
}

/// Serves the dashboard API until the process is stopped.
/// Tracing is initialized by the binary before this is called.
pub async fn run_server(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);

    tracing::info!("Web server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

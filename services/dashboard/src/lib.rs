//! Monitoring data dashboard service.
//!
//! Stores uploaded data files and scripts, runs scripts against the data
//! as child processes, and serves table, chart and map views over HTTP.

pub mod config;
pub mod handlers;
pub mod runner;
pub mod state;
pub mod store;
pub mod tracker;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state
        .store
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        // Page
        .route("/", get(handlers::page::index_handler))
        // Data files
        .route(
            "/api/data",
            get(handlers::files::list_data_handler).post(handlers::files::upload_data_handler),
        )
        .route("/api/data/:name", delete(handlers::files::delete_data_handler))
        .route("/api/data/:name/table", get(handlers::views::table_handler))
        .route("/api/data/:name/summary", get(handlers::views::summary_handler))
        .route("/api/data/:name/chart.png", get(handlers::views::chart_handler))
        .route("/api/data/:name/sites", get(handlers::views::sites_handler))
        // Scripts
        .route(
            "/api/scripts",
            get(handlers::files::list_scripts_handler).post(handlers::files::upload_script_handler),
        )
        .route(
            "/api/scripts/:name",
            delete(handlers::files::delete_script_handler),
        )
        .route(
            "/api/scripts/:name/run",
            post(handlers::scripts::run_script_handler),
        )
        .route("/api/runs", get(runs_handler))
        .route(
            "/api/directories/validate",
            post(handlers::directories::validate_directory_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// GET /api/runs - Active and recent script runs
async fn runs_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<tracker::RunStatusResponse> {
    Json(state.tracker.status().await)
}

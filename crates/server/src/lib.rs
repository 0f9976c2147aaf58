// crates/server/src/lib.rs
//! crysta-view server library.
//!
//! The Axum HTTP API behind the Crysta IVF chatbot dashboard: lead and
//! conversation tables, aggregate statistics, reports, CSV export and a
//! process-wide sign-in gate, all read from the hosted backend through
//! `crysta-view-db`.

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::{Backend, Cli, ConfigError, ServerConfig, DEFAULT_PORT};
pub use error::*;
pub use metrics::{init_metrics, record_request, record_sync, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{middleware, Router};
use crysta_view_observability::{request_id_layers, request_span};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware, API only.
pub fn create_app(state: Arc<AppState>) -> Router {
    create_app_with_static(state, None)
}

/// Create the Axum application, optionally serving a front-end build.
///
/// Unknown paths under `static_dir` fall back to its `index.html` so the
/// single-page app can route client side.
///
/// Layers, outermost first: request id, id propagation, tracing, CORS
/// (any origin), request metrics.
pub fn create_app_with_static(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let (set_request_id, propagate_request_id) = request_id_layers();

    let mut app = api_routes(state);
    if let Some(dir) = static_dir {
        tracing::info!(dir = %dir.display(), "serving static files");
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app.layer(middleware::from_fn(metrics::track_requests))
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(propagate_request_id)
        .layer(set_request_id)
}

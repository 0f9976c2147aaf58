// crates/server/src/routes/stats.rs
//! Dashboard headline numbers.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use crysta_view_core::{DashboardOverview, GlobalStats};

use crate::error::or_default;
use crate::state::AppState;

/// GET /api/stats/dashboard - totals, rates and distributions.
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardOverview> {
    Json(or_default(
        "stats_dashboard",
        state.db.dashboard_overview(Utc::now()).await,
    ))
}

/// GET /api/stats/global - cached conversation and user totals.
pub async fn global(State(state): State<Arc<AppState>>) -> Json<GlobalStats> {
    Json(or_default("stats_global", state.db.global_stats().await))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats/dashboard", get(dashboard))
        .route("/stats/global", get(global))
}

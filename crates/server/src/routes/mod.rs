//! API route handlers for the crysta-view server.

pub mod activity;
pub mod analytics;
pub mod auth;
pub mod conversations;
pub mod export;
pub mod health;
pub mod leads;
pub mod metrics;
pub mod stats;
pub mod sync;

use std::sync::Arc;

use axum::{middleware, Router};
use crysta_view_core::LeadStatus;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Largest page a list endpoint will serve.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Highest zero-based page index a list endpoint accepts.
pub const MAX_PAGE: usize = 100_000;

/// Create the combined API router.
///
/// Routes:
/// - GET  /api/health - Health check
/// - POST /api/auth/sign-in, POST /api/auth/sign-out, GET /api/auth/me
/// - GET  /api/stats/dashboard, /api/stats/global
/// - GET  /api/analytics/{cities,lead-status,monthly,daily,hourly,engagement,overall,monthly-report}
/// - GET  /api/leads, /api/leads/cities
/// - GET  /api/conversations, /api/conversations/{session_id}/messages,
///   /api/conversations/{session_id}/lead
/// - GET  /api/activity/recent
/// - GET  /api/export/leads, /api/export/conversations - CSV downloads
/// - POST /api/sync - Drop cached aggregates
/// - GET  /metrics - Prometheus text
///
/// Everything except health, auth and metrics answers 401 while signed out.
pub fn api_routes(state: Arc<AppState>) -> Router {
    let gated = Router::new()
        .merge(stats::router())
        .merge(analytics::router())
        .merge(leads::router())
        .merge(conversations::router())
        .merge(activity::router())
        .merge(export::router())
        .merge(sync::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .nest("/api", health::router().merge(auth::router()).merge(gated))
        .merge(metrics::router())
        .with_state(state)
}

/// `all`, blank or missing means no status filter.
pub(crate) fn parse_status(raw: Option<&str>) -> ApiResult<Option<LeadStatus>> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => LeadStatus::parse(value)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown lead status `{value}`"))),
    }
}

/// `all`, blank or missing means no city filter.
pub(crate) fn parse_city(raw: Option<String>) -> Option<String> {
    raw.map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && c != "all")
}

pub(crate) fn parse_page(raw: Option<usize>) -> ApiResult<usize> {
    match raw.unwrap_or(0) {
        page if page > MAX_PAGE => Err(ApiError::BadRequest(format!(
            "page {page} is beyond the last allowed page {MAX_PAGE}"
        ))),
        page => Ok(page),
    }
}

pub(crate) fn clamp_page_size(raw: Option<usize>) -> usize {
    raw.unwrap_or(crysta_view_db::DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}

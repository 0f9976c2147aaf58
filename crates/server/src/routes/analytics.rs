// crates/server/src/routes/analytics.rs
//! Distribution and trend endpoints behind the analytics page.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use crysta_view_core::{
    CityAnalytics, DailyStats, HourlyStats, LeadStatusAnalytics, MonthlyAnalytics, MonthlyReport,
    OverallStats, UserEngagement,
};
use serde::Deserialize;

use crate::error::or_default;
use crate::state::AppState;

pub const DEFAULT_DAYS: u32 = 7;
pub const MAX_DAYS: u32 = 90;
pub const DEFAULT_MONTHS: u32 = 6;
pub const MAX_MONTHS: u32 = 24;

#[derive(Debug, Default, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthsQuery {
    pub months: Option<u32>,
}

pub async fn cities(State(state): State<Arc<AppState>>) -> Json<Vec<CityAnalytics>> {
    Json(or_default("analytics_cities", state.db.city_analytics().await))
}

pub async fn lead_status(State(state): State<Arc<AppState>>) -> Json<Vec<LeadStatusAnalytics>> {
    Json(or_default(
        "analytics_lead_status",
        state.db.lead_status_analytics().await,
    ))
}

pub async fn monthly(State(state): State<Arc<AppState>>) -> Json<Vec<MonthlyAnalytics>> {
    Json(or_default("analytics_monthly", state.db.monthly_analytics().await))
}

/// GET /api/analytics/daily?days= - one entry per day, oldest first.
pub async fn daily(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DaysQuery>,
) -> Json<Vec<DailyStats>> {
    let days = query.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);
    Json(state.db.daily_analytics(days, Utc::now()).await)
}

/// GET /api/analytics/hourly - 24 entries for the last day.
pub async fn hourly(State(state): State<Arc<AppState>>) -> Json<Vec<HourlyStats>> {
    Json(state.db.hourly_analytics(Utc::now()).await)
}

/// GET /api/analytics/engagement - messages per user, hour and day.
pub async fn engagement(State(state): State<Arc<AppState>>) -> Json<UserEngagement> {
    Json(or_default(
        "analytics_engagement",
        state.db.user_engagement(Utc::now()).await,
    ))
}

pub async fn overall(State(state): State<Arc<AppState>>) -> Json<OverallStats> {
    Json(or_default("analytics_overall", state.db.overall_stats().await))
}

/// GET /api/analytics/monthly-report?months= - calendar months, oldest first.
pub async fn monthly_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MonthsQuery>,
) -> Json<Vec<MonthlyReport>> {
    let months = query.months.unwrap_or(DEFAULT_MONTHS).clamp(1, MAX_MONTHS);
    Json(state.db.monthly_report(months, Utc::now()).await)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics/cities", get(cities))
        .route("/analytics/lead-status", get(lead_status))
        .route("/analytics/monthly", get(monthly))
        .route("/analytics/daily", get(daily))
        .route("/analytics/hourly", get(hourly))
        .route("/analytics/engagement", get(engagement))
        .route("/analytics/overall", get(overall))
        .route("/analytics/monthly-report", get(monthly_report))
}

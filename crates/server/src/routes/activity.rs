// crates/server/src/routes/activity.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use crysta_view_core::RecentActivity;
use crysta_view_db::{RECENT_CHATS_LIMIT, RECENT_LEADS_LIMIT};
use serde::Deserialize;

use crate::error::or_default;
use crate::state::AppState;

pub const MAX_ACTIVITY_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub leads: Option<usize>,
    pub chats: Option<usize>,
}

/// GET /api/activity/recent?leads=&chats= - the dashboard activity feed.
pub async fn recent(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivityQuery>,
) -> Json<RecentActivity> {
    let leads = query
        .leads
        .unwrap_or(RECENT_LEADS_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);
    let chats = query
        .chats
        .unwrap_or(RECENT_CHATS_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);
    Json(or_default(
        "activity_recent",
        state.db.recent_activity(leads, chats, Utc::now()).await,
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/activity/recent", get(recent))
}

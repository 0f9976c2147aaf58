// crates/server/src/routes/conversations.rs
//! Conversation list, search and transcripts.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use crysta_view_core::{ConversationListResponse, Lead, TranscriptMessage};
use crysta_view_db::ConversationFilters;
use serde::Deserialize;

use super::{clamp_page_size, parse_city, parse_page, parse_status};
use crate::error::{or_default, or_fallback, ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationsQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub city: Option<String>,
    pub min_messages: Option<usize>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl ConversationsQuery {
    pub fn filters(&self) -> ApiResult<ConversationFilters> {
        Ok(ConversationFilters {
            lead_status: parse_status(self.status.as_deref())?,
            city: parse_city(self.city.clone()),
            min_messages: self.min_messages,
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
        })
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// GET /api/conversations - a page of conversations. A non-blank `search`
/// also matches message text and ignores the other filters.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConversationsQuery>,
) -> ApiResult<Json<ConversationListResponse>> {
    let filters = query.filters()?;
    let page = parse_page(query.page)?;
    let page_size = clamp_page_size(query.page_size);

    let result = match query.search_term() {
        Some(term) => state.db.search_conversations(term, page, page_size).await,
        None => {
            state
                .db
                .conversation_list(page, page_size, None, &filters)
                .await
        }
    };
    Ok(Json(or_fallback(
        "conversations",
        result,
        ConversationListResponse::empty(page, page_size),
    )))
}

/// GET /api/conversations/{session_id}/messages - transcript, oldest first.
pub async fn messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<Vec<TranscriptMessage>> {
    Json(or_default(
        "conversation_messages",
        state.db.conversation_transcript(&session_id, Utc::now()).await,
    ))
}

/// GET /api/conversations/{session_id}/lead - the lead behind a session.
pub async fn lead(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Lead>> {
    state
        .db
        .conversation_lead(&session_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No lead for session {session_id}")))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", get(list))
        .route("/conversations/{session_id}/messages", get(messages))
        .route("/conversations/{session_id}/lead", get(lead))
}

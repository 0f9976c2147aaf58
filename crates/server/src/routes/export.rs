// crates/server/src/routes/export.rs
//! CSV downloads of the leads and conversations tables.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use crysta_view_core::export::{conversations_csv, leads_csv};

use super::conversations::ConversationsQuery;
use super::leads::LeadsQuery;
use crate::error::ApiResult;
use crate::state::AppState;

pub const LEADS_FILENAME: &str = "ivf_leads.csv";
pub const CONVERSATIONS_FILENAME: &str = "conversations.csv";

fn csv_attachment(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /api/export/leads - every lead matching the table filters.
/// Paging parameters are ignored.
pub async fn leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeadsQuery>,
) -> ApiResult<Response> {
    let filter = query.into_filter()?;
    let rows = state.db.export_leads(&filter).await?;
    tracing::info!(rows = rows.len(), "leads exported");
    Ok(csv_attachment(LEADS_FILENAME, leads_csv(&rows)))
}

/// GET /api/export/conversations - every conversation matching the filters.
pub async fn conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConversationsQuery>,
) -> ApiResult<Response> {
    let filters = query.filters()?;
    let rows = state
        .db
        .export_conversations(query.search_term(), &filters)
        .await?;
    tracing::info!(rows = rows.len(), "conversations exported");
    Ok(csv_attachment(
        CONVERSATIONS_FILENAME,
        conversations_csv(&rows),
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/export/leads", get(leads))
        .route("/export/conversations", get(conversations))
}

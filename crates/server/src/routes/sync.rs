// crates/server/src/routes/sync.rs
//! Manual refresh: drop cached aggregates so the next reads hit the backend.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use ts_rs::TS;

use crate::metrics::record_sync;
use crate::state::AppState;

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    #[ts(type = "number")]
    pub cleared: usize,
    pub message: String,
}

/// POST /api/sync
pub async fn sync(State(state): State<Arc<AppState>>) -> Json<SyncResponse> {
    let start = Instant::now();
    let cleared = state.db.clear_cache();
    record_sync(cleared, start.elapsed());
    Json(SyncResponse {
        cleared,
        message: format!("Cleared {cleared} cached aggregates"),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/sync", post(sync))
}

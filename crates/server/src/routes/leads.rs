// crates/server/src/routes/leads.rs
//! Paginated leads table.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use crysta_view_core::LeadsPage;
use crysta_view_db::LeadFilter;
use serde::Deserialize;

use super::{clamp_page_size, parse_city, parse_page, parse_status};
use crate::error::{or_default, or_fallback, ApiResult};
use crate::state::AppState;

/// Query string of the leads table and its CSV export.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadsQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub city: Option<String>,
}

impl LeadsQuery {
    pub fn into_filter(self) -> ApiResult<LeadFilter> {
        Ok(LeadFilter {
            page: parse_page(self.page)?,
            page_size: clamp_page_size(self.page_size),
            status: parse_status(self.status.as_deref())?,
            city: parse_city(self.city),
            search: self.search,
        })
    }
}

/// GET /api/leads - one page of leads, newest activity first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeadsQuery>,
) -> ApiResult<Json<LeadsPage>> {
    let filter = query.into_filter()?;
    let fallback = LeadsPage::empty(filter.page, filter.page_size);
    Ok(Json(or_fallback(
        "leads",
        state.db.leads_page(&filter).await,
        fallback,
    )))
}

/// GET /api/leads/cities - distinct cities for the filter dropdown.
pub async fn cities(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(or_default("leads_cities", state.db.unique_cities().await))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/leads", get(list))
        .route("/leads/cities", get(cities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crysta_view_core::LeadStatus;

    #[test]
    fn test_into_filter() {
        let filter = LeadsQuery {
            page: Some(2),
            page_size: Some(20),
            search: Some("ray".into()),
            status: Some("converted".into()),
            city: Some("all".into()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.page, 2);
        assert_eq!(filter.page_size, 20);
        assert_eq!(filter.status, Some(LeadStatus::Converted));
        assert_eq!(filter.city, None);
        assert_eq!(filter.search_term(), Some("ray"));
    }

    #[test]
    fn test_into_filter_rejects_unknown_status() {
        let query = LeadsQuery {
            status: Some("hot".into()),
            ..Default::default()
        };
        assert!(query.into_filter().is_err());
    }
}

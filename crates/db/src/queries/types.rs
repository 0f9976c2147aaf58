// crates/db/src/queries/types.rs
// Filter and parameter types shared across query modules and exported to the server crate.

use crysta_view_core::LeadStatus;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Default rows per page for lead and conversation tables.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Columns matched by the leads table search box.
pub const LEAD_SEARCH_COLUMNS: [&str; 5] = [
    "phone_number",
    "full_name",
    "user_city",
    "spouse_name",
    "preferred_center",
];

/// Columns matched by conversation search.
pub const CONVERSATION_SEARCH_COLUMNS: [&str; 3] = ["phone_number", "full_name", "user_city"];

/// Lead columns needed to build a conversation summary.
pub const CONVERSATION_LEAD_COLUMNS: &str =
    "phone_number, full_name, user_city, age, lead_status, created_at, updated_at";

/// Filters for the paginated leads table and its export.
/// Omitted fields apply no filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct LeadFilter {
    pub page: usize,
    pub page_size: usize,
    pub search: Option<String>,
    pub status: Option<LeadStatus>,
    pub city: Option<String>,
}

impl Default for LeadFilter {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
            status: None,
            city: None,
        }
    }
}

impl LeadFilter {
    pub fn search_term(&self) -> Option<&str> {
        trimmed(&self.search)
    }
}

/// Filters for the conversation list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ConversationFilters {
    pub lead_status: Option<LeadStatus>,
    pub city: Option<String>,
    /// Applied to the fetched page only; `total` still counts every lead.
    pub min_messages: Option<usize>,
    /// Inclusive lower bound on the lead's `created_at`.
    pub date_from: Option<String>,
    /// Inclusive upper bound on the lead's `created_at`.
    pub date_to: Option<String>,
}

impl ConversationFilters {
    pub fn status(status: LeadStatus) -> Self {
        Self {
            lead_status: Some(status),
            ..Default::default()
        }
    }

    pub fn city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            ..Default::default()
        }
    }
}

/// Trimmed, non-empty value of an optional text parameter.
pub(crate) fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

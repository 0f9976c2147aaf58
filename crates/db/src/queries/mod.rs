// crates/db/src/queries/mod.rs
// Aggregate, list and report queries served by the dashboard API.

mod activity;
mod analytics;
mod conversations;
mod dashboard;
mod leads;
mod reports;
mod types;

pub use activity::{RECENT_CHATS_LIMIT, RECENT_LEADS_LIMIT, RECENT_PREVIEW_CHARS};
pub use analytics::TOP_CITIES;
pub use conversations::{SessionMessageStats, SEARCH_LEAD_LIMIT, SEARCH_MESSAGE_LIMIT};
pub use dashboard::ACTIVE_CONVERSATION_MIN_MESSAGES;
pub use reports::REPORT_TOP_N;
pub use types::*;

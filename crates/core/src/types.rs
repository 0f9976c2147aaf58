// crates/core/src/types.rs
//! Row and display types for leads and chat history.
//!
//! Raw rows mirror the hosted tables (`users`, `n8n_chat_histories`) and are
//! deliberately lenient: every optional column defaults when it is missing,
//! so a partial `select` decodes into the same struct.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::transform::ExtractedLeadData;

/// Decode an optional integer column that may arrive as a number or a
/// numeric string. Anything else becomes `None`.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Decode `null` as the type's default instead of failing.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Leads
// ============================================================================

/// Funnel stage of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Incomplete,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::Incomplete,
        LeadStatus::Qualified,
        LeadStatus::Converted,
        LeadStatus::Lost,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "incomplete" => Some(Self::Incomplete),
            "qualified" => Some(Self::Qualified),
            "converted" => Some(Self::Converted),
            "lost" => Some(Self::Lost),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::Qualified => "qualified",
            Self::Converted => "converted",
            Self::Lost => "lost",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Incomplete => "Incomplete",
            Self::Qualified => "Qualified",
            Self::Converted => "Converted",
            Self::Lost => "Lost",
        }
    }

    /// Badge colour classes used by the dashboard tables.
    pub fn badge_class(self) -> &'static str {
        match self {
            Self::Incomplete => "bg-yellow-100 text-yellow-800",
            Self::Qualified => "bg-blue-100 text-blue-800",
            Self::Converted => "bg-green-100 text-green-800",
            Self::Lost => "bg-red-100 text-red-800",
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the `users` table: one chatbot lead, keyed by phone number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct Lead {
    #[serde(default, deserialize_with = "null_as_default")]
    #[ts(type = "number")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_number: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    #[ts(type = "number | null")]
    pub age: Option<i64>,
    #[serde(default)]
    pub spouse_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    #[ts(type = "number | null")]
    pub spouse_age: Option<i64>,
    #[serde(default)]
    pub trying_duration: Option<String>,
    #[serde(default)]
    pub previous_treatments: Option<String>,
    #[serde(default)]
    pub user_city: Option<String>,
    #[serde(default)]
    pub preferred_center: Option<String>,
    #[serde(default)]
    pub lead_status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub appointment_time: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl Lead {
    pub fn status(&self) -> Option<LeadStatus> {
        self.lead_status.as_deref().and_then(LeadStatus::parse)
    }

    pub fn has_appointment(&self) -> bool {
        self.appointment_date
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// Lead reshaped for tables and exports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct DisplayLead {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub location: String,
    #[ts(type = "number | null")]
    pub age: Option<i64>,
    pub lead_status: String,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub source: String,
    pub spouse_info: String,
    pub trying_duration: Option<String>,
    pub previous_treatments: Option<String>,
    pub preferred_center: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// Chat history
// ============================================================================

/// Sender of a chat message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Human,
    Ai,
    #[default]
    #[serde(other)]
    Other,
}

/// Structured message envelope written by the bot framework.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct ChatMessage {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub role: ChatRole,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_kwargs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_metadata: Option<Value>,
}

impl ChatMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Human,
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            content: content.into(),
            ..Default::default()
        }
    }
}

/// The `message` column: usually a structured envelope, occasionally a bare
/// string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(untagged)]
pub enum MessageBody {
    Structured(ChatMessage),
    Text(String),
}

impl Default for MessageBody {
    fn default() -> Self {
        MessageBody::Text(String::new())
    }
}

impl MessageBody {
    pub fn role(&self) -> ChatRole {
        match self {
            MessageBody::Structured(m) => m.role,
            MessageBody::Text(_) => ChatRole::Other,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            MessageBody::Structured(m) => &m.content,
            MessageBody::Text(s) => s,
        }
    }
}

impl From<ChatMessage> for MessageBody {
    fn from(m: ChatMessage) -> Self {
        MessageBody::Structured(m)
    }
}

/// A row of the chat history table. `session_id` is the lead's phone number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct ChatHistory {
    #[serde(default, deserialize_with = "null_as_default")]
    #[ts(type = "number")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: MessageBody,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

/// Chat row reshaped for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct DisplayChat {
    pub id: String,
    pub session_id: String,
    pub user_phone: String,
    pub message_content: String,
    pub message_type: ChatRole,
    pub timestamp: String,
}

/// A line of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    #[serde(flatten)]
    pub chat: DisplayChat,
    /// `Today 3:05 PM`, `Yesterday 3:05 PM` or `Jan 5, 3:05 PM`.
    pub display_time: String,
    /// Lead fields captured in an AI reply's `DATA` object.
    pub extracted_data: Option<ExtractedLeadData>,
}

// ============================================================================
// Conversations
// ============================================================================

/// Per-session aggregate over chat messages, joined with the lead row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub session_id: String,
    pub phone: String,
    pub name: Option<String>,
    pub city: Option<String>,
    #[ts(type = "number | null")]
    pub age: Option<i64>,
    pub lead_status: Option<String>,
    pub message_count: usize,
    pub user_messages: usize,
    pub ai_messages: usize,
    pub last_message: String,
    pub last_activity: String,
    pub first_activity: String,
}

/// One page of conversations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

impl ConversationListResponse {
    pub fn empty(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }
}

/// One page of the leads table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct LeadsPage {
    pub leads: Vec<DisplayLead>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

impl LeadsPage {
    pub fn empty(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }
}

/// Whether another page exists after `page` given the total row count.
pub fn has_more(page: usize, page_size: usize, total: usize) -> bool {
    page.saturating_add(1).saturating_mul(page_size) < total
}

/// Inclusive `(from, to)` row range for `page`. Saturates rather than wraps.
pub fn page_bounds(page: usize, page_size: usize) -> (usize, usize) {
    let from = page.saturating_mul(page_size);
    (from, from.saturating_add(page_size.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lead_decodes_partial_selection() {
        let lead: Lead = serde_json::from_value(json!({ "user_city": "Pune" })).unwrap();
        assert_eq!(lead.user_city.as_deref(), Some("Pune"));
        assert_eq!(lead.phone_number, "");
        assert!(lead.lead_status.is_none());
    }

    #[test]
    fn test_lead_age_accepts_numeric_string() {
        let lead: Lead =
            serde_json::from_value(json!({ "age": "34", "spouse_age": 36, "created_at": null }))
                .unwrap();
        assert_eq!(lead.age, Some(34));
        assert_eq!(lead.spouse_age, Some(36));
        assert_eq!(lead.created_at, "");

        let lead: Lead = serde_json::from_value(json!({ "age": "thirty" })).unwrap();
        assert_eq!(lead.age, None);
    }

    #[test]
    fn test_lead_status_parse_roundtrip() {
        for status in LeadStatus::ALL {
            assert_eq!(LeadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LeadStatus::parse("complete"), None);
        assert_eq!(LeadStatus::Converted.label(), "Converted");
    }

    #[test]
    fn test_has_appointment_ignores_blank() {
        let mut lead = Lead::default();
        assert!(!lead.has_appointment());
        lead.appointment_date = Some("  ".into());
        assert!(!lead.has_appointment());
        lead.appointment_date = Some("2024-03-01".into());
        assert!(lead.has_appointment());
    }

    #[test]
    fn test_message_body_structured_and_text() {
        let row: ChatHistory = serde_json::from_value(json!({
            "id": 7,
            "session_id": "9876543210",
            "message": { "type": "ai", "content": "{\"output\":\"hi\"}" },
            "timestamp": "2024-01-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(row.message.role(), ChatRole::Ai);
        assert_eq!(row.message.content(), "{\"output\":\"hi\"}");

        let row: ChatHistory =
            serde_json::from_value(json!({ "session_id": "1", "message": "plain" })).unwrap();
        assert_eq!(row.message, MessageBody::Text("plain".into()));
        assert_eq!(row.message.role(), ChatRole::Other);

        let row: ChatHistory = serde_json::from_value(json!({ "message": null })).unwrap();
        assert_eq!(row.message.content(), "");
    }

    #[test]
    fn test_unknown_role_maps_to_other() {
        let msg: ChatMessage =
            serde_json::from_value(json!({ "type": "system", "content": "x" })).unwrap();
        assert_eq!(msg.role, ChatRole::Other);
    }

    #[test]
    fn test_has_more() {
        assert!(has_more(0, 50, 51));
        assert!(!has_more(0, 50, 50));
        assert!(!has_more(3, 50, 0));
    }

    #[test]
    fn test_paging_saturates_on_huge_pages() {
        assert!(!has_more(usize::MAX, 50, 1000));
        assert!(!has_more(usize::MAX / 2, 3, usize::MAX - 1));
        assert_eq!(page_bounds(2, 50), (100, 149));
        assert_eq!(page_bounds(usize::MAX, 50), (usize::MAX, usize::MAX));
    }
}

// crates/core/src/stats.rs
//! Aggregate records served by the dashboard API.
//!
//! Every record implements `Default` with zero/empty values; callers
//! substitute the default when an aggregate read fails.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::ChatRole;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_conversations: usize,
    pub total_messages: usize,
    pub total_users: usize,
    pub active_conversations: usize,
    pub avg_messages_per_conversation: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ConversationStats {
    pub total_conversations: usize,
    pub active_conversations: usize,
    pub avg_messages: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct CityAnalytics {
    pub city: String,
    pub count: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct LeadStatusAnalytics {
    pub status: String,
    pub count: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAnalytics {
    /// `YYYY-MM`
    pub month: String,
    pub users: usize,
    pub messages: usize,
    pub conversations: usize,
}

/// Activity for one UTC day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Short label such as `Jan 5`.
    pub label: String,
    pub leads: usize,
    pub messages: usize,
    pub conversations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct HourlyStats {
    pub hour: u32,
    pub messages: usize,
    pub active_users: usize,
}

impl HourlyStats {
    /// 24 zeroed buckets, one per hour.
    pub fn empty_day() -> Vec<HourlyStats> {
        (0..24)
            .map(|hour| HourlyStats {
                hour,
                ..Default::default()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_leads: usize,
    pub total_messages: usize,
    pub total_conversations: usize,
    pub avg_messages_per_conversation: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct CityCount {
    pub city: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
}

/// Funnel summary for one calendar month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    /// Long label such as `January 2024`.
    pub month: String,
    pub year: i32,
    pub total_leads: usize,
    pub total_messages: usize,
    pub conversions: usize,
    pub appointments: usize,
    pub top_cities: Vec<CityCount>,
    pub lead_sources: Vec<SourceCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct LeadMetrics {
    pub total_leads: usize,
    pub conversion_rate: f64,
    pub appointment_rate: f64,
    pub status_distribution: BTreeMap<String, usize>,
    pub city_distribution: BTreeMap<String, usize>,
    pub source_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct UserEngagement {
    pub total_messages: usize,
    pub unique_users: usize,
    pub avg_messages_per_user: f64,
    /// Index is the UTC hour (0-23).
    pub messages_by_hour: Vec<usize>,
    /// `YYYY-MM-DD` to message count, last 7 days.
    pub messages_by_day: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub total_leads: usize,
    pub total_chats: usize,
    pub active_users: usize,
    pub appointment_rate: f64,
    pub conversion_rate: f64,
    pub status_distribution: BTreeMap<String, usize>,
    pub city_distribution: BTreeMap<String, usize>,
    pub source_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct RecentLead {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub location: String,
    #[ts(type = "number | null")]
    pub age: Option<i64>,
    pub lead_status: String,
    /// Badge classes for `lead_status`.
    pub status_color: String,
    pub created_at: String,
    /// `Just now`, `5 minutes ago`, ...
    pub relative_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct RecentChat {
    #[ts(type = "number")]
    pub id: i64,
    pub session_id: String,
    pub user_name: Option<String>,
    pub message_type: ChatRole,
    pub message_content: String,
    pub timestamp: String,
    pub relative_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub leads: Vec<RecentLead>,
    pub chats: Vec<RecentChat>,
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole * 100`, two decimals, 0 when `whole` is 0.
pub fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_zero_guard() {
        assert_eq!(rate(3, 0), 0.0);
        assert_eq!(rate(1, 3), 33.33);
        assert_eq!(rate(2, 3), 66.67);
    }

    #[test]
    fn test_empty_day_has_24_hours() {
        let day = HourlyStats::empty_day();
        assert_eq!(day.len(), 24);
        assert_eq!(day[23].hour, 23);
        assert!(day.iter().all(|h| h.messages == 0 && h.active_users == 0));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(GlobalStats::default()).unwrap();
        assert!(json.get("avgMessagesPerConversation").is_some());
        assert!(json.get("totalUsers").is_some());
    }
}

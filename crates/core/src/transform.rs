// crates/core/src/transform.rs
//! Pure helpers that reshape raw rows into display records and format
//! values for tables, feeds and exports.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::distribution::Distribution;
use crate::stats::{rate, round2, LeadMetrics, UserEngagement};
use crate::types::{
    ChatHistory, ChatRole, DisplayChat, DisplayLead, Lead, LeadStatus, MessageBody,
    TranscriptMessage,
};

/// Longest preview shown in conversation lists.
pub const PREVIEW_MAX_CHARS: usize = 200;

const NEUTRAL_STATUS_COLOR: &str = "bg-gray-100 text-gray-800";


// ============================================================================
// Row transforms
// ============================================================================

pub fn transform_lead(lead: &Lead) -> DisplayLead {
    let spouse_info = match (non_blank(&lead.spouse_name), lead.spouse_age) {
        (Some(name), Some(age)) => format!("{name} ({age} years)"),
        (Some(name), None) => name.to_string(),
        _ => String::new(),
    };

    DisplayLead {
        id: lead.id.to_string(),
        name: non_blank(&lead.full_name).unwrap_or("Unknown").to_string(),
        phone: lead.phone_number.clone(),
        location: non_blank(&lead.user_city)
            .unwrap_or("Not specified")
            .to_string(),
        age: lead.age,
        lead_status: format_lead_status(lead.lead_status.as_deref().unwrap_or_default()),
        appointment_date: lead.appointment_date.clone(),
        appointment_time: lead.appointment_time.clone(),
        source: non_blank(&lead.source).unwrap_or("Unknown").to_string(),
        spouse_info,
        trying_duration: lead.trying_duration.clone(),
        previous_treatments: lead.previous_treatments.clone(),
        preferred_center: lead.preferred_center.clone(),
        created_at: lead.created_at.clone(),
        updated_at: lead.updated_at.clone(),
    }
}

pub fn transform_chat(chat: &ChatHistory) -> DisplayChat {
    DisplayChat {
        id: chat.id.to_string(),
        session_id: chat.session_id.clone(),
        user_phone: chat.session_id.clone(),
        message_content: extract_message_content(&chat.message),
        message_type: chat.message.role(),
        timestamp: chat.timestamp.clone(),
    }
}

/// One transcript line: readable content, a display time, and for AI
/// replies the lead fields the bot captured.
pub fn transcript_message(chat: &ChatHistory, now: DateTime<Utc>) -> TranscriptMessage {
    let extracted_data = match chat.message.role() {
        ChatRole::Ai => extract_lead_data_from_ai(chat.message.content()),
        _ => None,
    };
    TranscriptMessage {
        display_time: format_chat_timestamp(&chat.timestamp, now),
        chat: transform_chat(chat),
        extracted_data,
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ============================================================================
// Message content
// ============================================================================

/// Readable text of a message. AI replies that wrap their text in
/// `{"output": ...}` are unwrapped.
pub fn extract_message_content(message: &MessageBody) -> String {
    match message {
        MessageBody::Text(text) => text.clone(),
        MessageBody::Structured(msg) if msg.content.is_empty() => "No content available".to_string(),
        MessageBody::Structured(msg) => {
            if msg.role == ChatRole::Ai {
                if let Some(output) = json_string_field(&msg.content, "output") {
                    return output;
                }
            }
            msg.content.clone()
        }
    }
}

/// `{"output":"hello"}` yields `hello`; anything else is returned as is.
pub fn extract_ai_output(content: &str) -> String {
    json_string_field(content, "output").unwrap_or_else(|| content.to_string())
}

/// Short preview of a message for conversation lists: the JSON `output`,
/// else `response`, else the raw text, cut to 200 characters.
pub fn extract_readable_content(message: &MessageBody) -> String {
    let content = message.content();
    if content.is_empty() {
        return String::new();
    }
    let text = json_string_field(content, "output")
        .or_else(|| json_string_field(content, "response"))
        .unwrap_or_else(|| content.to_string());
    text.chars().take(PREVIEW_MAX_CHARS).collect()
}

fn json_string_field(content: &str, field: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(content).ok()?;
    parsed
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Lead fields the bot embeds in its replies under a `DATA` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ExtractedLeadData {
    pub name: Option<String>,
    pub age: Option<String>,
    pub city: Option<String>,
    pub spouse_name: Option<String>,
    pub spouse_age: Option<String>,
    pub trying_duration: Option<String>,
    pub previous_treatments: Option<String>,
    pub preferred_center: Option<String>,
    pub lead_status: Option<String>,
}

pub fn extract_lead_data_from_ai(content: &str) -> Option<ExtractedLeadData> {
    let parsed: Value = serde_json::from_str(content).ok()?;
    let data = parsed.get("DATA").filter(|d| d.is_object())?;
    let field = |name: &str| match data.get(name) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    Some(ExtractedLeadData {
        name: field("full_name"),
        age: field("age"),
        city: field("user_city"),
        spouse_name: field("spouse_name"),
        spouse_age: field("spouse_age"),
        trying_duration: field("trying_duration"),
        previous_treatments: field("previous_treatments"),
        preferred_center: field("preferred_center"),
        lead_status: field("lead_status"),
    })
}

/// Cut to `max` characters, trim, and append `...`. Short text is returned
/// untouched.
pub fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim())
}

// ============================================================================
// Display formatting
// ============================================================================

/// `+91 XXXXX XXXXX` for Indian mobile numbers: 10 local digits, or 12
/// digits carrying the `91` country code.
pub fn format_phone_number(phone: &str) -> String {
    if phone.is_empty() {
        return "No phone".to_string();
    }
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let local = match digits.len() {
        10 => digits.as_str(),
        12 if digits.starts_with("91") => &digits[2..],
        _ => return phone.to_string(),
    };
    format!("+91 {} {}", &local[..5], &local[5..])
}

pub fn format_lead_status(status: &str) -> String {
    LeadStatus::parse(status)
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| status.to_string())
}

pub fn lead_status_color(status: &str) -> &'static str {
    LeadStatus::parse(status)
        .map(LeadStatus::badge_class)
        .unwrap_or(NEUTRAL_STATUS_COLOR)
}

fn plural(n: i64, unit: &str) -> String {
    if n > 1 {
        format!("{n} {unit}s ago")
    } else {
        format!("{n} {unit} ago")
    }
}

pub fn format_relative_time(ts: &str, now: DateTime<Utc>) -> String {
    let Some(at) = parse_timestamp(ts) else {
        return ts.to_string();
    };
    let secs = (now - at).num_seconds();
    if secs < 60 {
        "Just now".to_string()
    } else if secs < 3_600 {
        plural(secs / 60, "minute")
    } else if secs < 86_400 {
        plural(secs / 3_600, "hour")
    } else {
        plural(secs / 86_400, "day")
    }
}

pub fn format_chat_timestamp(ts: &str, now: DateTime<Utc>) -> String {
    let Some(at) = parse_timestamp(ts) else {
        return ts.to_string();
    };
    let time = at.format("%-I:%M %p");
    let day = at.date_naive();
    if day == now.date_naive() {
        format!("Today {time}")
    } else if day == (now - Duration::days(1)).date_naive() {
        format!("Yesterday {time}")
    } else {
        at.format("%b %-d, %-I:%M %p").to_string()
    }
}

/// `Jan 5, 2024, 03:05 PM`.
pub fn format_date(ts: &str) -> String {
    if ts.is_empty() {
        return "Not set".to_string();
    }
    match parse_timestamp(ts) {
        Some(at) => at.format("%b %-d, %Y, %I:%M %p").to_string(),
        None => ts.to_string(),
    }
}

/// Parse the timestamp shapes the backend emits. Values without an offset
/// are taken as UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(ts, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(ts, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(ts, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `YYYY-MM` prefix of a timestamp, `Unknown` when missing.
pub fn month_key(ts: &str) -> String {
    if ts.is_empty() {
        return "Unknown".to_string();
    }
    ts.chars().take(7).collect()
}

// ============================================================================
// Metrics
// ============================================================================

pub fn calculate_lead_metrics(leads: &[Lead]) -> LeadMetrics {
    let total = leads.len();
    let converted = leads
        .iter()
        .filter(|l| l.status() == Some(LeadStatus::Converted))
        .count();
    let appointments = leads.iter().filter(|l| l.has_appointment()).count();

    let mut statuses = Distribution::new();
    let mut cities = Distribution::new();
    let mut sources = Distribution::new();
    for lead in leads {
        statuses.add_value(lead.lead_status.as_deref(), "unknown");
        cities.add_value(lead.user_city.as_deref(), "Unknown");
        sources.add_value(lead.source.as_deref(), "Unknown");
    }

    LeadMetrics {
        total_leads: total,
        conversion_rate: rate(converted, total),
        appointment_rate: rate(appointments, total),
        status_distribution: statuses.into_counts(),
        city_distribution: cities.into_counts(),
        source_distribution: sources.into_counts(),
    }
}

/// Engagement over `(session_id, timestamp)` pairs, one per message.
pub fn calculate_user_engagement<'a, I>(messages: I, now: DateTime<Utc>) -> UserEngagement
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let messages: Vec<(&str, &str)> = messages.into_iter().collect();
    let unique: std::collections::HashSet<&str> = messages.iter().map(|(s, _)| *s).collect();
    let total = messages.len();

    let mut by_hour = vec![0usize; 24];
    let mut by_day: BTreeMap<String, usize> = (0..7)
        .map(|i| {
            let day = (now - Duration::days(i)).date_naive();
            (day.format("%Y-%m-%d").to_string(), 0)
        })
        .collect();

    for (_, timestamp) in &messages {
        let Some(at) = parse_timestamp(timestamp) else {
            continue;
        };
        by_hour[at.hour() as usize] += 1;
        if let Some(count) = by_day.get_mut(&at.format("%Y-%m-%d").to_string()) {
            *count += 1;
        }
    }

    let avg = if unique.is_empty() {
        0.0
    } else {
        round2(total as f64 / unique.len() as f64)
    };

    UserEngagement {
        total_messages: total,
        unique_users: unique.len(),
        avg_messages_per_user: avg,
        messages_by_hour: by_hour,
        messages_by_day: by_day,
    }
}

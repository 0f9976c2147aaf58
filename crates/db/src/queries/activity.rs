// crates/db/src/queries/activity.rs
// Recent leads and messages for the dashboard activity feed.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use crysta_view_core::transform::{extract_ai_output, format_relative_time, lead_status_color};
use crysta_view_core::{ChatHistory, ChatRole, Lead, RecentActivity, RecentChat, RecentLead};
use tracing::warn;

use crate::query::{Query, Table};
use crate::{Database, DbResult};

pub const RECENT_LEADS_LIMIT: usize = 5;
pub const RECENT_CHATS_LIMIT: usize = 10;
/// Longest message preview in the feed before `...` is appended.
pub const RECENT_PREVIEW_CHARS: usize = 150;

fn preview(content: &str) -> String {
    if content.chars().count() <= RECENT_PREVIEW_CHARS {
        return content.to_string();
    }
    let cut: String = content.chars().take(RECENT_PREVIEW_CHARS).collect();
    format!("{cut}...")
}

fn recent_lead(lead: Lead, now: DateTime<Utc>) -> RecentLead {
    let lead_status = lead
        .lead_status
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "incomplete".into());
    RecentLead {
        id: lead.id,
        name: lead.full_name.filter(|n| !n.is_empty()).unwrap_or_else(|| "Unknown".into()),
        phone: lead.phone_number,
        location: lead
            .user_city
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "Not specified".into()),
        age: lead.age,
        status_color: lead_status_color(&lead_status).to_string(),
        lead_status,
        relative_time: format_relative_time(&lead.created_at, now),
        created_at: lead.created_at,
    }
}

fn recent_chat(chat: ChatHistory, names: &HashMap<String, String>, now: DateTime<Utc>) -> RecentChat {
    let role = chat.message.role();
    let content = match role {
        ChatRole::Ai => extract_ai_output(chat.message.content()),
        _ => chat.message.content().to_string(),
    };
    RecentChat {
        id: chat.id,
        user_name: names.get(&chat.session_id).cloned(),
        session_id: chat.session_id,
        message_type: role,
        message_content: preview(&content),
        relative_time: format_relative_time(&chat.timestamp, now),
        timestamp: chat.timestamp,
    }
}

impl Database {
    /// Newest leads and newest messages, each message tagged with its
    /// sender's name when the lead row has one. Ages are relative to `now`.
    pub async fn recent_activity(
        &self,
        limit_leads: usize,
        limit_chats: usize,
        now: DateTime<Utc>,
    ) -> DbResult<RecentActivity> {
        let leads_query = Query::from(Table::Users)
            .select("id, phone_number, full_name, user_city, age, lead_status, created_at")
            .order("created_at", false)
            .limit(limit_leads);
        let chats_query = Query::from(Table::ChatHistories)
            .select("id, session_id, message, timestamp")
            .order("timestamp", false)
            .limit(limit_chats);

        let (leads, chats) = tokio::try_join!(
            self.source().execute(&leads_query),
            self.source().execute(&chats_query),
        )?;
        let leads: Vec<Lead> = leads.decode()?;
        let chats: Vec<ChatHistory> = chats.decode()?;

        let mut seen = HashSet::new();
        let sessions: Vec<String> = chats
            .iter()
            .filter(|c| seen.insert(c.session_id.as_str()))
            .map(|c| c.session_id.clone())
            .collect();
        let names = self.names_for_phones(&sessions).await;

        Ok(RecentActivity {
            leads: leads.into_iter().map(|l| recent_lead(l, now)).collect(),
            chats: chats
                .into_iter()
                .map(|c| recent_chat(c, &names, now))
                .collect(),
        })
    }

    /// Phone to full name for the given phones. Lookup failures only cost
    /// the names.
    async fn names_for_phones(&self, phones: &[String]) -> HashMap<String, String> {
        if phones.is_empty() {
            return HashMap::new();
        }
        let query = Query::from(Table::Users)
            .select("phone_number, full_name")
            .in_list("phone_number", phones.iter().cloned());
        match self.source().execute(&query).await.and_then(|r| r.decode::<Lead>()) {
            Ok(leads) => leads
                .into_iter()
                .filter_map(|l| {
                    let name = l.full_name.filter(|n| !n.is_empty())?;
                    Some((l.phone_number, name))
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "failed to look up names for recent messages");
                HashMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_at_150() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(151);
        let cut = preview(&long);
        assert_eq!(cut.len(), 153);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_recent_lead_defaults() {
        let lead = recent_lead(
            Lead {
                id: 9,
                phone_number: "1".into(),
                created_at: "2024-01-10T11:00:00Z".into(),
                ..Default::default()
            },
            "2024-01-10T12:00:00Z".parse().unwrap(),
        );
        assert_eq!(lead.name, "Unknown");
        assert_eq!(lead.location, "Not specified");
        assert_eq!(lead.lead_status, "incomplete");
        assert_eq!(lead.status_color, "bg-yellow-100 text-yellow-800");
        assert_eq!(lead.relative_time, "1 hour ago");
    }
}

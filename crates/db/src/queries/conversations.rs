// crates/db/src/queries/conversations.rs
// Conversation list: leads joined with per-session message stats, plus
// message-content search and full conversation transcripts.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use crysta_view_core::transform::{extract_readable_content, transcript_message};
use crysta_view_core::{
    has_more, page_bounds, ChatHistory, ChatRole, ConversationListResponse, ConversationSummary, Lead,
    TranscriptMessage,
};
use tracing::warn;

use super::types::{
    trimmed, ConversationFilters, CONVERSATION_LEAD_COLUMNS, CONVERSATION_SEARCH_COLUMNS,
};
use crate::query::{CountMode, Query, Table};
use crate::scan::{EXPORT_MAX_PAGES, PAGE_SIZE};
use crate::source::{PhoneRow, SessionRow};
use crate::{Database, DbResult};

/// Lead matches considered by conversation search.
pub const SEARCH_LEAD_LIMIT: usize = 1000;
/// Message matches considered by conversation search.
pub const SEARCH_MESSAGE_LIMIT: usize = 500;

/// Message totals for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMessageStats {
    pub total: usize,
    pub human: usize,
    pub ai: usize,
    /// Readable preview of the newest message.
    pub last_message: String,
    pub last_activity: String,
    pub first_activity: String,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Build a summary for `lead`. Sessions without messages fall back to the
/// lead's own timestamps.
fn summarize(lead: &Lead, stats: Option<&SessionMessageStats>) -> ConversationSummary {
    let fallback;
    let stats = match stats {
        Some(stats) => stats,
        None => {
            fallback = SessionMessageStats {
                last_activity: lead.updated_at.clone(),
                first_activity: lead.created_at.clone(),
                ..Default::default()
            };
            &fallback
        }
    };

    ConversationSummary {
        session_id: lead.phone_number.clone(),
        phone: lead.phone_number.clone(),
        name: non_empty(&lead.full_name),
        city: non_empty(&lead.user_city),
        age: lead.age.filter(|&a| a != 0),
        lead_status: non_empty(&lead.lead_status),
        message_count: stats.total,
        user_messages: stats.human,
        ai_messages: stats.ai,
        last_message: stats.last_message.clone(),
        last_activity: stats.last_activity.clone(),
        first_activity: stats.first_activity.clone(),
    }
}

impl Database {
    /// One page of conversations, driven by the leads table.
    pub async fn conversation_list(
        &self,
        page: usize,
        page_size: usize,
        search: Option<&str>,
        filters: &ConversationFilters,
    ) -> DbResult<ConversationListResponse> {
        let page_size = page_size.max(1);
        let (from, to) = page_bounds(page, page_size);

        let mut query = Query::from(Table::Users)
            .select(CONVERSATION_LEAD_COLUMNS)
            .count(CountMode::Exact);
        if let Some(status) = filters.lead_status {
            query = query.eq("lead_status", status.as_str());
        }
        if let Some(city) = trimmed(&filters.city) {
            query = query.eq("user_city", city);
        }
        if let Some(date_from) = trimmed(&filters.date_from) {
            query = query.gte("created_at", date_from);
        }
        if let Some(date_to) = trimmed(&filters.date_to) {
            query = query.lte("created_at", date_to);
        }
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.ilike_any(&CONVERSATION_SEARCH_COLUMNS, term);
        }
        let query = query
            .order("updated_at", false)
            .range(from, to);

        let resp = self.source().execute(&query).await?;
        let leads: Vec<Lead> = resp.decode()?;
        let total = resp.total();

        let phones: Vec<String> = leads.iter().map(|l| l.phone_number.clone()).collect();
        let stats = self.message_counts_for_sessions(&phones).await?;

        let mut conversations: Vec<ConversationSummary> = leads
            .iter()
            .map(|lead| summarize(lead, stats.get(&lead.phone_number)))
            .collect();
        if let Some(min) = filters.min_messages.filter(|&n| n > 0) {
            conversations.retain(|c| c.message_count >= min);
        }

        Ok(ConversationListResponse {
            conversations,
            total,
            page,
            page_size,
            has_more: has_more(page, page_size, total),
        })
    }

    /// Per-session counts for `session_ids`, fetched in one query ordered
    /// newest first.
    pub async fn message_counts_for_sessions(
        &self,
        session_ids: &[String],
    ) -> DbResult<HashMap<String, SessionMessageStats>> {
        let mut result: HashMap<String, SessionMessageStats> = HashMap::new();
        if session_ids.is_empty() {
            return Ok(result);
        }

        let query = Query::from(Table::ChatHistories)
            .select("session_id, message, timestamp")
            .in_list("session_id", session_ids.iter().cloned())
            .order("timestamp", false);
        let messages: Vec<ChatHistory> = self.source().execute(&query).await?.decode()?;

        for msg in messages {
            let stats = result
                .entry(msg.session_id.clone())
                .or_insert_with(|| SessionMessageStats {
                    last_message: extract_readable_content(&msg.message),
                    last_activity: msg.timestamp.clone(),
                    ..Default::default()
                });
            stats.total += 1;
            match msg.message.role() {
                ChatRole::Human => stats.human += 1,
                ChatRole::Ai => stats.ai += 1,
                ChatRole::Other => {}
            }
            stats.first_activity = msg.timestamp;
        }

        Ok(result)
    }

    /// Conversations whose lead or any message matches `term`.
    ///
    /// Lead matches come first, then sessions found only through message
    /// text. Message search failures are logged and ignored. A blank term
    /// lists every conversation.
    pub async fn search_conversations(
        &self,
        term: &str,
        page: usize,
        page_size: usize,
    ) -> DbResult<ConversationListResponse> {
        let term = term.trim();
        if term.is_empty() {
            return self
                .conversation_list(page, page_size, None, &ConversationFilters::default())
                .await;
        }
        let page_size = page_size.max(1);

        let lead_query = Query::from(Table::Users)
            .select("phone_number")
            .ilike_any(&CONVERSATION_SEARCH_COLUMNS, term)
            .limit(SEARCH_LEAD_LIMIT);
        let message_query = Query::from(Table::ChatHistories)
            .select("session_id")
            .text_search("message", term)
            .limit(SEARCH_MESSAGE_LIMIT);
        let (leads, messages) = tokio::join!(
            self.source().execute(&lead_query),
            self.source().execute(&message_query),
        );

        let mut seen = HashSet::new();
        let mut sessions: Vec<String> = Vec::new();
        for row in leads?.decode::<PhoneRow>()? {
            if seen.insert(row.phone_number.clone()) {
                sessions.push(row.phone_number);
            }
        }
        match messages.and_then(|resp| resp.decode::<SessionRow>()) {
            Ok(rows) => {
                for row in rows {
                    if seen.insert(row.session_id.clone()) {
                        sessions.push(row.session_id);
                    }
                }
            }
            Err(e) => warn!(error = %e, "message search failed; using lead matches only"),
        }

        let total = sessions.len();
        if total == 0 {
            return Ok(ConversationListResponse::empty(page, page_size));
        }

        let start = page.saturating_mul(page_size);
        let page_sessions: Vec<String> = sessions.into_iter().skip(start).take(page_size).collect();
        let mut conversations = Vec::new();
        if !page_sessions.is_empty() {
            let query = Query::from(Table::Users)
                .select(CONVERSATION_LEAD_COLUMNS)
                .in_list("phone_number", page_sessions.iter().cloned())
                .order("updated_at", false);
            let leads: Vec<Lead> = self.source().execute(&query).await?.decode()?;
            let stats = self.message_counts_for_sessions(&page_sessions).await?;
            conversations = leads
                .iter()
                .map(|lead| summarize(lead, stats.get(&lead.phone_number)))
                .collect();
        }

        Ok(ConversationListResponse {
            conversations,
            total,
            page,
            page_size,
            has_more: start.saturating_add(page_size) < total,
        })
    }

    /// Every conversation matching the filters, 1000 per page, up to the
    /// export page ceiling.
    pub async fn export_conversations(
        &self,
        search: Option<&str>,
        filters: &ConversationFilters,
    ) -> DbResult<Vec<ConversationSummary>> {
        let mut all = Vec::new();
        for page in 0..EXPORT_MAX_PAGES {
            let resp = self
                .conversation_list(page, PAGE_SIZE, search, filters)
                .await?;
            all.extend(resp.conversations);
            if !resp.has_more {
                break;
            }
        }
        Ok(all)
    }

    /// Full transcript of a session, oldest first.
    pub async fn conversation_messages(&self, session_id: &str) -> DbResult<Vec<ChatHistory>> {
        let query = Query::from(Table::ChatHistories)
            .select("id, session_id, message, timestamp")
            .eq("session_id", session_id)
            .order("timestamp", true);
        self.source().execute(&query).await?.decode()
    }

    /// Display-shaped transcript: AI replies unwrapped, captured lead
    /// fields attached, times relative to `now`.
    pub async fn conversation_transcript(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<TranscriptMessage>> {
        let messages = self.conversation_messages(session_id).await?;
        Ok(messages
            .iter()
            .map(|chat| transcript_message(chat, now))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_without_messages_uses_lead_timestamps() {
        let lead = Lead {
            phone_number: "9876543210".into(),
            full_name: Some(String::new()),
            age: Some(0),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-02T00:00:00Z".into(),
            ..Default::default()
        };
        let summary = summarize(&lead, None);
        assert_eq!(summary.session_id, "9876543210");
        assert_eq!(summary.message_count, 0);
        assert_eq!(summary.last_activity, "2024-01-02T00:00:00Z");
        assert_eq!(summary.first_activity, "2024-01-01T00:00:00Z");
        assert!(summary.name.is_none());
        assert!(summary.age.is_none());
    }
}

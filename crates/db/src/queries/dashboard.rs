// crates/db/src/queries/dashboard.rs
// Head counts, the dashboard overview, and cached global/conversation stats.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use crysta_view_core::transform::calculate_lead_metrics;
use crysta_view_core::{rate, ConversationStats, DashboardOverview, GlobalStats, Lead};

use crate::query::{CountMode, Query, Table};
use crate::scan::{scan_pages, SESSION_SCAN_MAX_PAGES, USERS_SCAN_MAX_PAGES};
use crate::source::SessionRow;
use crate::{Database, DbResult};

/// Sessions with at least this many messages count as active.
pub const ACTIVE_CONVERSATION_MIN_MESSAGES: usize = 5;

impl Database {
    /// Exact row count for `query` without fetching rows.
    pub(crate) async fn head_count(&self, query: Query) -> DbResult<usize> {
        let resp = self
            .source()
            .execute(&query.count(CountMode::ExactHead))
            .await?;
        Ok(resp.total())
    }

    pub async fn users_count(&self) -> DbResult<usize> {
        self.head_count(Query::from(Table::Users)).await
    }

    pub async fn chat_history_count(&self) -> DbResult<usize> {
        self.head_count(Query::from(Table::ChatHistories)).await
    }

    /// Leads updated since the start of the current UTC day.
    pub async fn active_users_today(&self, now: DateTime<Utc>) -> DbResult<usize> {
        let today = now.format("%Y-%m-%d").to_string();
        self.head_count(Query::from(Table::Users).gte("updated_at", today))
            .await
    }

    async fn appointments_count(&self) -> DbResult<usize> {
        self.head_count(Query::from(Table::Users).not_null("appointment_date"))
            .await
    }

    async fn lead_analytics_rows(&self) -> DbResult<Vec<Lead>> {
        let mut leads = Vec::new();
        let base = Query::from(Table::Users).select("created_at, age, user_city, lead_status, source");
        scan_pages::<Lead, _>(self.source(), &base, USERS_SCAN_MAX_PAGES, |lead| leads.push(lead))
            .await?;
        Ok(leads)
    }

    /// Headline numbers for the dashboard home page.
    pub async fn dashboard_overview(&self, now: DateTime<Utc>) -> DbResult<DashboardOverview> {
        let (total_leads, total_chats, active_users, leads, appointments) = tokio::try_join!(
            self.users_count(),
            self.chat_history_count(),
            self.active_users_today(now),
            self.lead_analytics_rows(),
            self.appointments_count(),
        )?;

        let metrics = calculate_lead_metrics(&leads);
        Ok(DashboardOverview {
            total_leads,
            total_chats,
            active_users,
            appointment_rate: rate(appointments, total_leads),
            conversion_rate: metrics.conversion_rate,
            status_distribution: metrics.status_distribution,
            city_distribution: metrics.city_distribution,
            source_distribution: metrics.source_distribution,
        })
    }

    pub async fn global_stats(&self) -> DbResult<GlobalStats> {
        self.cached("global_stats", || async move {
            let (total_users, total_messages, conversations) = tokio::try_join!(
                self.users_count(),
                self.chat_history_count(),
                self.conversation_stats(),
            )?;
            Ok(GlobalStats {
                total_conversations: conversations.total_conversations,
                total_messages,
                total_users,
                active_conversations: conversations.active_conversations,
                avg_messages_per_conversation: conversations.avg_messages,
            })
        })
        .await
    }

    /// Distinct sessions, sessions with 5+ messages, and the rounded mean
    /// messages per session.
    pub async fn conversation_stats(&self) -> DbResult<ConversationStats> {
        self.cached("conversation_stats", || async move {
            let mut per_session: HashMap<String, usize> = HashMap::new();
            let base = Query::from(Table::ChatHistories).select("session_id");
            scan_pages::<SessionRow, _>(self.source(), &base, SESSION_SCAN_MAX_PAGES, |row| {
                *per_session.entry(row.session_id).or_insert(0) += 1;
            })
            .await?;

            let total_conversations = per_session.len();
            let total_messages: usize = per_session.values().sum();
            let active_conversations = per_session
                .values()
                .filter(|&&n| n >= ACTIVE_CONVERSATION_MIN_MESSAGES)
                .count();
            Ok(ConversationStats {
                total_conversations,
                active_conversations,
                avg_messages: rounded_mean(total_messages, total_conversations),
            })
        })
        .await
    }
}

/// `round(total / n)`, 0 when `n` is 0.
pub(crate) fn rounded_mean(total: usize, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    (total as f64 / n as f64).round() as usize
}

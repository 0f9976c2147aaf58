// crates/db/src/queries/analytics.rs
// Cached distribution and trend aggregates over full-table scans.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use crysta_view_core::transform::{calculate_user_engagement, month_key};
use crysta_view_core::{
    CityAnalytics, Distribution, Lead, LeadStatusAnalytics, MonthlyAnalytics, UserEngagement,
};

use crate::query::{Query, Table};
use crate::scan::{scan_pages, MESSAGES_SCAN_MAX_PAGES, USERS_SCAN_MAX_PAGES};
use crate::source::SessionTimestampRow;
use crate::{Database, DbResult};

/// Cities shown in the city breakdown.
pub const TOP_CITIES: usize = 20;

#[derive(Default)]
struct MonthBucket {
    users: usize,
    messages: usize,
    sessions: HashSet<String>,
}

impl Database {
    async fn users_distribution(
        &self,
        column: &str,
        unknown: &str,
        pick: fn(Lead) -> Option<String>,
    ) -> DbResult<Distribution> {
        let mut dist = Distribution::new();
        let base = Query::from(Table::Users).select(column);
        scan_pages::<Lead, _>(self.source(), &base, USERS_SCAN_MAX_PAGES, |lead| {
            dist.add_value(pick(lead).as_deref(), unknown);
        })
        .await?;
        Ok(dist)
    }

    /// Top cities by lead count, `Unknown` for leads without a city.
    pub async fn city_analytics(&self) -> DbResult<Vec<CityAnalytics>> {
        self.cached("city_analytics", || async move {
            let dist = self
                .users_distribution("user_city", "Unknown", |l| l.user_city)
                .await?;
            Ok(dist
                .ranked(Some(TOP_CITIES))
                .into_iter()
                .map(|b| CityAnalytics {
                    city: b.key,
                    count: b.count,
                    percentage: b.percentage,
                })
                .collect())
        })
        .await
    }

    pub async fn lead_status_analytics(&self) -> DbResult<Vec<LeadStatusAnalytics>> {
        self.cached("lead_status_analytics", || async move {
            let dist = self
                .users_distribution("lead_status", "unknown", |l| l.lead_status)
                .await?;
            Ok(dist
                .ranked(None)
                .into_iter()
                .map(|b| LeadStatusAnalytics {
                    status: b.key,
                    count: b.count,
                    percentage: b.percentage,
                })
                .collect())
        })
        .await
    }

    /// New leads, messages and distinct sessions per `YYYY-MM`, oldest first.
    pub async fn monthly_analytics(&self) -> DbResult<Vec<MonthlyAnalytics>> {
        self.cached("monthly_analytics", || async move {
            let mut user_months: BTreeMap<String, usize> = BTreeMap::new();
            let mut chat_months: BTreeMap<String, MonthBucket> = BTreeMap::new();

            let users = Query::from(Table::Users).select("created_at");
            let chats = Query::from(Table::ChatHistories).select("timestamp, session_id");
            tokio::try_join!(
                scan_pages::<Lead, _>(self.source(), &users, USERS_SCAN_MAX_PAGES, |lead| {
                    *user_months.entry(month_key(&lead.created_at)).or_insert(0) += 1;
                }),
                scan_pages::<SessionTimestampRow, _>(
                    self.source(),
                    &chats,
                    MESSAGES_SCAN_MAX_PAGES,
                    |row| {
                        let month = month_key(row.timestamp.as_deref().unwrap_or_default());
                        let bucket = chat_months.entry(month).or_default();
                        bucket.messages += 1;
                        bucket.sessions.insert(row.session_id);
                    },
                ),
            )?;

            for (month, users) in user_months {
                chat_months.entry(month).or_default().users = users;
            }
            Ok(chat_months
                .into_iter()
                .map(|(month, b)| MonthlyAnalytics {
                    month,
                    users: b.users,
                    messages: b.messages,
                    conversations: b.sessions.len(),
                })
                .collect())
        })
        .await
    }

    /// Sorted distinct non-empty cities, for filter dropdowns.
    pub async fn unique_cities(&self) -> DbResult<Vec<String>> {
        self.cached("unique_cities", || async move {
            let mut cities = BTreeSet::new();
            let base = Query::from(Table::Users)
                .select("user_city")
                .not_null("user_city");
            scan_pages::<Lead, _>(self.source(), &base, USERS_SCAN_MAX_PAGES, |lead| {
                if let Some(city) = lead.user_city.filter(|c| !c.is_empty()) {
                    cities.insert(city);
                }
            })
            .await?;
            Ok(cities.into_iter().collect())
        })
        .await
    }

    /// Messages per session, per UTC hour and per day of the last week,
    /// over every scanned message.
    pub async fn user_engagement(&self, now: DateTime<Utc>) -> DbResult<UserEngagement> {
        self.cached("user_engagement", || async move {
            let mut rows: Vec<(String, String)> = Vec::new();
            let base = Query::from(Table::ChatHistories).select("session_id, timestamp");
            scan_pages::<SessionTimestampRow, _>(
                self.source(),
                &base,
                MESSAGES_SCAN_MAX_PAGES,
                |row| rows.push((row.session_id, row.timestamp.unwrap_or_default())),
            )
            .await?;
            Ok(calculate_user_engagement(
                rows.iter().map(|(s, t)| (s.as_str(), t.as_str())),
                now,
            ))
        })
        .await
    }
}

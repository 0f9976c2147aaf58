// crates/db/src/queries/reports.rs
// Time-bucketed reports: overall totals, daily and hourly activity, and the
// monthly funnel report. Day and hour boundaries are UTC.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use crysta_view_core::transform::parse_timestamp;
use crysta_view_core::{
    CityCount, DailyStats, Distribution, HourlyStats, Lead, LeadStatus, MonthlyReport,
    OverallStats, SourceCount,
};
use tracing::warn;

use super::dashboard::rounded_mean;
use crate::query::{Query, Table};
use crate::scan::{scan_pages, MESSAGES_SCAN_MAX_PAGES, SESSION_SCAN_MAX_PAGES, USERS_SCAN_MAX_PAGES};
use crate::source::{SessionRow, SessionTimestampRow};
use crate::{Database, DbResult};

/// Entries in the per-month city and source rankings.
pub const REPORT_TOP_N: usize = 5;

fn day_bounds(day: NaiveDate) -> (String, String) {
    let d = day.format("%Y-%m-%d");
    (format!("{d}T00:00:00.000Z"), format!("{d}T23:59:59.999Z"))
}

/// First and last day of the month `back` months before `now`.
fn month_span(now: DateTime<Utc>, back: u32) -> Option<(NaiveDate, NaiveDate)> {
    let index = now.year() * 12 + now.month0() as i32 - back as i32;
    let (year, month0) = (index.div_euclid(12), index.rem_euclid(12) as u32);
    let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)?;
    let next = if month0 == 11 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month0 + 2, 1)?
    };
    Some((first, next.pred_opt()?))
}

impl Database {
    async fn distinct_sessions(&self, base: Query, max_pages: usize) -> DbResult<usize> {
        let mut sessions = HashSet::new();
        scan_pages::<SessionRow, _>(self.source(), &base.select("session_id"), max_pages, |row| {
            sessions.insert(row.session_id);
        })
        .await?;
        Ok(sessions.len())
    }

    pub async fn overall_stats(&self) -> DbResult<OverallStats> {
        let (total_leads, total_messages, total_conversations) = tokio::try_join!(
            self.users_count(),
            self.chat_history_count(),
            self.distinct_sessions(Query::from(Table::ChatHistories), SESSION_SCAN_MAX_PAGES),
        )?;
        Ok(OverallStats {
            total_leads,
            total_messages,
            total_conversations,
            avg_messages_per_conversation: rounded_mean(total_messages, total_conversations),
        })
    }

    async fn day_stats(&self, day: NaiveDate) -> DbResult<DailyStats> {
        let (start, end) = day_bounds(day);
        let (leads, messages, conversations) = tokio::try_join!(
            self.head_count(
                Query::from(Table::Users)
                    .gte("created_at", start.as_str())
                    .lte("created_at", end.as_str())
            ),
            self.head_count(
                Query::from(Table::ChatHistories)
                    .gte("timestamp", start.as_str())
                    .lte("timestamp", end.as_str())
            ),
            self.distinct_sessions(
                Query::from(Table::ChatHistories)
                    .gte("timestamp", start.as_str())
                    .lte("timestamp", end.as_str()),
                MESSAGES_SCAN_MAX_PAGES
            ),
        )?;
        Ok(DailyStats {
            date: day.format("%Y-%m-%d").to_string(),
            label: day.format("%b %-d").to_string(),
            leads,
            messages,
            conversations,
        })
    }

    /// One entry per UTC day for the last `days` days, oldest first. A day
    /// whose reads fail is reported as zeros.
    pub async fn daily_analytics(&self, days: u32, now: DateTime<Utc>) -> Vec<DailyStats> {
        let mut out = Vec::with_capacity(days as usize);
        for back in (0..days).rev() {
            let day = (now - Duration::days(back as i64)).date_naive();
            match self.day_stats(day).await {
                Ok(stats) => out.push(stats),
                Err(e) => {
                    warn!(day = %day, error = %e, "daily analytics failed; reporting zeros");
                    out.push(DailyStats {
                        date: day.format("%Y-%m-%d").to_string(),
                        label: day.format("%b %-d").to_string(),
                        ..Default::default()
                    });
                }
            }
        }
        out
    }

    /// Messages and distinct sessions per UTC hour over the last 24 hours.
    /// Always 24 entries; zeros when the read fails.
    pub async fn hourly_analytics(&self, now: DateTime<Utc>) -> Vec<HourlyStats> {
        let mut buckets: Vec<(usize, HashSet<String>)> = vec![(0, HashSet::new()); 24];
        let since = now - Duration::hours(24);
        let base = Query::from(Table::ChatHistories)
            .select("timestamp, session_id")
            .gte("timestamp", since.to_rfc3339())
            .lte("timestamp", now.to_rfc3339());

        let scanned = scan_pages::<SessionTimestampRow, _>(
            self.source(),
            &base,
            MESSAGES_SCAN_MAX_PAGES,
            |row| {
                let Some(at) = row.timestamp.as_deref().and_then(parse_timestamp) else {
                    return;
                };
                let bucket = &mut buckets[at.hour() as usize];
                bucket.0 += 1;
                bucket.1.insert(row.session_id);
            },
        )
        .await;

        if let Err(e) = scanned {
            warn!(error = %e, "hourly analytics failed; reporting zeros");
            return HourlyStats::empty_day();
        }
        buckets
            .into_iter()
            .enumerate()
            .map(|(hour, (messages, sessions))| HourlyStats {
                hour: hour as u32,
                messages,
                active_users: sessions.len(),
            })
            .collect()
    }

    async fn month_report(&self, first: NaiveDate, last: NaiveDate) -> DbResult<MonthlyReport> {
        let start = format!("{}T00:00:00.000Z", first.format("%Y-%m-%d"));
        let end = format!("{}T23:59:59.999Z", last.format("%Y-%m-%d"));

        let mut leads: Vec<Lead> = Vec::new();
        let lead_query = Query::from(Table::Users)
            .select("lead_status, appointment_date, user_city, source")
            .gte("created_at", start.as_str())
            .lte("created_at", end.as_str());
        let (total_leads, total_messages, _) = tokio::try_join!(
            self.head_count(
                Query::from(Table::Users)
                    .gte("created_at", start.as_str())
                    .lte("created_at", end.as_str())
            ),
            self.head_count(
                Query::from(Table::ChatHistories)
                    .gte("timestamp", start.as_str())
                    .lte("timestamp", end.as_str())
            ),
            scan_pages::<Lead, _>(self.source(), &lead_query, USERS_SCAN_MAX_PAGES, |lead| {
                leads.push(lead)
            }),
        )?;

        let mut cities = Distribution::new();
        let mut sources = Distribution::new();
        for lead in &leads {
            cities.add_value(lead.user_city.as_deref(), "Unknown");
            sources.add_value(lead.source.as_deref(), "Unknown");
        }

        Ok(MonthlyReport {
            month: first.format("%B %Y").to_string(),
            year: first.year(),
            total_leads,
            total_messages,
            conversions: leads
                .iter()
                .filter(|l| l.status() == Some(LeadStatus::Converted))
                .count(),
            appointments: leads.iter().filter(|l| l.has_appointment()).count(),
            top_cities: cities
                .ranked(Some(REPORT_TOP_N))
                .into_iter()
                .map(|b| CityCount {
                    city: b.key,
                    count: b.count,
                })
                .collect(),
            lead_sources: sources
                .ranked(Some(REPORT_TOP_N))
                .into_iter()
                .map(|b| SourceCount {
                    source: b.key,
                    count: b.count,
                })
                .collect(),
        })
    }

    /// Funnel report for the last `months` calendar months, oldest first.
    /// A month whose reads fail is reported as zeros.
    pub async fn monthly_report(&self, months: u32, now: DateTime<Utc>) -> Vec<MonthlyReport> {
        let mut out = Vec::with_capacity(months as usize);
        for back in (0..months).rev() {
            let Some((first, last)) = month_span(now, back) else {
                continue;
            };
            match self.month_report(first, last).await {
                Ok(report) => out.push(report),
                Err(e) => {
                    warn!(month = %first.format("%Y-%m"), error = %e, "monthly report failed; reporting zeros");
                    out.push(MonthlyReport {
                        month: first.format("%B %Y").to_string(),
                        year: first.year(),
                        ..Default::default()
                    });
                }
            }
        }
        out
    }
}

//! Integration tests for time-bucketed reports and the activity feed.

use chrono::{TimeZone, Utc};
use crysta_view_core::ChatRole;
use crysta_view_db::{demo, Table};
use pretty_assertions::assert_eq;

mod queries_shared;
use queries_shared::{ai, human, make_lead, memory_db};

#[tokio::test]
async fn test_overall_stats() {
    let (store, db) = memory_db();
    store.insert_leads(&[
        make_lead(1, "1", "A", "", "", "2024-05-01T10:00:00Z"),
        make_lead(2, "2", "B", "", "", "2024-05-01T10:00:00Z"),
    ]);
    store.insert_chats(&[
        human(1, "1", "a", "2024-05-01T10:00:00Z"),
        human(2, "1", "b", "2024-05-01T10:01:00Z"),
        human(3, "1", "c", "2024-05-01T10:02:00Z"),
        human(4, "2", "d", "2024-05-01T10:03:00Z"),
    ]);

    let stats = db.overall_stats().await.unwrap();
    assert_eq!(stats.total_leads, 2);
    assert_eq!(stats.total_messages, 4);
    assert_eq!(stats.total_conversations, 2);
    assert_eq!(stats.avg_messages_per_conversation, 2);
}

#[tokio::test]
async fn test_daily_analytics_oldest_first() {
    let (store, db) = memory_db();
    store.insert_leads(&[make_lead(1, "1", "A", "", "", "2024-03-09T08:00:00Z")]);
    store.insert_chats(&[
        human(1, "1", "a", "2024-03-09T08:00:00Z"),
        ai(2, "1", "b", "2024-03-09T08:01:00Z"),
        human(3, "2", "c", "2024-03-10T23:59:00Z"),
    ]);

    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    let days = db.daily_analytics(3, now).await;
    let labels: Vec<&str> = days.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, vec!["Mar 8", "Mar 9", "Mar 10"]);
    assert_eq!(days[1].date, "2024-03-09");
    assert_eq!((days[1].leads, days[1].messages, days[1].conversations), (1, 2, 1));
    assert_eq!((days[2].leads, days[2].messages, days[2].conversations), (0, 1, 1));
    assert_eq!(days[0].messages, 0);
}

#[tokio::test]
async fn test_daily_analytics_reports_zeros_on_failure() {
    let (store, db) = memory_db();
    store.fail_table(Table::ChatHistories);

    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    let days = db.daily_analytics(2, now).await;
    assert_eq!(days.len(), 2);
    assert!(days.iter().all(|d| d.messages == 0 && d.leads == 0));
    assert_eq!(days[1].label, "Mar 10");
}

#[tokio::test]
async fn test_hourly_analytics_buckets_by_utc_hour() {
    let (store, db) = memory_db();
    store.insert_chats(&[
        human(1, "1", "a", "2024-03-10T09:15:00Z"),
        human(2, "2", "b", "2024-03-10T09:45:00Z"),
        human(3, "2", "c", "2024-03-10T09:50:00Z"),
        human(4, "3", "d", "2024-03-10T11:00:00Z"),
        // Older than 24 hours.
        human(5, "4", "e", "2024-03-08T09:00:00Z"),
    ]);

    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    let hours = db.hourly_analytics(now).await;
    assert_eq!(hours.len(), 24);
    assert_eq!(hours[9].messages, 3);
    assert_eq!(hours[9].active_users, 2);
    assert_eq!(hours[11].messages, 1);
    assert_eq!(hours.iter().map(|h| h.messages).sum::<usize>(), 4);

    store.fail_table(Table::ChatHistories);
    let zeros = db.hourly_analytics(now).await;
    assert_eq!(zeros.len(), 24);
    assert!(zeros.iter().all(|h| h.messages == 0));
}

#[tokio::test]
async fn test_monthly_report_funnel() {
    let (store, db) = memory_db();
    let mut converted = make_lead(1, "1", "A", "Kochi", "converted", "2024-02-10T10:00:00Z");
    converted.appointment_date = Some("2024-02-20".into());
    converted.source = Some("whatsapp".into());
    store.insert_leads(&[
        converted,
        make_lead(2, "2", "B", "Kochi", "qualified", "2024-02-11T10:00:00Z"),
        make_lead(3, "3", "C", "Pune", "lost", "2024-01-05T10:00:00Z"),
    ]);
    store.insert_chats(&[
        human(1, "1", "a", "2024-02-10T10:00:00Z"),
        human(2, "3", "b", "2024-01-05T10:00:00Z"),
    ]);

    let now = Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap();
    let reports = db.monthly_report(3, now).await;
    let months: Vec<&str> = reports.iter().map(|r| r.month.as_str()).collect();
    assert_eq!(months, vec!["December 2023", "January 2024", "February 2024"]);

    let feb = &reports[2];
    assert_eq!(feb.year, 2024);
    assert_eq!(feb.total_leads, 2);
    assert_eq!(feb.total_messages, 1);
    assert_eq!(feb.conversions, 1);
    assert_eq!(feb.appointments, 1);
    assert_eq!(feb.top_cities[0].city, "Kochi");
    assert_eq!(feb.top_cities[0].count, 2);
    let sources: Vec<(&str, usize)> = feb
        .lead_sources
        .iter()
        .map(|s| (s.source.as_str(), s.count))
        .collect();
    assert_eq!(sources, vec![("Unknown", 1), ("whatsapp", 1)]);

    assert_eq!(reports[0].total_leads, 0);
    assert_eq!(reports[1].total_leads, 1);
}

#[tokio::test]
async fn test_recent_activity_names_senders() {
    let (store, db) = memory_db();
    store.insert_leads(&[
        make_lead(1, "919800000001", "Ray", "", "", "2024-05-01T10:00:00Z"),
        make_lead(2, "919800000002", "", "", "", "2024-05-02T10:00:00Z"),
    ]);
    store.insert_chats(&[
        human(1, "919800000001", "hello", "2024-05-01T10:00:00Z"),
        ai(2, "919800000001", "welcome", "2024-05-01T10:01:00Z"),
        human(3, "919800000002", &"x".repeat(200), "2024-05-02T10:00:00Z"),
    ]);

    let now = "2024-05-02T12:00:00Z".parse().unwrap();
    let activity = db.recent_activity(5, 10, now).await.unwrap();
    assert_eq!(activity.leads[0].id, 2);
    assert_eq!(activity.leads[0].name, "Unknown");
    assert_eq!(activity.leads[0].relative_time, "2 hours ago");
    assert_eq!(activity.leads[1].relative_time, "1 day ago");

    assert_eq!(activity.chats.len(), 3);
    let newest = &activity.chats[0];
    assert_eq!(newest.user_name, None);
    assert_eq!(newest.message_content.chars().count(), 153);
    assert_eq!(newest.relative_time, "2 hours ago");

    let reply = &activity.chats[1];
    assert_eq!(reply.message_type, ChatRole::Ai);
    assert_eq!(reply.message_content, "welcome");
    assert_eq!(reply.user_name.as_deref(), Some("Ray"));
}

#[tokio::test]
async fn test_demo_seed_drives_every_report() {
    let (store, db) = memory_db();
    let now = Utc::now();
    demo::seed(&store, now);

    let overall = db.overall_stats().await.unwrap();
    assert_eq!(overall.total_leads, 6);
    assert_eq!(overall.total_conversations, 6);
    assert_eq!(db.daily_analytics(7, now).await.len(), 7);
    assert!(db.unique_cities().await.unwrap().contains(&"Mumbai".to_string()));
}

// crates/db/src/demo.rs
//! Sample leads and conversations for `--demo` mode and tests.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use crysta_view_core::{ChatHistory, ChatMessage, Lead, LeadStatus};
use serde_json::json;
use tracing::info;

use crate::memory::MemoryStore;

struct Profile {
    phone: &'static str,
    name: &'static str,
    age: i64,
    city: &'static str,
    status: LeadStatus,
    source: &'static str,
    days_ago: i64,
    appointment: Option<(&'static str, &'static str)>,
}

const PROFILES: &[Profile] = &[
    Profile {
        phone: "919876543210",
        name: "Priya Sharma",
        age: 32,
        city: "Mumbai",
        status: LeadStatus::Converted,
        source: "whatsapp",
        days_ago: 2,
        appointment: Some(("2024-07-12", "10:30")),
    },
    Profile {
        phone: "919812345678",
        name: "Ananya Rao",
        age: 29,
        city: "Bangalore",
        status: LeadStatus::Qualified,
        source: "website",
        days_ago: 5,
        appointment: Some(("2024-07-15", "16:00")),
    },
    Profile {
        phone: "919900112233",
        name: "Meera Iyer",
        age: 35,
        city: "Chennai",
        status: LeadStatus::Incomplete,
        source: "whatsapp",
        days_ago: 9,
        appointment: None,
    },
    Profile {
        phone: "919811122233",
        name: "Kavya Nair",
        age: 31,
        city: "Mumbai",
        status: LeadStatus::Lost,
        source: "instagram",
        days_ago: 21,
        appointment: None,
    },
    Profile {
        phone: "919833344455",
        name: "Ritu Verma",
        age: 38,
        city: "Delhi",
        status: LeadStatus::Qualified,
        source: "website",
        days_ago: 40,
        appointment: None,
    },
    Profile {
        phone: "919844455566",
        name: "",
        age: 0,
        city: "",
        status: LeadStatus::Incomplete,
        source: "",
        days_ago: 70,
        appointment: None,
    },
];

const TURNS: &[(&str, &str)] = &[
    (
        "Hi, we have been trying to conceive for two years.",
        "I'm sorry to hear that. Could you share your age and city so I can help?",
    ),
    (
        "I am in my thirties and live nearby. Do you offer IVF consultations?",
        "Yes, we offer IVF consultations at all our centers. Would you like to book one?",
    ),
    (
        "Yes please, what slots are available this week?",
        "We have morning and evening slots. I've noted your preference and a coordinator will call you.",
    ),
];

fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn opt(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Build the sample leads, relative to `now`.
pub fn sample_leads(now: DateTime<Utc>) -> Vec<Lead> {
    PROFILES
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let created = now - Duration::days(p.days_ago);
            Lead {
                id: i as i64 + 1,
                phone_number: p.phone.to_string(),
                full_name: opt(p.name),
                age: (p.age > 0).then_some(p.age),
                spouse_name: None,
                spouse_age: None,
                trying_duration: Some("2 years".to_string()),
                previous_treatments: None,
                user_city: opt(p.city),
                preferred_center: opt(p.city),
                lead_status: Some(p.status.as_str().to_string()),
                created_at: stamp(created),
                updated_at: stamp(created + Duration::hours(6)),
                appointment_date: p.appointment.map(|(d, _)| d.to_string()),
                appointment_time: p.appointment.map(|(_, t)| t.to_string()),
                source: opt(p.source),
            }
        })
        .collect()
}

/// Build a short conversation for every sample lead. The AI replies carry
/// the `{"output": ...}` envelope the chatbot writes.
pub fn sample_chats(now: DateTime<Utc>) -> Vec<ChatHistory> {
    let mut chats = Vec::new();
    for (i, p) in PROFILES.iter().enumerate() {
        let started = now - Duration::days(p.days_ago);
        let turns = (i % TURNS.len()) + 1;
        for (t, (question, answer)) in TURNS.iter().take(turns).enumerate() {
            let at = started + Duration::minutes(t as i64 * 4);
            chats.push(ChatHistory {
                id: 0,
                session_id: p.phone.to_string(),
                message: ChatMessage::human(*question).into(),
                timestamp: stamp(at),
            });
            let envelope = json!({ "output": answer }).to_string();
            chats.push(ChatHistory {
                id: 0,
                session_id: p.phone.to_string(),
                message: ChatMessage::ai(envelope).into(),
                timestamp: stamp(at + Duration::minutes(1)),
            });
        }
    }
    for (n, chat) in chats.iter_mut().enumerate() {
        chat.id = n as i64 + 1;
    }
    chats
}

/// Load the sample data set into `store`.
pub fn seed(store: &MemoryStore, now: DateTime<Utc>) {
    let leads = sample_leads(now);
    let chats = sample_chats(now);
    store.insert_leads(&leads);
    store.insert_chats(&chats);
    info!(leads = leads.len(), chats = chats.len(), "seeded demo data");
}

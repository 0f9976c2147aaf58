//! Row builders shared by the query integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use crysta_view_core::{ChatHistory, ChatMessage, Lead};
use crysta_view_db::{Database, MemoryStore};

pub fn make_lead(id: i64, phone: &str, name: &str, city: &str, status: &str, created_at: &str) -> Lead {
    Lead {
        id,
        phone_number: phone.to_string(),
        full_name: (!name.is_empty()).then(|| name.to_string()),
        user_city: (!city.is_empty()).then(|| city.to_string()),
        lead_status: (!status.is_empty()).then(|| status.to_string()),
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
        ..Default::default()
    }
}

pub fn human(id: i64, session: &str, content: &str, timestamp: &str) -> ChatHistory {
    ChatHistory {
        id,
        session_id: session.to_string(),
        message: ChatMessage::human(content).into(),
        timestamp: timestamp.to_string(),
    }
}

pub fn ai(id: i64, session: &str, output: &str, timestamp: &str) -> ChatHistory {
    ChatHistory {
        id,
        session_id: session.to_string(),
        message: ChatMessage::ai(serde_json::json!({ "output": output }).to_string()).into(),
        timestamp: timestamp.to_string(),
    }
}

/// A database over a fresh in-memory store. The store handle stays available
/// for seeding and for inspecting executed queries.
pub fn memory_db() -> (Arc<MemoryStore>, Database) {
    let store = Arc::new(MemoryStore::new());
    let db = Database::new(store.clone());
    (store, db)
}

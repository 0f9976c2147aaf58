//! End-to-end router tests over the seeded in-memory backend.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use crysta_view_core::Lead;
use crysta_view_db::{MemoryStore, Table};
use crysta_view_server::{create_app, AppState};
use pretty_assertions::assert_eq;
use tower::ServiceExt;

fn signed_in() -> (Arc<AppState>, Arc<MemoryStore>, Router) {
    let (state, store) = AppState::demo(Utc::now());
    state.auth.sign_in("admin@crysta.com", "admin123").unwrap();
    let app = create_app(state.clone());
    (state, store, app)
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> serde_json::Value {
    let (status, _, body) = send(app, Method::GET, uri).await;
    assert_eq!(status, StatusCode::OK, "GET {uri} -> {body}");
    serde_json::from_str(&body).unwrap()
}

#[tokio::test]
async fn test_data_routes_require_sign_in() {
    let (state, _store) = AppState::demo(Utc::now());
    let app = create_app(state);

    for uri in [
        "/api/stats/dashboard",
        "/api/stats/global",
        "/api/analytics/cities",
        "/api/analytics/daily",
        "/api/leads",
        "/api/conversations",
        "/api/conversations/919876543210/messages",
        "/api/activity/recent",
        "/api/export/leads",
    ] {
        let (status, _, body) = send(&app, Method::GET, uri).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(body.contains("Unauthorized"));
    }
    let (status, _, _) = send(&app, Method::POST, "/api/sync").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&app, Method::GET, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_sign_in_opens_the_gate() {
    let (state, _store) = AppState::demo(Utc::now());
    let app = create_app(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/sign-in")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email":"admin@crysta.com","password":"admin123"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_json(&app, "/api/stats/global").await;
    assert_eq!(json["totalUsers"], 6);
    assert_eq!(json["totalMessages"], 24);
}

#[tokio::test]
async fn test_leads_page_and_filters() {
    let (_state, _store, app) = signed_in();

    let json = get_json(&app, "/api/leads?page=0&pageSize=4").await;
    assert_eq!(json["total"], 6);
    assert_eq!(json["leads"].as_array().unwrap().len(), 4);
    assert_eq!(json["hasMore"], true);

    let json = get_json(&app, "/api/leads?city=Mumbai").await;
    assert_eq!(json["total"], 2);

    let json = get_json(&app, "/api/leads?status=qualified&city=all").await;
    assert_eq!(json["total"], 2);

    let json = get_json(&app, "/api/leads?pageSize=0").await;
    assert_eq!(json["pageSize"], 1);

    let (status, _, body) = send(&app, Method::GET, "/api/leads?status=hot").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("hot"));

    let cities = get_json(&app, "/api/leads/cities").await;
    assert!(cities.as_array().unwrap().iter().any(|c| c == "Mumbai"));
}

#[tokio::test]
async fn test_huge_page_index_is_rejected() {
    let (_state, _store, app) = signed_in();

    for uri in [
        "/api/leads?page=18446744073709551615&pageSize=1000",
        "/api/conversations?page=18446744073709551615&pageSize=1000",
        "/api/conversations?page=100001&search=priya",
    ] {
        let (status, _, body) = send(&app, Method::GET, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body.contains("beyond the last allowed page"), "{uri} -> {body}");
    }

    let json = get_json(&app, "/api/leads?page=100000&pageSize=1000").await;
    assert_eq!(json["total"], 6);
    assert_eq!(json["leads"].as_array().unwrap().len(), 0);
    assert_eq!(json["hasMore"], false);

    let json = get_json(&app, "/api/conversations?page=100000&pageSize=1000").await;
    assert_eq!(json["conversations"].as_array().unwrap().len(), 0);
    assert_eq!(json["hasMore"], false);
}

#[tokio::test]
async fn test_engagement_route() {
    let (_state, _store, app) = signed_in();

    let json = get_json(&app, "/api/analytics/engagement").await;
    assert_eq!(json["totalMessages"], 24);
    assert_eq!(json["uniqueUsers"], 6);
    assert_eq!(json["avgMessagesPerUser"], 4.0);
    assert_eq!(json["messagesByHour"].as_array().unwrap().len(), 24);
}

#[tokio::test]
async fn test_backend_failure_serves_empty_page() {
    let (_state, store, app) = signed_in();
    store.fail_table(Table::Users);

    let json = get_json(&app, "/api/leads?page=2&pageSize=10").await;
    assert_eq!(json["total"], 0);
    assert_eq!(json["page"], 2);
    assert_eq!(json["pageSize"], 10);

    let (status, _, body) = send(&app, Method::GET, "/api/export/leads").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("users is unavailable"));
}

#[tokio::test]
async fn test_conversation_transcript_and_lead() {
    let (_state, _store, app) = signed_in();

    let list = get_json(&app, "/api/conversations").await;
    assert_eq!(list["total"], 6);

    let messages = get_json(&app, "/api/conversations/919876543210/messages").await;
    let messages = messages.as_array().unwrap();
    assert!(!messages.is_empty());
    let stamps: Vec<&str> = messages
        .iter()
        .map(|m| m["timestamp"].as_str().unwrap())
        .collect();
    let mut sorted = stamps.clone();
    sorted.sort();
    assert_eq!(stamps, sorted);

    assert_eq!(messages[0]["messageType"], "human");
    assert_eq!(messages[1]["messageType"], "ai");
    assert!(messages[1]["messageContent"]
        .as_str()
        .unwrap()
        .starts_with("I'm sorry to hear that"));
    assert!(messages[1]["displayTime"].is_string());
    assert!(messages[1]["extractedData"].is_null());

    let lead = get_json(&app, "/api/conversations/919876543210/lead").await;
    assert_eq!(lead["full_name"], "Priya Sharma");

    let (status, _, _) = send(&app, Method::GET, "/api/conversations/000/lead").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_leads_csv_export() {
    let (_state, store, app) = signed_in();
    store.insert_leads(&[Lead {
        id: 99,
        phone_number: "919800000099".into(),
        full_name: Some("Asha \"Ash\" Pillai".into()),
        user_city: Some("Kochi".into()),
        lead_status: Some("qualified".into()),
        created_at: "2024-06-01T08:00:00Z".into(),
        updated_at: "2024-06-01T08:00:00Z".into(),
        ..Default::default()
    }]);

    let (status, headers, body) = send(&app, Method::GET, "/api/export/leads").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("ivf_leads.csv"));

    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 1 + 7);
    assert!(lines[0].starts_with("Name,Phone"));
    assert!(body.contains("\"Asha \"\"Ash\"\" Pillai\""));

    let (_, _, body) = send(&app, Method::GET, "/api/export/leads?city=Kochi").await;
    assert_eq!(body.lines().count(), 2);
}

#[tokio::test]
async fn test_conversations_csv_export() {
    let (_state, _store, app) = signed_in();

    let (status, headers, body) = send(&app, Method::GET, "/api/export/conversations").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("conversations.csv"));
    assert_eq!(body.lines().count(), 1 + 6);
}

#[tokio::test]
async fn test_sync_drops_cached_aggregates() {
    let (_state, store, app) = signed_in();

    let json = get_json(&app, "/api/stats/global").await;
    assert_eq!(json["totalUsers"], 6);

    store.insert_leads(&[Lead {
        id: 100,
        phone_number: "919800000100".into(),
        created_at: "2024-06-02T08:00:00Z".into(),
        updated_at: "2024-06-02T08:00:00Z".into(),
        ..Default::default()
    }]);
    let json = get_json(&app, "/api/stats/global").await;
    assert_eq!(json["totalUsers"], 6, "served from cache");

    let (status, _, body) = send(&app, Method::POST, "/api/sync").await;
    assert_eq!(status, StatusCode::OK);
    let sync: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(sync["cleared"].as_u64().unwrap() >= 1);

    let json = get_json(&app, "/api/stats/global").await;
    assert_eq!(json["totalUsers"], 7);
}

#[tokio::test]
async fn test_report_windows_are_clamped() {
    let (_state, _store, app) = signed_in();

    let daily = get_json(&app, "/api/analytics/daily?days=500").await;
    assert_eq!(daily.as_array().unwrap().len(), 90);

    let daily = get_json(&app, "/api/analytics/daily").await;
    assert_eq!(daily.as_array().unwrap().len(), 7);

    let hourly = get_json(&app, "/api/analytics/hourly").await;
    assert_eq!(hourly.as_array().unwrap().len(), 24);

    let report = get_json(&app, "/api/analytics/monthly-report?months=0").await;
    assert_eq!(report.as_array().unwrap().len(), 1);

    let activity = get_json(&app, "/api/activity/recent?leads=2&chats=3").await;
    assert_eq!(activity["leads"].as_array().unwrap().len(), 2);
    assert_eq!(activity["chats"].as_array().unwrap().len(), 3);
}

// crates/server/src/routes/auth.rs
//! Sign-in endpoints and the middleware gating every data route.
//!
//! The gate is process-wide: one signed-in session covers every client.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use crysta_view_core::AuthUser;
use serde::Deserialize;
use ts_rs::TS;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/sign-in - 200 with the user, 401 on a wrong pair.
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignInRequest>,
) -> ApiResult<Json<AuthUser>> {
    match state.auth.sign_in(&body.email, &body.password)? {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::Unauthorized("Invalid email or password".into())),
    }
}

/// POST /api/auth/sign-out - always 204.
pub async fn sign_out(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.auth.sign_out()?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me - the signed-in user, 401 when signed out.
pub async fn me(State(state): State<Arc<AppState>>) -> ApiResult<Json<AuthUser>> {
    state
        .auth
        .current_user()
        .map(Json)
        .ok_or_else(|| ApiError::Unauthorized("Not signed in".into()))
}

/// Reject the request with 401 unless a session is stored.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.auth.is_authenticated() {
        return Err(ApiError::Unauthorized("Sign in required".into()));
    }
    Ok(next.run(request).await)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/me", get(me))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::state::AppState;

    fn sign_in_request(email: &str, password: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/sign-in")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "email": email, "password": password }).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_demo_pair_signs_in_and_persists() {
        let (state, _store) = AppState::demo(chrono::Utc::now());
        let app = crate::create_app(state.clone());

        let response = app
            .clone()
            .oneshot(sign_in_request("admin@crysta.com", "admin123"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["email"], "admin@crysta.com");
        assert_eq!(json["role"], "admin");
        assert!(state.auth.is_authenticated());

        let response = app
            .oneshot(Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_pair_is_rejected_without_session() {
        let (state, _store) = AppState::demo(chrono::Utc::now());
        let app = crate::create_app(state.clone());

        let response = app
            .oneshot(sign_in_request("admin@crysta.com", "admin1234"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!state.auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let (state, _store) = AppState::demo(chrono::Utc::now());
        state.auth.sign_in("admin@crysta.com", "admin123").unwrap();
        let app = crate::create_app(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/auth/sign-out")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(!state.auth.is_authenticated());

        let response = app
            .oneshot(Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

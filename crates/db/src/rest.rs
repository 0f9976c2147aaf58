// crates/db/src/rest.rs
//! Client for the hosted PostgREST backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::query::Query;
use crate::source::{DataSource, QueryResponse};
use crate::{DbError, DbResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Anonymous API key.
    pub api_key: String,
    pub timeout: Duration,
}

impl RestConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    pub fn new(config: RestConfig) -> DbResult<Self> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(DbError::Config("backend URL is empty".into()));
        }
        if config.api_key.trim().is_empty() {
            return Err(DbError::Config("backend API key is empty".into()));
        }
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
        })
    }

    fn endpoint(&self, query: &Query) -> String {
        format!("{}/rest/v1/{}", self.base_url, query.table.name())
    }
}

#[async_trait]
impl DataSource for RestClient {
    async fn execute(&self, query: &Query) -> DbResult<QueryResponse> {
        let started = Instant::now();
        let method = if query.is_head() { Method::HEAD } else { Method::GET };

        let mut request = self
            .http
            .request(method, self.endpoint(query))
            .query(&query.to_params())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key);
        if query.count.is_some() {
            request = request.header("Prefer", "count=exact");
        }

        let response = request.send().await?;
        let status = response.status();
        let count = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        debug!(
            table = query.table.name(),
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend request"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(remote_error(status, &body));
        }

        if query.is_head() {
            return Ok(QueryResponse {
                rows: Vec::new(),
                count,
            });
        }

        let bytes = response.bytes().await?;
        let rows: Vec<Value> = if bytes.is_empty() {
            Vec::new()
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(QueryResponse { rows, count })
    }
}

/// Total from a `Content-Range` header: `0-49/1234` or `*/1234`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

fn remote_error(status: StatusCode, body: &str) -> DbError {
    match serde_json::from_str::<PostgrestError>(body) {
        Ok(err) => {
            let mut message = err.message.unwrap_or_else(|| status.to_string());
            if let Some(details) = err.details.filter(|d| !d.is_empty()) {
                message = format!("{message} ({details})");
            }
            DbError::Remote {
                status: status.as_u16(),
                code: err.code,
                message,
            }
        }
        Err(_) => DbError::Remote {
            status: status.as_u16(),
            code: None,
            message: if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-49/1234"), Some(1234));
        assert_eq!(parse_content_range("*/1234"), Some(1234));
        assert_eq!(parse_content_range("0-49/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_remote_error_uses_postgrest_body() {
        let err = remote_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"42703","message":"column users.foo does not exist","details":null}"#,
        );
        match err {
            DbError::Remote { status, code, message } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("42703"));
                assert_eq!(message, "column users.foo does not exist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_remote_error_plain_body() {
        let err = remote_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_new_rejects_empty_config() {
        assert!(RestClient::new(RestConfig::new("", "key")).is_err());
        assert!(RestClient::new(RestConfig::new("https://x.supabase.co", " ")).is_err());
        assert!(RestClient::new(RestConfig::new("https://x.supabase.co/", "key")).is_ok());
    }
}

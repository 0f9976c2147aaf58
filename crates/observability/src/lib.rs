// crates/observability/src/lib.rs
//! Tracing setup and request correlation for the crysta-view server.
//!
//! `init_tracing` installs the global subscriber: an `EnvFilter`, a stderr
//! formatter (compact or JSON), an optional daily rolling JSON log file and
//! an optional Sentry layer. `request_id_layers` tags every HTTP request with
//! a ULID `x-request-id` that is echoed back on the response.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use axum::body::Body;
use http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tracing::Span;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// File name prefix of the rolling log file.
pub const LOG_FILE_PREFIX: &str = "crysta-view.log";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{other}` (expected compact or json)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directives; `RUST_LOG` wins when set.
    pub filter: String,
    pub format: LogFormat,
    /// Directory for the daily rolling log file. No file when `None`.
    pub log_dir: Option<PathBuf>,
    /// Forward warnings and errors to Sentry when set.
    pub sentry_dsn: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info,tower_http=warn".to_string(),
            format: LogFormat::Compact,
            log_dir: None,
            sentry_dsn: None,
        }
    }
}

/// Keeps the log file writer and the Sentry client alive. Drop it last.
#[must_use = "dropping the guard stops file logging and Sentry reporting"]
pub struct ObservabilityGuard {
    _file: Option<WorkerGuard>,
    _sentry: Option<sentry::ClientInitGuard>,
}

impl std::fmt::Debug for ObservabilityGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservabilityGuard")
            .field("file", &self._file.is_some())
            .field("sentry", &self._sentry.is_some())
            .finish()
    }
}

type Base = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync>;

fn env_filter(default: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default)
            .with_context(|| format!("invalid log filter `{default}`")),
    }
}

fn init_sentry(dsn: &str) -> anyhow::Result<sentry::ClientInitGuard> {
    let dsn = dsn.parse().context("invalid Sentry DSN")?;
    Ok(sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        release: sentry::release_name!(),
        ..Default::default()
    }))
}

/// Install the global tracing subscriber. Fails if one is already set.
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<ObservabilityGuard> {
    let filter = env_filter(&config.filter)?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(match config.format {
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed(),
    });

    let mut file_guard = None;
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log dir {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    let sentry_guard = match config.sentry_dsn.as_deref().map(str::trim) {
        Some(dsn) if !dsn.is_empty() => {
            let guard = init_sentry(dsn)?;
            layers.push(sentry_tracing::layer().boxed());
            Some(guard)
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()
        .context("tracing subscriber already installed")?;

    tracing::debug!(
        format = ?config.format,
        file = config.log_dir.is_some(),
        sentry = sentry_guard.is_some(),
        "tracing initialized"
    );
    Ok(ObservabilityGuard {
        _file: file_guard,
        _sentry: sentry_guard,
    })
}

/// Generates ULID request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidRequestId;

impl MakeRequestId for UlidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&ulid::Ulid::new().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Set `x-request-id` on incoming requests that lack one, and copy it onto
/// the response. Apply the set layer outermost.
pub fn request_id_layers() -> (SetRequestIdLayer<UlidRequestId>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::new(REQUEST_ID_HEADER, UlidRequestId),
        PropagateRequestIdLayer::new(REQUEST_ID_HEADER),
    )
}

/// Span for one HTTP request, carrying its request id.
pub fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        let (set_id, propagate_id) = request_id_layers();
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(propagate_id)
            .layer(set_id)
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" Compact ".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_ulid_request_id() {
        let request = Request::new(());
        let id = UlidRequestId.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert_eq!(text.len(), 26);
        assert!(text.parse::<ulid::Ulid>().is_ok());
    }

    #[tokio::test]
    async fn test_response_carries_generated_request_id() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = response.headers().get(&REQUEST_ID_HEADER).unwrap();
        assert_eq!(id.len(), 26);
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_kept() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[&REQUEST_ID_HEADER], "abc-123");
    }

    #[test]
    fn test_init_tracing_with_log_dir_installs_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            log_dir: Some(dir.path().join("logs")),
            ..Default::default()
        };
        let guard = init_tracing(&config).unwrap();
        assert!(dir.path().join("logs").is_dir());
        assert!(init_tracing(&LogConfig::default()).is_err());
        drop(guard);
    }

    #[test]
    fn test_bad_filter_is_rejected() {
        // RUST_LOG takes precedence, so only check when it is unset.
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(env_filter("crysta=notalevel").is_err());
        }
    }
}

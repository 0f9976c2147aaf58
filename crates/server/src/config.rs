// crates/server/src/config.rs
//! Command line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crysta_view_db::RestConfig;
use crysta_view_observability::{LogConfig, LogFormat};
use thiserror::Error;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47900;

#[derive(Debug, Parser)]
#[command(name = "crysta-view", version, about = "Analytics API for the Crysta IVF chatbot dashboard")]
pub struct Cli {
    /// Backend project URL.
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Backend anonymous API key.
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Port to listen on [env: CRYSTA_VIEW_PORT, then PORT] [default: 47900]
    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Front-end build to serve; `./dist` is used when present.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Where the signed-in session is persisted.
    #[arg(long, env = "CRYSTA_VIEW_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// `compact` or `json`.
    #[arg(long, default_value = "compact")]
    pub log_format: LogFormat,

    /// Also write JSON logs to a daily rolling file in this directory.
    #[arg(long, env = "CRYSTA_VIEW_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, env = "SENTRY_DSN", hide_env_values = true)]
    pub sentry_dsn: Option<String>,

    /// Serve seeded sample data from memory instead of the backend.
    #[arg(long)]
    pub demo: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("backend URL missing: pass --supabase-url or set SUPABASE_URL (or use --demo)")]
    MissingUrl,
    #[error("backend key missing: pass --supabase-key or set SUPABASE_ANON_KEY (or use --demo)")]
    MissingKey,
}

#[derive(Debug, Clone)]
pub enum Backend {
    Demo,
    Remote(RestConfig),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub backend: Backend,
    pub static_dir: Option<PathBuf>,
    pub session_file: PathBuf,
    pub log: LogConfig,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// `<data dir>/crysta-view/session.json`, or relative to the working
/// directory when the platform has no data dir.
pub fn default_session_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crysta-view")
        .join("session.json")
}

impl ServerConfig {
    /// Resolve the CLI against the secondary environment fallbacks clap does
    /// not cover. `env` looks up one variable.
    pub fn resolve(cli: Cli, env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = if cli.demo {
            Backend::Demo
        } else {
            let url = non_blank(cli.supabase_url)
                .or_else(|| non_blank(env("NEXT_PUBLIC_SUPABASE_URL")))
                .ok_or(ConfigError::MissingUrl)?;
            let key = non_blank(cli.supabase_key)
                .or_else(|| non_blank(env("NEXT_PUBLIC_SUPABASE_ANON_KEY")))
                .ok_or(ConfigError::MissingKey)?;
            Backend::Remote(
                RestConfig::new(url, key)
                    .with_timeout(Duration::from_secs(cli.request_timeout_secs.max(1))),
            )
        };

        let port = cli
            .port
            .or_else(|| env("CRYSTA_VIEW_PORT").and_then(|p| p.trim().parse().ok()))
            .or_else(|| env("PORT").and_then(|p| p.trim().parse().ok()))
            .unwrap_or(DEFAULT_PORT);

        let static_dir = cli.static_dir.or_else(|| {
            let dist = PathBuf::from("dist");
            dist.is_dir().then_some(dist)
        });

        Ok(Self {
            addr: SocketAddr::new(cli.host, port),
            backend,
            static_dir,
            session_file: cli.session_file.unwrap_or_else(default_session_file),
            log: LogConfig {
                format: cli.log_format,
                log_dir: cli.log_dir,
                sentry_dsn: non_blank(cli.sentry_dsn),
                ..LogConfig::default()
            },
        })
    }
}

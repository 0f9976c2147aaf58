// crates/server/src/main.rs
//! crysta-view server binary.
//!
//! Resolves configuration, installs tracing and metrics, then serves the API
//! (and the front-end build when one is found) until Ctrl+C.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use crysta_view_core::{FileStorage, SessionStorage};
use crysta_view_db::Database;
use crysta_view_observability::init_tracing;
use crysta_view_server::{create_app_with_static, init_metrics, AppState, Backend, Cli, ServerConfig};

fn build_state(config: &ServerConfig) -> Result<Arc<AppState>> {
    match &config.backend {
        Backend::Demo => {
            let (state, _store) = AppState::demo(Utc::now());
            tracing::warn!("demo mode: serving seeded sample data from memory");
            Ok(state)
        }
        Backend::Remote(rest) => {
            let db = Database::connect(rest.clone()).context("failed to build backend client")?;
            let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::new(&config.session_file));
            tracing::info!(
                backend = %rest.url,
                session_file = %config.session_file.display(),
                "backend configured"
            );
            Ok(AppState::new(db, storage))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = Instant::now();
    let cli = Cli::parse();
    let config = ServerConfig::resolve(cli, &|key| std::env::var(key).ok())?;

    // Keep the guard alive so buffered log lines and Sentry events flush on exit.
    let _observability = init_tracing(&config.log)?;
    init_metrics();

    eprintln!("\n\u{1f4ca} crysta-view v{}\n", env!("CARGO_PKG_VERSION"));

    let state = build_state(&config)?;
    let app = create_app_with_static(state, config.static_dir.clone());

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    eprintln!(
        "  \u{2713} Ready in {}ms",
        startup_start.elapsed().as_millis()
    );
    eprintln!("  \u{2192} http://{}\n", config.addr);
    if let Some(dir) = &config.static_dir {
        eprintln!("  serving {}\n", dir.display());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

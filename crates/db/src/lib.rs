// crates/db/src/lib.rs
//! Data tier for the dashboard: a PostgREST-shaped data source, paginated
//! scans, and the aggregate/list queries served by the API.

pub mod demo;
pub mod memory;
pub mod query;
mod queries;
pub mod rest;
pub mod scan;
pub mod source;

pub use memory::MemoryStore;
pub use queries::*;
pub use query::{CountMode, Query, Table};
pub use rest::{RestClient, RestConfig};
pub use scan::{scan_pages, ScanOutcome, PAGE_SIZE};
pub use source::{DataSource, QueryResponse};

use std::future::Future;
use std::sync::Arc;

use crysta_view_core::QueryCache;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Failed to decode rows: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid backend configuration: {0}")]
    Config(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Handle over a data source and the shared aggregate cache. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    source: Arc<dyn DataSource>,
    cache: Arc<QueryCache>,
}

impl Database {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self::with_cache(source, Arc::new(QueryCache::new()))
    }

    pub fn with_cache(source: Arc<dyn DataSource>, cache: Arc<QueryCache>) -> Self {
        Self { source, cache }
    }

    /// Connect to the hosted backend.
    pub fn connect(config: RestConfig) -> DbResult<Self> {
        let client = RestClient::new(config)?;
        Ok(Self::new(Arc::new(client)))
    }

    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Drop every cached aggregate. Returns how many entries were dropped.
    pub fn clear_cache(&self) -> usize {
        let dropped = self.cache.clear();
        debug!(dropped, "query cache cleared");
        dropped
    }

    /// Serve `key` from the cache or compute and store it. Failures are not
    /// cached.
    pub(crate) async fn cached<T, F, Fut>(&self, key: &str, compute: F) -> DbResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        if let Some(hit) = self.cache.get::<T>(key) {
            metrics::counter!("crysta_cache_hits_total", "key" => key.to_string()).increment(1);
            return Ok(hit);
        }
        metrics::counter!("crysta_cache_misses_total", "key" => key.to_string()).increment(1);
        let value = compute().await?;
        self.cache.set(key, value.clone());
        Ok(value)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

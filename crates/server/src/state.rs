// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use crysta_view_core::{AuthGate, MemoryStorage, SessionStorage};
use crysta_view_db::{demo, Database, MemoryStore};

/// The auth gate over whichever session storage the server was started with.
pub type Gate = AuthGate<Arc<dyn SessionStorage>>;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Data source plus the shared aggregate cache.
    pub db: Database,
    /// Process-wide sign-in state.
    pub auth: Gate,
}

impl AppState {
    pub fn new(db: Database, storage: Arc<dyn SessionStorage>) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            db,
            auth: AuthGate::new(storage),
        })
    }

    /// State with session storage that lives only as long as the process.
    pub fn in_memory(db: Database) -> Arc<Self> {
        Self::new(db, Arc::new(MemoryStorage::new()))
    }

    /// State over a seeded in-memory store. The store handle is returned so
    /// callers can add rows or inspect executed queries.
    pub fn demo(now: DateTime<Utc>) -> (Arc<Self>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        demo::seed(&store, now);
        let state = Self::in_memory(Database::new(store.clone()));
        (state, store)
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

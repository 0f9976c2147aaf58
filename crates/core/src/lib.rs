// crates/core/src/lib.rs
pub mod auth;
pub mod cache;
pub mod distribution;
pub mod error;
pub mod export;
pub mod stats;
pub mod transform;
pub mod types;

pub use auth::{AuthGate, AuthUser, FileStorage, MemoryStorage, Role, SessionStorage};
pub use cache::{Clock, ManualClock, QueryCache, SystemClock, DEFAULT_TTL};
pub use distribution::{bucket_key, percentage, Bucket, Distribution};
pub use error::*;
pub use stats::*;
pub use types::*;

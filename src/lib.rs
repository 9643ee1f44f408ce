//! Keygate - Count-and-Cooldown Rate Limiting
//!
//! This crate grants or denies a named caller ("key") permission to proceed,
//! based on a hybrid policy: at most `limit` attempts per `period`-long
//! window, with a `duration` cooldown between consecutive attempts. Per-key
//! attempt history is persisted in a replaceable backing store, either an
//! in-process map with background expiry or Redis via serialized snapshots.

pub mod config;
pub mod error;
pub mod limiter;
pub mod record;
pub mod store;

pub use config::{KeygateConfig, LimiterConfig, StoreConfig};
pub use error::{KeygateError, Result};
pub use limiter::Limiter;
pub use record::AttemptRecord;
pub use store::{MemoryStore, RedisStore, Store, StoreBackend, StoreError, StoreType};

//! Attempt record storage.
//!
//! A [`Store`] owns exactly one backend selected by configuration and
//! delegates every operation to it. Backends persist and retrieve one
//! [`AttemptRecord`](crate::record::AttemptRecord) per key; the in-memory
//! backend additionally sweeps stale records in the background, the Redis
//! backend leaves expiry to the server.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::record::AttemptRecord;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the requested key.
    #[error("key not found")]
    KeyNotFound,

    /// The configured backend tag is not recognized.
    #[error("invalid store type: {0}")]
    InvalidType(String),

    /// The stored record no longer matches the expected snapshot.
    #[error("record changed concurrently")]
    Conflict,

    /// Redis I/O errors
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// A stored snapshot could not be encoded or decoded.
    #[error("malformed record snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Supported backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    Memory,
    Redis,
}

impl FromStr for StoreType {
    type Err = StoreError;

    fn from_str(tag: &str) -> Result<Self, StoreError> {
        match tag {
            "memory" => Ok(StoreType::Memory),
            "redis" => Ok(StoreType::Redis),
            other => Err(StoreError::InvalidType(other.to_string())),
        }
    }
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreType::Memory => write!(f, "memory"),
            StoreType::Redis => write!(f, "redis"),
        }
    }
}

/// Trait for attempt record storage backends.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Store a record, overwriting any record already held for the key.
    async fn add(&self, key: &str, record: &AttemptRecord) -> Result<(), StoreError>;

    /// Update the record for an existing key.
    async fn set(&self, key: &str, record: &AttemptRecord) -> Result<(), StoreError>;

    /// Fetch a snapshot copy of the record for a key.
    async fn get(&self, key: &str) -> Result<AttemptRecord, StoreError>;

    /// Replace the record only if the stored state still equals `expected`.
    ///
    /// Fails with [`StoreError::Conflict`] when another caller got there
    /// first, so the caller can re-fetch and retry its decision.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: &AttemptRecord,
        next: &AttemptRecord,
    ) -> Result<(), StoreError>;
}

/// Storage facade owning the configured backend.
pub struct Store {
    backend: Box<dyn StoreBackend>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open the backend selected by `config.backend`.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let backend: Box<dyn StoreBackend> = match config.backend.parse::<StoreType>()? {
            StoreType::Memory => Box::new(MemoryStore::new(config.purge_interval())),
            StoreType::Redis => Box::new(RedisStore::connect(&config.uri).await?),
        };
        Ok(Self { backend })
    }

    /// Wrap a caller-supplied backend.
    pub fn with_backend(backend: Box<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub async fn add(&self, key: &str, record: &AttemptRecord) -> Result<(), StoreError> {
        self.backend.add(key, record).await
    }

    pub async fn set(&self, key: &str, record: &AttemptRecord) -> Result<(), StoreError> {
        self.backend.set(key, record).await
    }

    pub async fn get(&self, key: &str) -> Result<AttemptRecord, StoreError> {
        self.backend.get(key).await
    }

    pub async fn compare_and_set(
        &self,
        key: &str,
        expected: &AttemptRecord,
        next: &AttemptRecord,
    ) -> Result<(), StoreError> {
        self.backend.compare_and_set(key, expected, next).await
    }
}

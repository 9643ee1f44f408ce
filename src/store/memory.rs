//! In-memory attempt record storage.
//!
//! Records live in a map guarded by a reader/writer lock, each record behind
//! its own lock so an update on one key never blocks a read on another. When
//! configured with a purge interval, a background task sweeps out records
//! whose last attempt is older than that interval.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::record::AttemptRecord;

use super::{StoreBackend, StoreError};

type RecordMap = HashMap<String, Arc<RwLock<AttemptRecord>>>;

/// In-process store with optional background expiry.
pub struct MemoryStore {
    records: Arc<RwLock<RecordMap>>,
    purge_task: Option<JoinHandle<()>>,
}

impl MemoryStore {
    /// Create a new store. A non-zero `purge_interval` spawns a sweep task on
    /// the current Tokio runtime; it is stopped when the store is dropped.
    pub fn new(purge_interval: Duration) -> Self {
        let records: Arc<RwLock<RecordMap>> = Arc::new(RwLock::new(HashMap::new()));

        let purge_task = (purge_interval > Duration::ZERO).then(|| {
            let records = Arc::clone(&records);
            tokio::spawn(purge_loop(records, purge_interval))
        });

        Self {
            records,
            purge_task,
        }
    }

    fn slot(&self, key: &str) -> Result<Arc<RwLock<AttemptRecord>>, StoreError> {
        self.records
            .read()
            .get(key)
            .cloned()
            .ok_or(StoreError::KeyNotFound)
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if let Some(task) = self.purge_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn add(&self, key: &str, record: &AttemptRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .insert(key.to_string(), Arc::new(RwLock::new(record.clone())));
        Ok(())
    }

    async fn set(&self, key: &str, record: &AttemptRecord) -> Result<(), StoreError> {
        let slot = self.slot(key)?;
        *slot.write() = record.clone();
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<AttemptRecord, StoreError> {
        let slot = self.slot(key)?;
        let snapshot = slot.read().clone();
        Ok(snapshot)
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &AttemptRecord,
        next: &AttemptRecord,
    ) -> Result<(), StoreError> {
        let slot = self.slot(key)?;
        let mut record = slot.write();
        if *record != *expected {
            return Err(StoreError::Conflict);
        }
        *record = next.clone();
        Ok(())
    }
}

/// Periodically remove records idle for longer than `interval`.
async fn purge_loop(records: Arc<RwLock<RecordMap>>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;

        let now = Utc::now();
        let mut map = records.write();
        let before = map.len();
        map.retain(|_, record| !is_stale(&record.read(), now, interval));
        let purged = before - map.len();
        drop(map);

        if purged > 0 {
            debug!(purged, "removed stale attempt records");
        }
    }
}

/// A record is stale once `now - last_attempt >= interval`. Records that have
/// never been attempted have nothing to keep alive.
fn is_stale(record: &AttemptRecord, now: DateTime<Utc>, interval: Duration) -> bool {
    match record.last_attempt() {
        Some(last) => {
            let idle = now.signed_duration_since(last).to_std().unwrap_or_default();
            idle >= interval
        }
        None => true,
    }
}

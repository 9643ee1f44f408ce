//! Core limiter implementation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::config::{KeygateConfig, LimiterConfig};
use crate::error::{KeygateError, Result};
use crate::record::AttemptRecord;
use crate::store::{Store, StoreError};

/// Grants or denies attempts per key, based on a count-per-window policy
/// combined with a cooldown between consecutive attempts.
///
/// The limiter holds no per-call state beyond the persisted records, so
/// concurrent calls for different keys are fully independent. Updates to a
/// record go through the store's compare-and-set, retrying the whole
/// fetch-decide-swap sequence when another caller raced us on the same key.
pub struct Limiter {
    store: Store,
    config: LimiterConfig,
}

impl Limiter {
    /// Create a limiter with the store selected by `config.store`.
    pub async fn new(config: KeygateConfig) -> Result<Self> {
        let store = Store::open(&config.store).await?;
        Ok(Self::with_store(store, config.limiter))
    }

    /// Create a limiter around a caller-supplied store.
    pub fn with_store(store: Store, config: LimiterConfig) -> Self {
        Self { store, config }
    }

    /// Attempt to take a slot for `key`.
    ///
    /// Allowed attempts return `Ok(())`. A denial returns
    /// [`KeygateError::RateLimit`] carrying the time until the next attempt
    /// can succeed: the remaining cooldown, or the remaining window when the
    /// count is exhausted and the window expires later. Store failures are
    /// surfaced as [`KeygateError::Store`], never as a denial.
    pub async fn take(&self, key: &str) -> Result<()> {
        loop {
            let current = match self.store.get(key).await {
                Ok(record) => Some(record),
                Err(StoreError::KeyNotFound) => None,
                Err(source) => {
                    return Err(KeygateError::Store {
                        retry_after: Duration::ZERO,
                        source,
                    })
                }
            };

            // First ever attempt for this key.
            let Some(current) = current else {
                let mut fresh = AttemptRecord::new();
                fresh.increment();
                debug!(key = %key, "recording first attempt");
                if let Err(source) = self.store.add(key, &fresh).await {
                    return Err(KeygateError::Store {
                        retry_after: self.retry_after(&fresh),
                        source,
                    });
                }
                return Ok(());
            };

            let now = Utc::now();
            trace!(key = %key, count = current.count(), "checking attempt");

            // Cooldown between consecutive attempts, regardless of count.
            if let Some(last) = current.last_attempt() {
                if elapsed_since(now, last) < self.config.duration() {
                    debug!(key = %key, "attempt inside cooldown");
                    return Err(KeygateError::RateLimit {
                        retry_after: self.retry_after(&current),
                    });
                }
            }

            let mut next = current.clone();
            if current.count() >= self.config.limit {
                let within_window = current
                    .first_attempt()
                    .is_some_and(|first| elapsed_since(now, first) < self.config.period());
                if within_window {
                    debug!(key = %key, count = current.count(), "attempt limit exceeded");
                    return Err(KeygateError::RateLimit {
                        retry_after: self.retry_after(&current),
                    });
                }
                next.reset();
            } else {
                next.increment();
            }

            match self.store.compare_and_set(key, &current, &next).await {
                Ok(()) => return Ok(()),
                // Lost the race against another caller or the purge sweep;
                // re-fetch and decide again.
                Err(StoreError::Conflict) | Err(StoreError::KeyNotFound) => {
                    trace!(key = %key, "record changed underneath, retrying");
                    continue;
                }
                Err(source) => {
                    return Err(KeygateError::Store {
                        retry_after: self.retry_after(&next),
                        source,
                    })
                }
            }
        }
    }

    /// Take a slot for `key`, suspending for the reported wait when `take`
    /// fails with a non-denial error.
    ///
    /// A [`KeygateError::RateLimit`] denial fails through unchanged; a hard
    /// limit is not waited out. For other failures, a wait hint beyond the
    /// configured timeout fails with [`KeygateError::Timeout`]; otherwise the
    /// caller is suspended for the hint and resumes with success. The attempt
    /// is not re-validated after the suspension; callers needing a confirmed
    /// slot must call again.
    pub async fn wait(&self, key: &str) -> Result<()> {
        match self.take(key).await {
            Ok(()) => Ok(()),
            Err(err @ KeygateError::RateLimit { .. }) => Err(err),
            Err(err) => {
                let retry_after = err.retry_after();
                if retry_after > self.config.timeout() {
                    return Err(KeygateError::Timeout);
                }
                sleep(retry_after).await;
                Ok(())
            }
        }
    }

    /// Time until the next attempt for this record can succeed: the remaining
    /// cooldown, or the remaining window when the count is exhausted and the
    /// window outlasts the cooldown. Never negative.
    fn retry_after(&self, record: &AttemptRecord) -> Duration {
        let now = Utc::now();

        let mut wait = match record.last_attempt() {
            Some(last) => self
                .config
                .duration()
                .saturating_sub(elapsed_since(now, last)),
            None => Duration::ZERO,
        };

        if record.count() >= self.config.limit {
            if let Some(first) = record.first_attempt() {
                let window = self.config.period().saturating_sub(elapsed_since(now, first));
                if window > wait {
                    wait = window;
                }
            }
        }

        wait
    }
}

fn elapsed_since(now: DateTime<Utc>, earlier: DateTime<Utc>) -> Duration {
    now.signed_duration_since(earlier).to_std().unwrap_or_default()
}

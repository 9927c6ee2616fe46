//! Database Tier - persisted cache rows
//!
//! Wraps a [`CacheStore`] with the tier's TTL and failure policy: every
//! store error is logged and turned into a miss or a no-op, so an outage
//! only shifts load onto the origin.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::{offset, Clock};
use crate::config::DEFAULT_DATABASE_TTL_SECS;
use crate::domain::model::Product;
use crate::domain::ports::{CacheRow, CacheStore};

/// Database Tier
pub struct DatabaseTier {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

impl DatabaseTier {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(store, clock, Duration::from_secs(DEFAULT_DATABASE_TTL_SECS))
    }

    pub fn with_ttl(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Cached products for `key` while the row's `expires_at` lies ahead.
    pub async fn get(&self, key: &str) -> Option<Vec<Product>> {
        match self.store.get(key, self.clock.now()).await {
            Ok(Some(row)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(row.products)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %e, "Database cache read failed, treating as miss");
                None
            }
        }
    }

    /// Upsert the row for `key`, expiring one TTL from now.
    ///
    /// Returns whether the write reached the store.
    pub async fn put(&self, key: &str, products: Vec<Product>) -> bool {
        let now = self.clock.now();
        let row = CacheRow {
            cache_key: key.to_string(),
            products,
            created_at: now,
            expires_at: offset(now, self.ttl),
        };

        match self.store.upsert(row).await {
            Ok(()) => true,
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %e, "Database cache write failed");
                false
            }
        }
    }

    /// Delete the row for `key`. Returns whether a row was removed.
    pub async fn invalidate(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %e, "Database cache invalidation failed");
                false
            }
        }
    }

    /// Bulk-delete rows whose `expires_at` has passed.
    pub async fn sweep_expired(&self) -> u64 {
        match self.store.delete_expired(self.clock.now()).await {
            Ok(removed) => {
                debug!(rows = removed, "Swept expired database cache rows");
                removed
            }
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Database cache sweep failed");
                0
            }
        }
    }

    /// Delete every row.
    pub async fn clear(&self) -> u64 {
        match self.store.clear().await {
            Ok(removed) => removed,
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Database cache clear failed");
                0
            }
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Store failures swallowed by this tier.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================

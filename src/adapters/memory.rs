//! In-memory store adapters
//!
//! Process-local implementations of the store ports. Both can be switched
//! offline to reproduce persistence outages.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::model::{FilterCriteria, Product};
use crate::domain::ports::{CacheRow, CacheStore, ProductStore};
use crate::error::{Error, Result};

/// Operation counters for an in-memory store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub writes: u64,
    pub deletes: u64,
}

// =============================================================================
// Cache store
// =============================================================================

/// In-memory `product_cache` table.
/// Uses DashMap for lock-free concurrent access.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    rows: DashMap<String, CacheRow>,
    offline: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of rows held, live or expired.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw row access, ignoring expiry.
    pub fn row(&self, key: &str) -> Option<CacheRow> {
        self.rows.get(key).map(|r| r.value().clone())
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("cache store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheRow>> {
        self.ensure_online()?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        Ok(self
            .rows
            .get(key)
            .filter(|row| row.is_live(now))
            .map(|row| row.value().clone()))
    }

    async fn upsert(&self, row: CacheRow) -> Result<()> {
        self.ensure_online()?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        self.rows.insert(row.cache_key.clone(), row);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_online()?;
        self.deletes.fetch_add(1, Ordering::Relaxed);

        Ok(self.rows.remove(key).is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.ensure_online()?;

        let mut removed = 0u64;
        self.rows.retain(|_, row| {
            let expired = row.is_expired(now);
            if expired {
                removed += 1;
            }
            !expired
        });

        self.deletes.fetch_add(removed, Ordering::Relaxed);
        Ok(removed)
    }

    async fn clear(&self) -> Result<u64> {
        self.ensure_online()?;

        let removed = self.rows.len() as u64;
        self.rows.clear();
        self.deletes.fetch_add(removed, Ordering::Relaxed);
        Ok(removed)
    }
}

// =============================================================================
// Product store
// =============================================================================

/// In-memory product table.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: RwLock<Vec<Product>>,
    offline: AtomicBool,
    queries: AtomicU64,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
            ..Self::default()
        }
    }

    pub fn insert(&self, product: Product) {
        self.products.write().push(product);
    }

    /// Make every subsequent query fail with `StoreUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of queries received, including failed ones.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn query(&self, criteria: &FilterCriteria) -> Result<Vec<Product>> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("product store offline".into()));
        }

        Ok(self
            .products
            .read()
            .iter()
            .filter(|p| criteria.matches(p))
            .cloned()
            .collect())
    }
}

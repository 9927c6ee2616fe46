//! Cache Manager - Read-Through Product Cache
//!
//! Composes the memory, database and origin tiers. A lookup checks the tiers
//! strictly in order and writes an origin result back into the database and
//! memory tiers before returning it.
//!
//! Concurrent misses for one key are serialized on a per-key gate: the first
//! caller fills the tiers, later callers re-check the memory tier once the
//! gate is released. At most one origin query per key is in flight.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::database::DatabaseTier;
use super::key::CacheKey;
use super::memory::{MemoryConfig, MemoryTier};
use super::metrics::{CacheMetrics, LatencyTracker, MetricsSnapshot};
use super::origin::OriginTier;
use crate::adapters::{InMemoryCacheStore, InMemoryProductStore, NoopEventPublisher};
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::domain::events::CacheEvent;
use crate::domain::model::{FilterCriteria, Product};
use crate::domain::ports::{CacheStore, EventPublisher, ProductStore};
use crate::error::{Error, Result};

/// Tier a lookup was answered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    /// Process-local map
    Memory,
    /// Persisted cache table
    Database,
    /// Product table query
    Origin,
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheTier::Memory => write!(f, "memory"),
            CacheTier::Database => write!(f, "database"),
            CacheTier::Origin => write!(f, "origin"),
        }
    }
}

/// Why a lookup result may be incomplete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum DegradedReason {
    /// The product store query failed; the result is empty.
    OriginUnavailable(String),
}

impl std::fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradedReason::OriginUnavailable(e) => write!(f, "origin unavailable: {}", e),
        }
    }
}

/// Cache lookup result
#[derive(Debug, Clone)]
pub struct LookupResult {
    /// Products for the criteria
    pub products: Vec<Product>,
    /// Which tier answered
    pub tier: CacheTier,
    /// Lookup latency
    pub latency: Duration,
    /// Set when the origin could not be reached
    pub degraded: Option<DegradedReason>,
}

impl LookupResult {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Memory tier diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub memory_size: usize,
    /// Keys in insertion order
    pub memory_keys: Vec<String>,
}

/// Outcome of [`ProductCache::purge_all`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeSummary {
    pub memory_entries: usize,
    pub database_rows: u64,
}

/// Read-through product cache
pub struct ProductCache {
    memory: MemoryTier,
    database: DatabaseTier,
    origin: OriginTier,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventPublisher>,
    /// Per-key fill gates
    in_flight: DashMap<String, Arc<AsyncMutex<()>>>,
    metrics: CacheMetrics,
}

impl std::fmt::Debug for ProductCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProductCache {
    /// Create a cache with default configuration and the system clock.
    pub fn new(cache_store: Arc<dyn CacheStore>, product_store: Arc<dyn ProductStore>) -> Self {
        Self::with_config(CacheConfig::default(), cache_store, product_store)
    }

    /// Create a cache with custom configuration and the system clock.
    pub fn with_config(
        config: CacheConfig,
        cache_store: Arc<dyn CacheStore>,
        product_store: Arc<dyn ProductStore>,
    ) -> Self {
        Self::from_parts(
            config,
            cache_store,
            product_store,
            Arc::new(SystemClock),
            Arc::new(NoopEventPublisher),
        )
    }

    /// Create a cache over in-memory stores seeded with `products` (for testing)
    pub fn in_memory(products: Vec<Product>) -> Self {
        Self::new(
            Arc::new(InMemoryCacheStore::new()),
            Arc::new(InMemoryProductStore::with_products(products)),
        )
    }

    pub fn builder() -> ProductCacheBuilder {
        ProductCacheBuilder::default()
    }

    fn from_parts(
        config: CacheConfig,
        cache_store: Arc<dyn CacheStore>,
        product_store: Arc<dyn ProductStore>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        let memory_config = MemoryConfig {
            ttl: config.memory_ttl(),
            capacity: config.memory_capacity,
        };

        Self {
            memory: MemoryTier::new(memory_config, Arc::clone(&clock)),
            database: DatabaseTier::with_ttl(cache_store, Arc::clone(&clock), config.database_ttl()),
            origin: OriginTier::new(product_store),
            config,
            clock,
            events,
            in_flight: DashMap::new(),
            metrics: CacheMetrics::new(),
        }
    }

    /// Products matching `criteria`, from the first tier that has them.
    pub async fn get_products(&self, criteria: &FilterCriteria) -> Vec<Product> {
        self.lookup(criteria).await.products
    }

    /// Look up `criteria`, reporting the serving tier and any degradation.
    pub async fn lookup(&self, criteria: &FilterCriteria) -> LookupResult {
        let tracker = LatencyTracker::start();
        let key = CacheKey::encode(criteria);

        if let Some(products) = self.memory.get(key.as_str()) {
            return self.finish(&key, products, CacheTier::Memory, None, tracker);
        }

        let release = GateRelease {
            gates: &self.in_flight,
            key: key.as_str(),
        };
        let gate = self.gate(key.as_str());
        let (products, tier, degraded) = {
            let _guard = match gate.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    self.metrics.record_coalesced();
                    debug!(key = %key, "Waiting on in-flight fill");
                    gate.lock().await
                }
            };
            self.fill(&key, criteria).await
        };
        drop(gate);
        drop(release);

        self.finish(&key, products, tier, degraded, tracker)
    }

    /// Miss path, run while holding the key's gate.
    async fn fill(
        &self,
        key: &CacheKey,
        criteria: &FilterCriteria,
    ) -> (Vec<Product>, CacheTier, Option<DegradedReason>) {
        // Another caller may have filled the key while we waited.
        if let Some(products) = self.memory.get(key.as_str()) {
            return (products, CacheTier::Memory, None);
        }

        if let Some(products) = self.database.get(key.as_str()).await {
            self.memory.put(key.as_str(), products.clone());
            return (products, CacheTier::Database, None);
        }

        let (products, degraded) = match self.origin.fetch(criteria).await {
            Ok(products) => (products, None),
            Err(e) => (Vec::new(), Some(DegradedReason::OriginUnavailable(e.to_string()))),
        };

        if let Some(reason) = &degraded {
            self.publish(CacheEvent::LookupDegraded {
                cache_key: key.to_string(),
                reason: reason.to_string(),
                timestamp: self.clock.now(),
            })
            .await;

            if !self.config.cache_degraded_results {
                return (products, CacheTier::Origin, degraded);
            }
        }

        if !self.database.put(key.as_str(), products.clone()).await {
            self.metrics.record_write_back_failure();
        }
        self.memory.put(key.as_str(), products.clone());

        info!(key = %key, count = products.len(), "Filled cache tiers from origin");
        self.publish(CacheEvent::TiersFilled {
            cache_key: key.to_string(),
            product_count: products.len(),
            timestamp: self.clock.now(),
        })
        .await;

        (products, CacheTier::Origin, degraded)
    }

    fn finish(
        &self,
        key: &CacheKey,
        products: Vec<Product>,
        tier: CacheTier,
        degraded: Option<DegradedReason>,
        tracker: LatencyTracker,
    ) -> LookupResult {
        let latency = tracker.elapsed();
        self.metrics.record_lookup(tier, latency);
        if degraded.is_some() {
            self.metrics.record_degraded();
        }

        debug!(key = %key, tier = %tier, count = products.len(), "Product lookup served");

        LookupResult {
            products,
            tier,
            latency,
            degraded,
        }
    }

    fn gate(&self, key: &str) -> Arc<AsyncMutex<()>> {
        self.in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drop every memory tier entry. The database tier is left untouched.
    ///
    /// Returns the number of entries dropped.
    pub async fn clear_all(&self) -> usize {
        let entries = self.memory.clear();
        info!(entries, "Cleared memory tier");

        self.publish(CacheEvent::MemoryCleared {
            entries,
            timestamp: self.clock.now(),
        })
        .await;

        entries
    }

    /// Drop the memory entry and the database row for `criteria`.
    ///
    /// Returns whether either tier held the key.
    pub async fn clear_key(&self, criteria: &FilterCriteria) -> bool {
        let key = CacheKey::encode(criteria);

        let in_memory = self.memory.remove(key.as_str());
        let in_database = self.database.invalidate(key.as_str()).await;
        info!(key = %key, in_memory, in_database, "Invalidated cache key");

        self.publish(CacheEvent::KeyInvalidated {
            cache_key: key.into_string(),
            timestamp: self.clock.now(),
        })
        .await;

        in_memory || in_database
    }

    /// Drop every entry from both the memory and database tiers.
    pub async fn purge_all(&self) -> PurgeSummary {
        let memory_entries = self.memory.clear();
        let database_rows = self.database.clear().await;
        info!(memory_entries, database_rows, "Purged all cache tiers");

        self.publish(CacheEvent::AllPurged {
            memory_entries,
            database_rows,
            timestamp: self.clock.now(),
        })
        .await;

        PurgeSummary {
            memory_entries,
            database_rows,
        }
    }

    /// Delete database rows whose expiry has passed.
    pub async fn sweep_expired(&self) -> u64 {
        let rows = self.database.sweep_expired().await;
        if rows > 0 {
            info!(rows, "Swept expired cache rows");
        }

        self.publish(CacheEvent::ExpiredSwept {
            rows,
            timestamp: self.clock.now(),
        })
        .await;

        rows
    }

    /// Memory tier size and keys.
    pub fn get_stats(&self) -> CacheStats {
        CacheStats {
            memory_size: self.memory.len(),
            memory_keys: self.memory.keys(),
        }
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lookups: self.metrics.lookups(),
            memory_hits: self.metrics.memory_hits(),
            database_hits: self.metrics.database_hits(),
            origin_fills: self.metrics.origin_fills(),
            degraded_lookups: self.metrics.degraded_lookups(),
            coalesced_lookups: self.metrics.coalesced_lookups(),
            write_back_failures: self.metrics.write_back_failures(),
            memory_entries: self.memory.len() as u64,
            memory_capacity: self.memory.config().capacity as u64,
            memory_expirations: self.memory.expirations(),
            memory_evictions: self.memory.evictions(),
            database_errors: self.database.errors(),
            origin_queries: self.origin.queries(),
            origin_errors: self.origin.errors(),
            memory_latency_us: self.metrics.latency(CacheTier::Memory).as_micros() as u64,
            database_latency_us: self.metrics.latency(CacheTier::Database).as_micros() as u64,
            origin_latency_us: self.metrics.latency(CacheTier::Origin).as_micros() as u64,
        }
    }

    /// Number of keys with a fill in progress or awaited.
    pub fn pending_fills(&self) -> usize {
        self.in_flight.len()
    }

    pub fn memory(&self) -> &MemoryTier {
        &self.memory
    }

    pub fn database(&self) -> &DatabaseTier {
        &self.database
    }

    pub fn origin(&self) -> &OriginTier {
        &self.origin
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    async fn publish(&self, event: CacheEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.events.publish(event).await {
            warn!(event_type, error = %e, "Failed to publish cache event");
        }
    }
}

/// Removes a key's fill gate on drop once no other caller holds it.
///
/// Declared before the gate handle in `lookup` so the handle is dropped
/// first, including when the lookup future is cancelled mid-fill.
struct GateRelease<'a> {
    gates: &'a DashMap<String, Arc<AsyncMutex<()>>>,
    key: &'a str,
}

impl Drop for GateRelease<'_> {
    fn drop(&mut self) {
        self.gates
            .remove_if(self.key, |_, gate| Arc::strong_count(gate) == 1);
    }
}

/// Builder for [`ProductCache`]
#[derive(Default)]
pub struct ProductCacheBuilder {
    config: Option<CacheConfig>,
    cache_store: Option<Arc<dyn CacheStore>>,
    product_store: Option<Arc<dyn ProductStore>>,
    clock: Option<Arc<dyn Clock>>,
    events: Option<Arc<dyn EventPublisher>>,
}

impl ProductCacheBuilder {
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    pub fn product_store(mut self, store: Arc<dyn ProductStore>) -> Self {
        self.product_store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate the configuration and assemble the cache.
    pub fn build(self) -> Result<ProductCache> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let cache_store = self
            .cache_store
            .ok_or_else(|| Error::Config("cache store is required".into()))?;
        let product_store = self
            .product_store
            .ok_or_else(|| Error::Config("product store is required".into()))?;

        Ok(ProductCache::from_parts(
            config,
            cache_store,
            product_store,
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            self.events.unwrap_or_else(|| Arc::new(NoopEventPublisher)),
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryEventCollector;
    use crate::clock::ManualClock;
    use crate::domain::model::Gender;
    use assert_matches::assert_matches;

    struct Harness {
        cache: ProductCache,
        cache_store: Arc<InMemoryCacheStore>,
        product_store: Arc<InMemoryProductStore>,
        clock: Arc<ManualClock>,
        events: Arc<InMemoryEventCollector>,
    }

    fn catalog() -> Vec<Product> {
        vec![
            Product::new("d-1", "Wrap dress", "dresses", 59.0).with_gender("female"),
            Product::new("d-2", "Slip dress", "dresses", 129.0).with_gender("female"),
            Product::new("t-1", "Oxford shirt", "tops", 45.0).with_gender("male"),
            Product::new("a-1", "Tote", "accessories", 35.0).with_gender("unisex"),
        ]
    }

    fn harness_with(config: CacheConfig) -> Harness {
        let cache_store = Arc::new(InMemoryCacheStore::new());
        let product_store = Arc::new(InMemoryProductStore::with_products(catalog()));
        let clock = Arc::new(ManualClock::starting_now());
        let events = Arc::new(InMemoryEventCollector::new());

        let cache = ProductCache::builder()
            .config(config)
            .cache_store(cache_store.clone())
            .product_store(product_store.clone())
            .clock(clock.clone())
            .events(events.clone())
            .build()
            .unwrap();

        Harness {
            cache,
            cache_store,
            product_store,
            clock,
            events,
        }
    }

    fn harness() -> Harness {
        harness_with(CacheConfig::default())
    }

    fn dresses() -> FilterCriteria {
        FilterCriteria::new()
            .with_gender(Gender::Female)
            .with_budget(Some(0.0), Some(100.0))
            .with_categories(["dresses"])
    }

    #[tokio::test]
    async fn test_cold_lookup_fills_both_tiers() {
        let h = harness();

        let result = h.cache.lookup(&dresses()).await;
        assert_eq!(result.tier, CacheTier::Origin);
        assert_eq!(result.products.len(), 1);
        assert_eq!(result.products[0].id, "d-1");
        assert!(!result.is_degraded());

        let key = CacheKey::encode(&dresses());
        assert_eq!(h.cache.get_stats().memory_keys, vec![key.to_string()]);
        assert!(h.cache_store.row(key.as_str()).is_some());
        assert_eq!(h.events.events_of_type("TiersFilled").len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_lookup_hits_memory() {
        let h = harness();
        h.cache.get_products(&dresses()).await;

        let result = h.cache.lookup(&dresses()).await;
        assert_eq!(result.tier, CacheTier::Memory);
        assert_eq!(h.product_store.query_count(), 1);
        assert_eq!(h.cache_store.stats().reads, 1);
    }

    #[tokio::test]
    async fn test_stale_memory_falls_back_to_database() {
        let h = harness();
        h.cache.get_products(&dresses()).await;

        h.clock.advance(Duration::from_secs(6 * 60));

        let result = h.cache.lookup(&dresses()).await;
        assert_eq!(result.tier, CacheTier::Database);
        assert_eq!(h.product_store.query_count(), 1);

        // memory repopulated
        let result = h.cache.lookup(&dresses()).await;
        assert_eq!(result.tier, CacheTier::Memory);
    }

    #[tokio::test]
    async fn test_both_tiers_expired_queries_origin() {
        let h = harness();
        h.cache.get_products(&dresses()).await;

        h.clock.advance(Duration::from_secs(31 * 60));

        let result = h.cache.lookup(&dresses()).await;
        assert_eq!(result.tier, CacheTier::Origin);
        assert_eq!(h.product_store.query_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_cached() {
        let h = harness();
        let criteria = FilterCriteria::new().with_categories(["swimwear"]);

        assert!(h.cache.get_products(&criteria).await.is_empty());
        let result = h.cache.lookup(&criteria).await;
        assert_eq!(result.tier, CacheTier::Memory);
        assert!(result.products.is_empty());
        assert_eq!(h.product_store.query_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_all_keeps_database_rows() {
        let h = harness();
        h.cache.get_products(&dresses()).await;

        assert_eq!(h.cache.clear_all().await, 1);
        assert_eq!(h.cache.get_stats().memory_size, 0);

        let key = CacheKey::encode(&dresses());
        assert!(h.cache.database().get(key.as_str()).await.is_some());

        let result = h.cache.lookup(&dresses()).await;
        assert_eq!(result.tier, CacheTier::Database);
    }

    #[tokio::test]
    async fn test_clear_key_drops_both_tiers() {
        let h = harness();
        h.cache.get_products(&dresses()).await;

        assert!(h.cache.clear_key(&dresses()).await);
        assert!(!h.cache.clear_key(&dresses()).await);
        assert_eq!(h.cache_store.len(), 0);

        let result = h.cache.lookup(&dresses()).await;
        assert_eq!(result.tier, CacheTier::Origin);
        assert_eq!(h.events.events_of_type("KeyInvalidated").len(), 2);
    }

    #[tokio::test]
    async fn test_purge_all() {
        let h = harness();
        h.cache.get_products(&dresses()).await;
        h.cache.get_products(&FilterCriteria::new()).await;

        let summary = h.cache.purge_all().await;
        assert_eq!(
            summary,
            PurgeSummary {
                memory_entries: 2,
                database_rows: 2
            }
        );
        assert!(h.cache_store.is_empty());
        assert_eq!(h.cache.get_stats().memory_size, 0);
    }

    #[tokio::test]
    async fn test_sweep_expired_rows() {
        let h = harness();
        h.cache.get_products(&dresses()).await;
        h.clock.advance(Duration::from_secs(20 * 60));
        h.cache.get_products(&FilterCriteria::new()).await;
        h.clock.advance(Duration::from_secs(11 * 60));

        assert_eq!(h.cache.sweep_expired().await, 1);
        assert_eq!(h.cache_store.len(), 1);
        assert_eq!(h.events.events_of_type("ExpiredSwept").len(), 1);
    }

    #[tokio::test]
    async fn test_origin_outage_is_degraded() {
        let h = harness();
        h.product_store.set_offline(true);

        let result = h.cache.lookup(&dresses()).await;
        assert!(result.products.is_empty());
        assert_eq!(result.tier, CacheTier::Origin);
        assert_matches!(result.degraded, Some(DegradedReason::OriginUnavailable(_)));

        // written back by default
        let result = h.cache.lookup(&dresses()).await;
        assert_eq!(result.tier, CacheTier::Memory);
        assert!(!result.is_degraded());
        assert_eq!(h.events.events_of_type("LookupDegraded").len(), 1);
        assert_eq!(h.cache.metrics().degraded_lookups, 1);
    }

    #[tokio::test]
    async fn test_degraded_results_not_cached_when_disabled() {
        let h = harness_with(CacheConfig {
            cache_degraded_results: false,
            ..CacheConfig::default()
        });
        h.product_store.set_offline(true);

        assert!(h.cache.lookup(&dresses()).await.is_degraded());
        assert!(h.cache.get_stats().memory_keys.is_empty());
        assert!(h.cache_store.is_empty());

        h.product_store.set_offline(false);
        let result = h.cache.lookup(&dresses()).await;
        assert_eq!(result.tier, CacheTier::Origin);
        assert_eq!(result.products.len(), 1);
    }

    #[tokio::test]
    async fn test_database_outage_falls_through_to_origin() {
        let h = harness();
        h.cache_store.set_offline(true);

        let result = h.cache.lookup(&dresses()).await;
        assert_eq!(result.tier, CacheTier::Origin);
        assert_eq!(result.products.len(), 1);
        assert!(!result.is_degraded());
        assert_eq!(h.cache.metrics().write_back_failures, 1);

        // memory still filled
        assert_eq!(h.cache.lookup(&dresses()).await.tier, CacheTier::Memory);
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce() {
        let h = harness();
        let cache = Arc::new(h.cache);

        let lookups: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_products(&dresses()).await })
            })
            .collect();

        for result in futures::future::join_all(lookups).await {
            assert_eq!(result.unwrap().len(), 1);
        }

        assert_eq!(h.product_store.query_count(), 1);
        assert_eq!(cache.pending_fills(), 0);
    }

    /// Origin that never answers.
    struct StalledProductStore;

    #[async_trait::async_trait]
    impl ProductStore for StalledProductStore {
        async fn query(&self, _criteria: &FilterCriteria) -> Result<Vec<Product>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_lookups_release_gate() {
        let cache = Arc::new(ProductCache::new(
            Arc::new(InMemoryCacheStore::new()),
            Arc::new(StalledProductStore),
        ));

        // one caller cancelled mid-fill, one cancelled while waiting on the gate
        let filling = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.lookup(&dresses()).await }
        });
        tokio::task::yield_now().await;
        let waiting = tokio::time::timeout(
            Duration::from_millis(20),
            cache.lookup(&dresses()),
        )
        .await;
        assert!(waiting.is_err());
        assert_eq!(cache.pending_fills(), 1);

        filling.abort();
        let _ = filling.await;

        assert_eq!(cache.pending_fills(), 0);
    }

    #[tokio::test]
    async fn test_metrics_snapshot() {
        let h = harness();
        h.cache.get_products(&dresses()).await;
        h.cache.get_products(&dresses()).await;
        h.clock.advance(Duration::from_secs(301));
        h.cache.get_products(&dresses()).await;

        let snapshot = h.cache.metrics();
        assert_eq!(snapshot.lookups, 3);
        assert_eq!(snapshot.origin_fills, 1);
        assert_eq!(snapshot.memory_hits, 1);
        assert_eq!(snapshot.database_hits, 1);
        assert_eq!(snapshot.memory_expirations, 1);
        assert_eq!(snapshot.memory_capacity, 50);
        assert_eq!(snapshot.origin_queries, 1);
    }

    #[test]
    fn test_builder_requires_stores() {
        let result = ProductCache::builder().build();
        assert_matches!(result, Err(Error::Config(_)));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = ProductCache::builder()
            .config(CacheConfig {
                memory_capacity: 0,
                ..CacheConfig::default()
            })
            .cache_store(Arc::new(InMemoryCacheStore::new()))
            .product_store(Arc::new(InMemoryProductStore::new()))
            .build();
        assert_matches!(result, Err(Error::Config(_)));
    }

    #[tokio::test]
    async fn test_in_memory_constructor() {
        let cache = ProductCache::in_memory(catalog());
        assert_eq!(cache.get_products(&FilterCriteria::new()).await.len(), 4);
    }

    #[test]
    fn test_cache_tier_display() {
        assert_eq!(CacheTier::Memory.to_string(), "memory");
        assert_eq!(CacheTier::Database.to_string(), "database");
        assert_eq!(CacheTier::Origin.to_string(), "origin");
    }
}

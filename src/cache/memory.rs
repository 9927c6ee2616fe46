//! Memory Tier - process-local hot cache
//!
//! Fixed TTL with lazy expiry (a stale entry is dropped when it is read, no
//! background sweep) and a bounded entry count.
//!
//! # Eviction
//!
//! When an insert pushes the tier past its capacity the earliest-inserted key
//! still present is dropped. Reads do not refresh a key's position and
//! overwriting a key keeps its original position, so a frequently read key
//! that was inserted long ago is still the first candidate.
//!
//! The read-check-evict-write sequence runs under a single mutex.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::trace;

use crate::clock::{elapsed, Clock};
use crate::config::{DEFAULT_MEMORY_CAPACITY, DEFAULT_MEMORY_TTL_SECS};
use crate::domain::model::Product;

/// Memory tier configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Entry time-to-live
    pub ttl: Duration,
    /// Maximum number of entries
    pub capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_MEMORY_TTL_SECS),
            capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

/// Cached result set with its creation instant
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub data: Vec<Product>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, MemoryEntry>,
    /// Keys in insertion order
    order: VecDeque<String>,
}

impl Inner {
    fn remove(&mut self, key: &str) -> Option<MemoryEntry> {
        let entry = self.entries.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(entry)
    }
}

/// Memory Tier
pub struct MemoryTier {
    inner: Mutex<Inner>,
    config: MemoryConfig,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryTier {
    pub fn new(config: MemoryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            config,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Cached data for `key` if it is younger than the TTL.
    ///
    /// A stale entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<Vec<Product>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let fresh = match inner.entries.get(key) {
            Some(entry) => elapsed(entry.timestamp, now) < self.config.ttl,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if !fresh {
            inner.remove(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key, "Memory entry expired");
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        inner.entries.get(key).map(|entry| entry.data.clone())
    }

    /// Insert or overwrite `key`, stamped with the current time.
    pub fn put(&self, key: &str, products: Vec<Product>) {
        let entry = MemoryEntry {
            data: products,
            timestamp: self.clock.now(),
        };

        let mut inner = self.inner.lock();
        if inner.entries.insert(key.to_string(), entry).is_none() {
            inner.order.push_back(key.to_string());
        }

        while inner.entries.len() > self.config.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(key = %oldest, "Memory entry evicted");
        }
    }

    /// Remove `key`. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    /// Drop every entry. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.entries.len();
        inner.entries.clear();
        inner.order.clear();
        count
    }

    /// Whether `key` is held, fresh or stale.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Raw entry access, ignoring TTL.
    pub fn peek(&self, key: &str) -> Option<MemoryEntry> {
        self.inner.lock().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().order.iter().cloned().collect()
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn products(n: usize) -> Vec<Product> {
        (0..n)
            .map(|i| Product::new(format!("p-{}", i), "Tee", "tops", 10.0 + i as f64))
            .collect()
    }

    fn tier() -> (MemoryTier, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (MemoryTier::new(MemoryConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn test_put_get() {
        let (tier, _) = tier();
        tier.put("k", products(3));

        assert_eq!(tier.get("k"), Some(products(3)));
        assert_eq!(tier.hits(), 1);
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_miss() {
        let (tier, _) = tier();
        assert!(tier.get("absent").is_none());
        assert_eq!(tier.misses(), 1);
        assert_eq!(tier.hit_ratio(), 0.0);
    }

    #[test]
    fn test_ttl_boundary() {
        let (tier, clock) = tier();
        tier.put("k", products(1));

        clock.advance(Duration::from_secs(299));
        assert!(tier.get("k").is_some());

        clock.advance(Duration::from_secs(1));
        assert!(tier.get("k").is_none());
        // stale entry removed on read
        assert!(!tier.contains("k"));
        assert_eq!(tier.expirations(), 1);
    }

    #[test]
    fn test_capacity_evicts_first_inserted() {
        let (tier, _) = tier();
        for i in 0..51 {
            tier.put(&format!("key-{}", i), products(1));
        }

        assert_eq!(tier.len(), 50);
        assert!(!tier.contains("key-0"));
        assert!(tier.contains("key-1"));
        assert!(tier.contains("key-50"));
        assert_eq!(tier.evictions(), 1);
    }

    #[test]
    fn test_reads_do_not_protect_from_eviction() {
        let (tier, _) = tier();
        tier.put("hot", products(1));
        for i in 0..49 {
            tier.put(&format!("key-{}", i), products(1));
        }
        for _ in 0..10 {
            assert!(tier.get("hot").is_some());
        }

        tier.put("one-more", products(1));
        assert!(!tier.contains("hot"));
        assert_eq!(tier.len(), 50);
    }

    #[test]
    fn test_overwrite_keeps_insertion_position() {
        let clock = Arc::new(ManualClock::starting_now());
        let tier = MemoryTier::new(
            MemoryConfig {
                ttl: Duration::from_secs(300),
                capacity: 2,
            },
            clock,
        );

        tier.put("a", products(1));
        tier.put("b", products(1));
        tier.put("a", products(2));
        tier.put("c", products(1));

        assert_eq!(tier.keys(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_overwrite_refreshes_timestamp() {
        let (tier, clock) = tier();
        tier.put("k", products(1));
        clock.advance(Duration::from_secs(200));
        tier.put("k", products(2));
        clock.advance(Duration::from_secs(200));

        assert_eq!(tier.get("k"), Some(products(2)));
    }

    #[test]
    fn test_remove_and_clear() {
        let (tier, _) = tier();
        tier.put("a", products(1));
        tier.put("b", products(1));

        assert!(tier.remove("a"));
        assert!(!tier.remove("a"));
        assert_eq!(tier.keys(), vec!["b".to_string()]);

        assert_eq!(tier.clear(), 1);
        assert!(tier.is_empty());
        assert!(tier.keys().is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let (tier, _) = tier();
        let tier = Arc::new(tier);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let tier = Arc::clone(&tier);
                thread::spawn(move || {
                    for i in 0..100 {
                        let key = format!("k-{}-{}", t, i);
                        tier.put(&key, products(1));
                        tier.get(&key);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tier.len(), 50);
        assert_eq!(tier.keys().len(), 50);
        assert_eq!(tier.evictions(), 750);
    }
}

//! Cache Metrics Collection
//!
//! Lookup outcome counters and per-tier latency averages for monitoring the
//! product cache, with Prometheus text exposition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use serde::{Deserialize, Serialize};

use super::manager::CacheTier;
use crate::error::{Error, Result};

/// Cache metrics collector
#[derive(Debug, Default)]
pub struct CacheMetrics {
    lookups: AtomicU64,
    memory_hits: AtomicU64,
    database_hits: AtomicU64,
    origin_fills: AtomicU64,
    degraded_lookups: AtomicU64,
    coalesced_lookups: AtomicU64,
    write_back_failures: AtomicU64,

    // Lookup latencies (microseconds, exponential moving average)
    memory_latency_us: AtomicU64,
    database_latency_us: AtomicU64,
    origin_latency_us: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed lookup served by `tier`.
    pub fn record_lookup(&self, tier: CacheTier, latency: Duration) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let (counter, latency_us) = match tier {
            CacheTier::Memory => (&self.memory_hits, &self.memory_latency_us),
            CacheTier::Database => (&self.database_hits, &self.database_latency_us),
            CacheTier::Origin => (&self.origin_fills, &self.origin_latency_us),
        };
        counter.fetch_add(1, Ordering::Relaxed);
        update_latency_ema(latency_us, latency);
    }

    pub fn record_degraded(&self) {
        self.degraded_lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// A lookup waited on another caller's in-flight fill.
    pub fn record_coalesced(&self) {
        self.coalesced_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_back_failure(&self) {
        self.write_back_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn memory_hits(&self) -> u64 {
        self.memory_hits.load(Ordering::Relaxed)
    }

    pub fn database_hits(&self) -> u64 {
        self.database_hits.load(Ordering::Relaxed)
    }

    pub fn origin_fills(&self) -> u64 {
        self.origin_fills.load(Ordering::Relaxed)
    }

    pub fn degraded_lookups(&self) -> u64 {
        self.degraded_lookups.load(Ordering::Relaxed)
    }

    pub fn coalesced_lookups(&self) -> u64 {
        self.coalesced_lookups.load(Ordering::Relaxed)
    }

    pub fn write_back_failures(&self) -> u64 {
        self.write_back_failures.load(Ordering::Relaxed)
    }

    pub fn latency(&self, tier: CacheTier) -> Duration {
        let target = match tier {
            CacheTier::Memory => &self.memory_latency_us,
            CacheTier::Database => &self.database_latency_us,
            CacheTier::Origin => &self.origin_latency_us,
        };
        Duration::from_micros(target.load(Ordering::Relaxed))
    }
}

fn update_latency_ema(target: &AtomicU64, duration: Duration) {
    let new_us = duration.as_micros() as u64;
    let alpha = 0.1; // EMA smoothing factor

    loop {
        let current = target.load(Ordering::Relaxed);
        let updated = if current == 0 {
            new_us
        } else {
            ((1.0 - alpha) * current as f64 + alpha * new_us as f64) as u64
        };

        if target
            .compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            break;
        }
    }
}

/// Point-in-time view of the cache counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub lookups: u64,
    pub memory_hits: u64,
    pub database_hits: u64,
    pub origin_fills: u64,
    pub degraded_lookups: u64,
    pub coalesced_lookups: u64,
    pub write_back_failures: u64,

    pub memory_entries: u64,
    pub memory_capacity: u64,
    pub memory_expirations: u64,
    pub memory_evictions: u64,
    pub database_errors: u64,
    pub origin_queries: u64,
    pub origin_errors: u64,

    pub memory_latency_us: u64,
    pub database_latency_us: u64,
    pub origin_latency_us: u64,
}

impl MetricsSnapshot {
    /// Share of lookups answered without an origin query.
    pub fn hit_ratio(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            (self.memory_hits + self.database_hits) as f64 / self.lookups as f64
        }
    }

    /// Render in the Prometheus text exposition format.
    pub fn to_prometheus_text(&self) -> Result<String> {
        let registry = Registry::new();

        let counters: [(&str, &str, u64); 11] = [
            ("fitfi_cache_lookups_total", "Product lookups served", self.lookups),
            ("fitfi_cache_memory_hits_total", "Lookups served by the memory tier", self.memory_hits),
            ("fitfi_cache_database_hits_total", "Lookups served by the database tier", self.database_hits),
            ("fitfi_cache_origin_fills_total", "Lookups filled from the origin", self.origin_fills),
            ("fitfi_cache_degraded_lookups_total", "Lookups answered while the origin was unreachable", self.degraded_lookups),
            ("fitfi_cache_coalesced_lookups_total", "Lookups that waited on an in-flight fill", self.coalesced_lookups),
            ("fitfi_cache_write_back_failures_total", "Failed database write-backs", self.write_back_failures),
            ("fitfi_cache_memory_expirations_total", "Memory entries dropped by TTL", self.memory_expirations),
            ("fitfi_cache_memory_evictions_total", "Memory entries dropped by capacity", self.memory_evictions),
            ("fitfi_cache_database_errors_total", "Swallowed database tier errors", self.database_errors),
            ("fitfi_cache_origin_errors_total", "Failed origin queries", self.origin_errors),
        ];

        for (name, help, value) in counters {
            let counter = IntCounter::new(name, help).map_err(prometheus_error)?;
            counter.inc_by(value);
            registry
                .register(Box::new(counter))
                .map_err(prometheus_error)?;
        }

        let gauges: [(&str, &str, u64); 5] = [
            ("fitfi_cache_memory_entries", "Entries held by the memory tier", self.memory_entries),
            ("fitfi_cache_memory_capacity", "Memory tier capacity", self.memory_capacity),
            ("fitfi_cache_memory_latency_us", "Memory hit latency (EMA, microseconds)", self.memory_latency_us),
            ("fitfi_cache_database_latency_us", "Database hit latency (EMA, microseconds)", self.database_latency_us),
            ("fitfi_cache_origin_latency_us", "Origin fill latency (EMA, microseconds)", self.origin_latency_us),
        ];

        for (name, help, value) in gauges {
            let gauge = IntGauge::new(name, help).map_err(prometheus_error)?;
            gauge.set(value as i64);
            registry.register(Box::new(gauge)).map_err(prometheus_error)?;
        }

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&registry.gather(), &mut buffer)
            .map_err(prometheus_error)?;

        String::from_utf8(buffer).map_err(|e| Error::Internal(format!("metrics encoding: {}", e)))
    }
}

fn prometheus_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("prometheus: {}", e))
}

/// Latency tracker for timing operations
pub struct LatencyTracker {
    start: Instant,
}

impl LatencyTracker {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

// =============================================================================
// Tests
// =============================================================================

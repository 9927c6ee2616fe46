//! Multi-Tier Product Cache
//!
//! Read-through cache for product listings with write-back on miss.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      ProductCache (manager)                      │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  Memory Tier          │ Database Tier        │ Origin Tier       │
//! │  ┌────────────────┐   │ ┌────────────────┐   │ ┌──────────────┐  │
//! │  │ HashMap +      │   │ │ product_cache  │   │ │ products     │  │
//! │  │ insertion order│   │ │ table          │   │ │ table query  │  │
//! │  │ TTL 5 min      │   │ │ TTL 30 min     │   │ │ in stock     │  │
//! │  │ 50 entries     │   │ │ swept          │   │ │ only         │  │
//! │  └────────────────┘   │ └────────────────┘   │ └──────────────┘  │
//! │         ▲             │         ▲            │        │          │
//! │         └─────────────┴─────────┴────────────┴────────┘          │
//! │                     write-back on origin fill                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All tiers share one [`CacheKey`] derived from the filter criteria.
//!
//! # Failure handling
//!
//! - Database errors are logged and read as misses or no-ops
//! - Origin errors yield an empty, degraded result
//! - Nothing in the lookup path returns an error

mod database;
mod key;
mod manager;
mod memory;
mod metrics;
mod origin;
mod proptest;
mod sweeper;

pub use database::DatabaseTier;
pub use key::{CacheKey, ALL, DEFAULT_MAX_PRICE, KEY_PREFIX};
pub use manager::{
    CacheStats, CacheTier, DegradedReason, LookupResult, ProductCache, ProductCacheBuilder,
    PurgeSummary,
};
pub use memory::{MemoryConfig, MemoryEntry, MemoryTier};
pub use metrics::{CacheMetrics, LatencyTracker, MetricsSnapshot};
pub use origin::OriginTier;
pub use sweeper::CacheSweeper;

//! Domain Ports (Port/Adapter Pattern)
//!
//! The cache tiers depend on these traits; adapters provide the in-memory
//! and SQLite implementations.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Cache Orchestrator                    │
//! │   Memory Tier ──▶ Database Tier ──▶ Origin Query Tier     │
//! └──────────────────────────────────────────────────────────┘
//!                 │                  │
//!                 ▼                  ▼
//!            CacheStore         ProductStore       EventPublisher
//!
//! Profile sync:  LocalProfileStore ◀── ProfileSync ──▶ RemoteProfileStore
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::CacheEvent;
use super::model::{FilterCriteria, Product};
use super::profile::{LocalProfile, QuizAnswerRow, StyleProfile, SyncState};
use crate::error::Result;

// =============================================================================
// Persisted cache rows
// =============================================================================

/// Row of the persisted `product_cache` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRow {
    /// Encoded filter criteria (unique)
    pub cache_key: String,
    /// Cached result set
    pub products: Vec<Product>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheRow {
    /// A row is readable while `expires_at > now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// A row is swept once `expires_at < now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Port for the persisted product cache table.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the row for `key` if it is still live at `now`.
    ///
    /// Expired rows are reported as absent but left in place.
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheRow>>;

    /// Insert or replace the row for `row.cache_key`.
    async fn upsert(&self, row: CacheRow) -> Result<()>;

    /// Delete the row for `key`. Returns whether a row existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete every row with `expires_at < now`. Returns the number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Delete every row. Returns the number removed.
    async fn clear(&self) -> Result<u64>;
}

// =============================================================================
// Product origin
// =============================================================================

/// Port for the product table (source of truth).
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Filtered read of in-stock products matching `criteria`.
    async fn query(&self, criteria: &FilterCriteria) -> Result<Vec<Product>>;
}

// =============================================================================
// Events
// =============================================================================

/// Port for publishing cache events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: CacheEvent) -> Result<()>;
}

// =============================================================================
// Profile sync
// =============================================================================

/// Port for the device-local profile snapshot and its sync bookkeeping.
#[async_trait]
pub trait LocalProfileStore: Send + Sync {
    async fn load(&self) -> Result<Option<LocalProfile>>;

    async fn save(&self, profile: &LocalProfile) -> Result<()>;

    async fn sync_state(&self) -> Result<SyncState>;

    async fn set_sync_state(&self, state: SyncState) -> Result<()>;

    /// Anonymous session id, if one was issued.
    async fn session_id(&self) -> Result<Option<String>>;

    async fn set_session_id(&self, session_id: &str) -> Result<()>;

    /// Drop the snapshot and sync state. The session id is kept.
    async fn clear_profile(&self) -> Result<()>;
}

/// Port for the shared `style_profiles` and `quiz_answers` tables.
#[async_trait]
pub trait RemoteProfileStore: Send + Sync {
    /// Most recently created profile owned by `user_id`.
    async fn latest_for_user(&self, user_id: &str) -> Result<Option<StyleProfile>>;

    /// Most recently created profile of an anonymous session.
    async fn latest_for_session(&self, session_id: &str) -> Result<Option<StyleProfile>>;

    /// Individually stored answers of `user_id`.
    async fn answers_for_user(&self, user_id: &str) -> Result<Vec<QuizAnswerRow>>;

    /// Store a new profile. Returns its id.
    async fn insert_profile(&self, profile: &StyleProfile) -> Result<i64>;

    /// Replace the profile with `id`.
    async fn update_profile(&self, id: i64, profile: &StyleProfile) -> Result<()>;
}

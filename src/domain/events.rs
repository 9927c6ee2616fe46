//! Cache events
//!
//! Immutable records of cache state changes, published through the
//! [`EventPublisher`](super::ports::EventPublisher) port for audit logging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Significant cache state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CacheEvent {
    /// An origin query result was written back into the tiers.
    TiersFilled {
        cache_key: String,
        product_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A single key was dropped from memory and database.
    KeyInvalidated {
        cache_key: String,
        timestamp: DateTime<Utc>,
    },

    /// The memory tier was emptied.
    MemoryCleared {
        entries: usize,
        timestamp: DateTime<Utc>,
    },

    /// Memory and database tiers were emptied.
    AllPurged {
        memory_entries: usize,
        database_rows: u64,
        timestamp: DateTime<Utc>,
    },

    /// Expired database rows were removed.
    ExpiredSwept {
        rows: u64,
        timestamp: DateTime<Utc>,
    },

    /// A lookup was served without a reachable origin.
    LookupDegraded {
        cache_key: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl CacheEvent {
    /// Variant name, as used in the serialized `type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::TiersFilled { .. } => "TiersFilled",
            CacheEvent::KeyInvalidated { .. } => "KeyInvalidated",
            CacheEvent::MemoryCleared { .. } => "MemoryCleared",
            CacheEvent::AllPurged { .. } => "AllPurged",
            CacheEvent::ExpiredSwept { .. } => "ExpiredSwept",
            CacheEvent::LookupDegraded { .. } => "LookupDegraded",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CacheEvent::TiersFilled { timestamp, .. }
            | CacheEvent::KeyInvalidated { timestamp, .. }
            | CacheEvent::MemoryCleared { timestamp, .. }
            | CacheEvent::AllPurged { timestamp, .. }
            | CacheEvent::ExpiredSwept { timestamp, .. }
            | CacheEvent::LookupDegraded { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_matches_serde_tag() {
        let event = CacheEvent::ExpiredSwept {
            rows: 3,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["rows"], 3);
    }
}

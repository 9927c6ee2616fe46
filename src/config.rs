//! Runtime configuration
//!
//! Defaults mirror the production front-end: a 5 minute / 50 entry memory
//! tier in front of a 30 minute database tier, and profile syncs that stay
//! fresh for 5 minutes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default memory tier TTL (5 minutes)
pub const DEFAULT_MEMORY_TTL_SECS: u64 = 5 * 60;

/// Default memory tier capacity (entries)
pub const DEFAULT_MEMORY_CAPACITY: usize = 50;

/// Default database tier TTL (30 minutes)
pub const DEFAULT_DATABASE_TTL_SECS: u64 = 30 * 60;

/// Default interval between expired-row sweeps (10 minutes)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 10 * 60;

/// Product cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Memory tier time-to-live in seconds
    pub memory_ttl_secs: u64,
    /// Maximum number of memory tier entries
    pub memory_capacity: usize,
    /// Database tier time-to-live in seconds
    pub database_ttl_secs: u64,
    /// Interval of the background sweep of expired database rows
    pub sweep_interval_secs: u64,
    /// Write empty results from a failed origin query back into the tiers
    pub cache_degraded_results: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_ttl_secs: DEFAULT_MEMORY_TTL_SECS,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            database_ttl_secs: DEFAULT_DATABASE_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            cache_degraded_results: true,
        }
    }
}

impl CacheConfig {
    pub fn memory_ttl(&self) -> Duration {
        Duration::from_secs(self.memory_ttl_secs)
    }

    pub fn database_ttl(&self) -> Duration {
        Duration::from_secs(self.database_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Reject values that would disable a tier outright.
    pub fn validate(&self) -> Result<()> {
        if self.memory_ttl_secs == 0 {
            return Err(Error::Config("memory_ttl_secs must be positive".into()));
        }
        if self.memory_capacity == 0 {
            return Err(Error::Config("memory_capacity must be positive".into()));
        }
        if self.database_ttl_secs == 0 {
            return Err(Error::Config("database_ttl_secs must be positive".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::Config("sweep_interval_secs must be positive".into()));
        }
        Ok(())
    }
}

/// Default profile sync freshness window (5 minutes)
pub const DEFAULT_SYNC_FRESHNESS_SECS: u64 = 5 * 60;

/// Profile sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// SQLite database holding the device-local profile snapshot
    pub local_database_path: PathBuf,
    /// How long a successful sync skips further pushes
    pub freshness_secs: u64,
    /// Signed-in user; profiles are keyed by session id without one
    pub user_id: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            local_database_path: PathBuf::from("fitfi-local.db"),
            freshness_secs: DEFAULT_SYNC_FRESHNESS_SECS,
            user_id: None,
        }
    }
}

impl SyncConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitfiConfig {
    /// SQLite database holding the product and product_cache tables
    pub database_path: PathBuf,
    /// Cache tuning
    pub cache: CacheConfig,
    /// Profile sync
    pub sync: SyncConfig,
}

impl Default for FitfiConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("fitfi.db"),
            cache: CacheConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl FitfiConfig {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FitfiConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        self.cache.validate()
    }
}

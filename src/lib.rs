//! FitFi Catalog Core - Product Cache and Quiz Confidence Analysis
//!
//! Backend core of the FitFi style quiz: a multi-tier read-through cache in
//! front of the product catalog, and a heuristic scorer for how consistent a
//! user's quiz answers were.
//!
//! # Architecture
//!
//! ```text
//! FilterCriteria → CacheKey → Memory Tier → Database Tier → Origin Query
//!                                  ▲              ▲              │
//!                                  └──────────────┴── write-back ┘
//!
//! QuizAnswers → Confidence Analyzer → badge / banner / warning
//!
//! Local snapshot ⇄ ProfileSync ⇄ remote style profiles
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - In-memory and SQLite store adapters, event publishers
//! - [`cache`] - Key encoder, tiers, orchestrator, metrics, sweeper
//! - [`clock`] - Injectable time source
//! - [`config`] - YAML configuration
//! - [`domain`] - Products, filter criteria, ports and events
//! - [`error`] - Error types
//! - [`filtering`] - Client-side product filter pipeline
//! - [`quiz`] - Confidence analysis over quiz answers
//! - [`sync`] - Local/remote style profile synchronisation

pub mod adapters;
pub mod cache;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod filtering;
pub mod quiz;
pub mod sync;

// Re-export commonly used types
pub use cache::{CacheKey, CacheSweeper, CacheTier, LookupResult, ProductCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, FitfiConfig, SyncConfig};
pub use domain::{FilterCriteria, Gender, Product};
pub use error::{Error, Result};
pub use filtering::{filter_products, FilterReport};
pub use quiz::{analyze_quiz_confidence, ConfidenceAnalysis, QuizAnswers};
pub use sync::ProfileSync;

//! Infrastructure Adapters
//!
//! Implementations of the domain ports.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Ports (Traits)                          │
//! │      ProductStore │ CacheStore │ EventPublisher            │
//! │      LocalProfileStore │ RemoteProfileStore                │
//! └───────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                 Adapters (This Module)                     │
//! │  InMemoryProductStore │ InMemoryCacheStore │ SqliteStore   │
//! │  LoggingEventPublisher │ InMemoryEventCollector            │
//! │  InMemoryLocalProfileStore │ InMemoryRemoteProfileStore    │
//! └───────────────────────────────────────────────────────────┘
//! ```

mod event_publisher;
mod memory;
mod profile;
mod sqlite;

pub use event_publisher::{InMemoryEventCollector, LoggingEventPublisher, NoopEventPublisher};
pub use memory::{InMemoryCacheStore, InMemoryProductStore, StoreStats};
pub use profile::{InMemoryLocalProfileStore, InMemoryRemoteProfileStore};
pub use sqlite::SqliteStore;

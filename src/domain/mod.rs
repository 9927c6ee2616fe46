//! Domain Layer
//!
//! - **Model** (`model.rs`) - products and filter criteria
//! - **Ports** (`ports.rs`) - store and publisher abstractions
//! - **Events** (`events.rs`) - cache state changes for audit logging
//! - **Profile** (`profile.rs`) - style profiles and sync state

pub mod events;
pub mod model;
pub mod ports;
pub mod profile;

pub use events::CacheEvent;
pub use model::{Budget, FilterCriteria, Gender, Product};
pub use ports::{
    CacheRow, CacheStore, EventPublisher, LocalProfileStore, ProductStore, RemoteProfileStore,
};
pub use profile::{LocalProfile, QuizAnswerRow, StyleProfile, SyncState, SyncStatus};

//! Origin Query Tier - filtered read from the product store
//!
//! The store is the source of truth. A failed query is logged and reported
//! as an empty result, which callers cannot tell apart from "no matches"
//! unless they use [`OriginTier::fetch`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error};

use crate::domain::model::{FilterCriteria, Product};
use crate::domain::ports::ProductStore;
use crate::error::Result;

/// Origin Query Tier
pub struct OriginTier {
    store: Arc<dyn ProductStore>,
    queries: AtomicU64,
    errors: AtomicU64,
}

impl OriginTier {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self {
            store,
            queries: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Matching in-stock products; empty when the store fails.
    pub async fn query(&self, criteria: &FilterCriteria) -> Vec<Product> {
        self.fetch(criteria).await.unwrap_or_default()
    }

    /// Matching in-stock products, keeping the store error visible.
    ///
    /// Failures are logged here so both entry points report them once.
    pub async fn fetch(&self, criteria: &FilterCriteria) -> Result<Vec<Product>> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        match self.store.query(criteria).await {
            Ok(products) => {
                debug!(count = products.len(), "Origin query returned products");
                Ok(products)
            }
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "Origin product query failed");
                Err(e)
            }
        }
    }

    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

//! Event Publisher Adapters
//!
//! Implements the `EventPublisher` port with logging, collecting and no-op
//! backends.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::events::CacheEvent;
use crate::domain::ports::EventPublisher;
use crate::error::Result;

/// Publishes cache events to the tracing system.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventPublisher {
    /// Log at info level (true) or debug level (false)
    info_level: bool,
}

impl LoggingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info_level() -> Self {
        Self { info_level: true }
    }

    pub fn debug_level() -> Self {
        Self { info_level: false }
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: CacheEvent) -> Result<()> {
        let event_type = event.event_type();
        let json = serde_json::to_string(&event).unwrap_or_else(|_| format!("{:?}", event));

        if self.info_level {
            info!(event_type = %event_type, event = %json, "Cache event");
        } else {
            debug!(event_type = %event_type, event = %json, "Cache event");
        }

        Ok(())
    }
}

/// Collects events in memory for later inspection.
#[derive(Debug, Default)]
pub struct InMemoryEventCollector {
    events: parking_lot::RwLock<Vec<CacheEvent>>,
}

impl InMemoryEventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CacheEvent> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Events whose `type` tag equals `event_type`.
    pub fn events_of_type(&self, event_type: &str) -> Vec<CacheEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventCollector {
    async fn publish(&self, event: CacheEvent) -> Result<()> {
        self.events.write().push(event);
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _event: CacheEvent) -> Result<()> {
        Ok(())
    }
}

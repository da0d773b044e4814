//! Event publisher for outbound lobby events

use crate::error::{LobbyError, Result};
use crate::types::LobbyEvent;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

/// Trait for publishing lobby events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event
    async fn publish(&self, event: LobbyEvent) -> Result<()>;
}

/// Publisher that keeps every event in memory
#[derive(Debug, Default)]
pub struct InMemoryEventPublisher {
    published_events: Mutex<Vec<LobbyEvent>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far
    pub fn events(&self) -> Vec<LobbyEvent> {
        self.published_events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Count events of a specific type
    pub fn count_events_of_type(&self, kind: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    /// Drain and return recorded events
    pub fn take_events(&self) -> Vec<LobbyEvent> {
        self.published_events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: LobbyEvent) -> Result<()> {
        let mut events =
            self.published_events
                .lock()
                .map_err(|_| LobbyError::InternalError {
                    message: "Failed to acquire published events lock".to_string(),
                })?;
        events.push(event);
        Ok(())
    }
}

/// Publisher that writes each event as JSON to the log
#[derive(Debug, Default, Clone)]
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, event: LobbyEvent) -> Result<()> {
        let payload = serde_json::to_string(&event)?;
        info!(event = event.kind(), "{}", payload);
        Ok(())
    }
}

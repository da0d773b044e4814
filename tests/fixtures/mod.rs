//! Test fixtures shared by the integration suites

#![allow(dead_code)]

use async_trait::async_trait;
use lobby_coordinator::error::Result;
use lobby_coordinator::events::EventPublisher;
use lobby_coordinator::identity::{Identity, SharedIdentity};
use lobby_coordinator::lobby::{SessionRegistry, StaticFormatProvider};
use lobby_coordinator::metrics::MetricsCollector;
use lobby_coordinator::types::LobbyEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Publisher that records events and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    published_events: Mutex<Vec<LobbyEvent>>,
    fail_every: Option<usize>,
    attempts: AtomicUsize,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `n`th publish attempt
    pub fn failing_every(n: usize) -> Self {
        Self {
            fail_every: Some(n.max(1)),
            ..Self::default()
        }
    }

    pub fn get_published_events(&self) -> Vec<LobbyEvent> {
        self.published_events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count_events_of_type(&self, kind: &str) -> usize {
        self.get_published_events()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: LobbyEvent) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(n) = self.fail_every {
            if attempt % n == 0 {
                return Err(anyhow::anyhow!("publish attempt {} dropped", attempt));
            }
        }
        if let Ok(mut events) = self.published_events.lock() {
            events.push(event);
        }
        Ok(())
    }
}

/// Registry wired to a recording publisher
pub fn create_test_registry() -> (SessionRegistry, Arc<RecordingEventPublisher>) {
    create_test_registry_with(RecordingEventPublisher::new())
}

pub fn create_test_registry_with(
    publisher: RecordingEventPublisher,
) -> (SessionRegistry, Arc<RecordingEventPublisher>) {
    let publisher = Arc::new(publisher);
    let registry = SessionRegistry::new(
        Arc::new(StaticFormatProvider::new()),
        publisher.clone(),
        Arc::new(MetricsCollector::new().unwrap()),
    );
    (registry, publisher)
}

/// Stand-in for the account subsystem
#[derive(Debug, Default)]
pub struct IdentityDirectory {
    identities: HashMap<String, SharedIdentity>,
}

impl IdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user blocking the given handles
    pub fn register(&mut self, handle: &str, blocks: &[&str]) -> SharedIdentity {
        let identity = Identity::with_blocked(handle, blocks.iter().copied()).shared();
        self.identities
            .insert(handle.to_string(), identity.clone());
        identity
    }

    pub fn get(&self, handle: &str) -> SharedIdentity {
        self.identities
            .get(handle)
            .cloned()
            .unwrap_or_else(|| panic!("unregistered test user {}", handle))
    }

    /// Drop the directory's reference, as if the account logged out
    pub fn forget(&mut self, handle: &str) -> Option<SharedIdentity> {
        self.identities.remove(handle)
    }
}

/// `count` users named `prefix_0..`, blocking nobody
pub fn create_test_users(prefix: &str, count: usize) -> Vec<SharedIdentity> {
    (0..count)
        .map(|i| Identity::new(format!("{}_{}", prefix, i)).shared())
        .collect()
}

//! Outbound lobby events
//!
//! The registry reports every roster and lifecycle change through an
//! `EventPublisher`, leaving delivery to whatever transport hosts it.

pub mod publisher;

pub use publisher::{EventPublisher, InMemoryEventPublisher, LogEventPublisher};

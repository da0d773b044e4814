//! Lobby Coordinator - lobby sessions for multiplayer card games
//!
//! This crate tracks who owns a pending match, who has joined as a player or
//! spectator, enforces a mutual block-list admission policy, decides which
//! sessions a viewer may see in a listing, and produces privacy-filtered
//! summaries of each session.

pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod lobby;
pub mod metrics;
pub mod replay;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{AdmissionError, LobbyError, Result};
pub use types::*;

// Re-export key components
pub use events::EventPublisher;
pub use identity::{Identity, SharedIdentity};
pub use lobby::{LobbySession, SessionRegistry, SessionSummary, ViewerContext};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

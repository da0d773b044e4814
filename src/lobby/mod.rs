//! Lobby session coordination
//!
//! This module holds the session coordinator itself (admission, roster,
//! visibility), the privacy-filtered summary projection, per-format seat
//! rules and the registry that owns open sessions.

pub mod participant;
pub mod registry;
pub mod session;
pub mod settings;
pub mod summary;

// Re-export commonly used types
pub use participant::ParticipantEntry;
pub use registry::{RegistryStats, SessionHandle, SessionRegistry};
pub use session::LobbySession;
pub use settings::{FormatProvider, FormatRules, SessionOptions, StaticFormatProvider};
pub use summary::{ParticipantSummary, SessionSummary, ViewerContext};

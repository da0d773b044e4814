//! Error types for the lobby coordinator
//!
//! Infrastructure failures travel as `anyhow` errors. Admission rejections are a
//! separate, recoverable taxonomy so the transport layer can report a precise
//! reason to the requester without tearing anything down.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Reasons a join or watch request is turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum AdmissionError {
    #[error("Session has already started")]
    AlreadyStarted,

    #[error("Identity is already seated in this session")]
    AlreadySeated,

    #[error("Incorrect session password")]
    Unauthorized,

    #[error("Admission blocked by a block relationship")]
    Blocked,

    #[error("Spectators are not allowed in this session")]
    SpectatingDisabled,

    #[error("No seat available")]
    SeatUnavailable,
}

impl AdmissionError {
    /// Stable reason code used in events, metrics labels and replay reports
    pub fn code(&self) -> &'static str {
        match self {
            AdmissionError::AlreadyStarted => "already_started",
            AdmissionError::AlreadySeated => "already_seated",
            AdmissionError::Unauthorized => "unauthorized",
            AdmissionError::Blocked => "blocked",
            AdmissionError::SpectatingDisabled => "spectating_disabled",
            AdmissionError::SeatUnavailable => "seat_unavailable",
        }
    }
}

/// Failures outside the admission gate
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Participant not found: {user}")]
    ParticipantNotFound { user: String },

    #[error("{user} does not own session {session_id}")]
    NotOwner { user: String, session_id: String },

    #[error("Session already started: {session_id}")]
    AlreadyStarted { session_id: String },

    #[error("Field '{field}' already assigned for {user}")]
    FieldAlreadyAssigned { user: String, field: &'static str },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

//! Common types used throughout the lobby coordinator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Username-equivalent handle identifying an account
pub type UserHandle = String;

/// Unique identifier for lobby sessions
pub type SessionId = Uuid;

/// Seat designation requested by a participant
pub type Seat = u32;

/// Roster a participant is seated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Player,
    Spectator,
}

impl std::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipantRole::Player => write!(f, "player"),
            ParticipantRole::Spectator => write!(f, "spectator"),
        }
    }
}

/// Game format/variant tag of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameFormat {
    Joust,
    Melee,
}

impl std::fmt::Display for GameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameFormat::Joust => write!(f, "joust"),
            GameFormat::Melee => write!(f, "melee"),
        }
    }
}

impl FromStr for GameFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "joust" => Ok(GameFormat::Joust),
            "melee" => Ok(GameFormat::Melee),
            other => Err(anyhow::anyhow!("Unknown game format: {}", other)),
        }
    }
}

/// Card metadata handed over by the rules engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardData {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CardData {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: None,
        }
    }
}

/// Reason why a participant left a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    Left,
    Removed,
    SessionClosed,
}

impl LeaveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveReason::Left => "left",
            LeaveReason::Removed => "removed",
            LeaveReason::SessionClosed => "session_closed",
        }
    }
}

/// Events emitted by the session registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LobbyEvent {
    SessionCreated {
        session_id: SessionId,
        owner: UserHandle,
        format: GameFormat,
        timestamp: DateTime<Utc>,
    },
    ParticipantJoined {
        session_id: SessionId,
        user: UserHandle,
        role: ParticipantRole,
        seat: Seat,
        timestamp: DateTime<Utc>,
    },
    ParticipantLeft {
        session_id: SessionId,
        user: UserHandle,
        role: ParticipantRole,
        reason: LeaveReason,
        timestamp: DateTime<Utc>,
    },
    AdmissionRejected {
        session_id: SessionId,
        user: UserHandle,
        role: ParticipantRole,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    SessionStarted {
        session_id: SessionId,
        players: Vec<UserHandle>,
        timestamp: DateTime<Utc>,
    },
    SessionClosed {
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    },
}

impl LobbyEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            LobbyEvent::SessionCreated { .. } => "SessionCreated",
            LobbyEvent::ParticipantJoined { .. } => "ParticipantJoined",
            LobbyEvent::ParticipantLeft { .. } => "ParticipantLeft",
            LobbyEvent::AdmissionRejected { .. } => "AdmissionRejected",
            LobbyEvent::SessionStarted { .. } => "SessionStarted",
            LobbyEvent::SessionClosed { .. } => "SessionClosed",
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            LobbyEvent::SessionCreated { session_id, .. }
            | LobbyEvent::ParticipantJoined { session_id, .. }
            | LobbyEvent::ParticipantLeft { session_id, .. }
            | LobbyEvent::AdmissionRejected { session_id, .. }
            | LobbyEvent::SessionStarted { session_id, .. }
            | LobbyEvent::SessionClosed { session_id, .. } => *session_id,
        }
    }
}

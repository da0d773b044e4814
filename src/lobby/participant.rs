//! Seat bindings of an identity inside a session

use crate::error::{LobbyError, Result};
use crate::identity::{Identity, SharedIdentity};
use crate::types::{CardData, ParticipantRole, Seat, UserHandle};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Weak};

/// One player or spectator seat held by an identity
///
/// The entry does not keep its identity alive. Game data (`faction`,
/// `agendas`) starts unassigned and is written at most once by the rules engine.
#[derive(Debug, Clone)]
pub struct ParticipantEntry {
    handle: UserHandle,
    identity: Weak<Identity>,
    role: ParticipantRole,
    seat: Seat,
    joined_at: DateTime<Utc>,
    faction: Option<CardData>,
    agendas: Option<Vec<CardData>>,
}

impl ParticipantEntry {
    pub fn new(identity: &SharedIdentity, role: ParticipantRole, seat: Seat) -> Self {
        Self {
            handle: identity.handle().to_string(),
            identity: Arc::downgrade(identity),
            role,
            seat,
            joined_at: current_timestamp(),
            faction: None,
            agendas: None,
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// The bound identity, if the account layer still holds it
    pub fn identity(&self) -> Option<SharedIdentity> {
        self.identity.upgrade()
    }

    pub fn role(&self) -> ParticipantRole {
        self.role
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    pub fn faction(&self) -> Option<&CardData> {
        self.faction.as_ref()
    }

    pub fn agendas(&self) -> Option<&[CardData]> {
        self.agendas.as_deref()
    }

    /// Whether this participant blocks `handle`. A dropped identity blocks nobody.
    pub fn blocks(&self, handle: &str) -> bool {
        self.identity
            .upgrade()
            .map(|identity| identity.blocks(handle))
            .unwrap_or(false)
    }

    pub fn assign_faction(&mut self, faction: CardData) -> Result<()> {
        if self.faction.is_some() {
            return Err(LobbyError::FieldAlreadyAssigned {
                user: self.handle.clone(),
                field: "faction",
            }
            .into());
        }
        self.faction = Some(faction);
        Ok(())
    }

    pub fn assign_agendas(&mut self, agendas: Vec<CardData>) -> Result<()> {
        if self.agendas.is_some() {
            return Err(LobbyError::FieldAlreadyAssigned {
                user: self.handle.clone(),
                field: "agendas",
            }
            .into());
        }
        self.agendas = Some(agendas);
        Ok(())
    }
}

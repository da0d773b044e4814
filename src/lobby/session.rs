//! Lobby session: admission control, roster, visibility
//!
//! A session is the in-memory coordinator for one match that is being
//! assembled. It owns its rosters but not the identities in them; block
//! relationships are read live from the identities on every decision.

use crate::error::{AdmissionError, LobbyError, Result};
use crate::identity::{Identity, SharedIdentity};
use crate::lobby::participant::ParticipantEntry;
use crate::lobby::settings::{FormatRules, SessionOptions};
use crate::lobby::summary::{self, SessionSummary, ViewerContext};
use crate::types::{CardData, GameFormat, ParticipantRole, Seat, SessionId, UserHandle};
use crate::utils::{current_timestamp, generate_session_id, password_digest};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// One lobby session
///
/// All mutating calls on one instance must be serialized by the caller. The
/// session registry does this with a per-session lock.
#[derive(Debug, Clone)]
pub struct LobbySession {
    id: SessionId,
    name: String,
    owner: SharedIdentity,
    rules: FormatRules,
    players: HashMap<UserHandle, ParticipantEntry>,
    spectators: HashMap<UserHandle, ParticipantEntry>,
    started: bool,
    game_private: bool,
    spectators_allowed: bool,
    password_digest: Option<String>,
    created_at: DateTime<Utc>,
}

impl LobbySession {
    /// Create a session with a fresh ID. The owner is not seated.
    pub fn new(owner: SharedIdentity, options: SessionOptions, rules: FormatRules) -> Self {
        Self::with_id(generate_session_id(), owner, options, rules)
    }

    /// Create a session with a specific ID
    pub fn with_id(
        id: SessionId,
        owner: SharedIdentity,
        options: SessionOptions,
        rules: FormatRules,
    ) -> Self {
        let password_digest = options
            .password
            .as_deref()
            .filter(|password| !password.is_empty())
            .map(password_digest);

        Self {
            id,
            name: options.name,
            owner,
            rules,
            players: HashMap::new(),
            spectators: HashMap::new(),
            started: false,
            game_private: options.game_private,
            spectators_allowed: options.spectators_allowed,
            password_digest,
            created_at: current_timestamp(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &SharedIdentity {
        &self.owner
    }

    pub fn owner_handle(&self) -> &str {
        self.owner.handle()
    }

    pub fn is_owner(&self, handle: &str) -> bool {
        self.owner.handle() == handle
    }

    pub fn format(&self) -> GameFormat {
        self.rules.format
    }

    pub fn rules(&self) -> &FormatRules {
        &self.rules
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_private(&self) -> bool {
        self.game_private
    }

    pub fn spectators_allowed(&self) -> bool {
        self.spectators_allowed
    }

    pub fn needs_password(&self) -> bool {
        self.password_digest.is_some()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn spectator_count(&self) -> usize {
        self.spectators.len()
    }

    /// Whether the handle is seated in either roster
    pub fn has_participant(&self, handle: &str) -> bool {
        self.players.contains_key(handle) || self.spectators.contains_key(handle)
    }

    pub fn players(&self) -> impl Iterator<Item = &ParticipantEntry> {
        self.players.values()
    }

    pub fn spectators(&self) -> impl Iterator<Item = &ParticipantEntry> {
        self.spectators.values()
    }

    pub fn player(&self, handle: &str) -> Option<&ParticipantEntry> {
        self.players.get(handle)
    }

    /// Combined read-only view of both rosters keyed by handle
    pub fn get_players_and_spectators(&self) -> HashMap<&str, &ParticipantEntry> {
        self.players
            .iter()
            .chain(self.spectators.iter())
            .map(|(handle, entry)| (handle.as_str(), entry))
            .collect()
    }

    /// Request a player seat
    pub fn join(
        &mut self,
        seat: Seat,
        identity: &SharedIdentity,
        password: Option<&str>,
    ) -> std::result::Result<(), AdmissionError> {
        self.admit(ParticipantRole::Player, seat, identity, password)
    }

    /// Request a spectator seat
    pub fn watch(
        &mut self,
        seat: Seat,
        identity: &SharedIdentity,
        password: Option<&str>,
    ) -> std::result::Result<(), AdmissionError> {
        self.admit(ParticipantRole::Spectator, seat, identity, password)
    }

    /// Seat a player directly, skipping every check except uniqueness
    pub fn add_player(
        &mut self,
        seat: Seat,
        identity: &SharedIdentity,
    ) -> std::result::Result<(), AdmissionError> {
        if self.has_participant(identity.handle()) {
            return Err(AdmissionError::AlreadySeated);
        }
        self.insert(ParticipantRole::Player, seat, identity);
        Ok(())
    }

    /// Remove a participant from whichever roster holds it
    pub fn leave(&mut self, handle: &str) -> Option<ParticipantEntry> {
        self.players
            .remove(handle)
            .or_else(|| self.spectators.remove(handle))
    }

    /// Owner-initiated removal of any participant
    pub fn remove_participant(&mut self, by: &Identity, target: &str) -> Result<ParticipantEntry> {
        if !self.is_owner(by.handle()) {
            return Err(LobbyError::NotOwner {
                user: by.handle().to_string(),
                session_id: self.id.to_string(),
            }
            .into());
        }

        self.leave(target).ok_or_else(|| {
            LobbyError::ParticipantNotFound {
                user: target.to_string(),
            }
            .into()
        })
    }

    /// One-way transition into the started state
    pub fn mark_started(&mut self) -> Result<()> {
        if self.started {
            return Err(LobbyError::AlreadyStarted {
                session_id: self.id.to_string(),
            }
            .into());
        }
        self.started = true;
        Ok(())
    }

    pub fn set_private(&mut self, game_private: bool) {
        self.game_private = game_private;
    }

    /// Record the faction the rules engine assigned to a seated player
    pub fn assign_faction(&mut self, handle: &str, faction: CardData) -> Result<()> {
        self.player_mut(handle)?.assign_faction(faction)
    }

    /// Record the agendas the rules engine assigned to a seated player
    pub fn assign_agendas(&mut self, handle: &str, agendas: Vec<CardData>) -> Result<()> {
        self.player_mut(handle)?.assign_agendas(agendas)
    }

    /// Whether the session may appear in this viewer's listing
    ///
    /// Anonymous viewers see every session. Re-evaluated on each call since
    /// block lists change independently of the session.
    pub fn is_visible_for(&self, viewer: Option<&Identity>) -> bool {
        let visible = match viewer {
            Some(viewer) => !self.has_block_relation(viewer),
            None => true,
        };

        debug!(
            "Visibility of session {} for {:?}: {}",
            self.id,
            viewer.map(Identity::handle),
            visible
        );
        visible
    }

    /// Privacy-filtered snapshot for a client
    pub fn get_summary(&self, context: ViewerContext<'_>) -> SessionSummary {
        summary::project(self, context)
    }

    fn player_mut(&mut self, handle: &str) -> Result<&mut ParticipantEntry> {
        self.players.get_mut(handle).ok_or_else(|| {
            LobbyError::ParticipantNotFound {
                user: handle.to_string(),
            }
            .into()
        })
    }

    /// Owner blocks requester, requester blocks owner, or a seated player
    /// blocks requester. Spectators do not take part, and nobody is checked
    /// against themselves.
    fn has_block_relation(&self, requester: &Identity) -> bool {
        let owner_relation = !self.is_owner(requester.handle())
            && (self.owner.blocks(requester.handle()) || requester.blocks(self.owner.handle()));

        owner_relation
            || self
                .players
                .values()
                .filter(|entry| entry.handle() != requester.handle())
                .any(|entry| entry.blocks(requester.handle()))
    }

    fn admit(
        &mut self,
        role: ParticipantRole,
        seat: Seat,
        identity: &SharedIdentity,
        password: Option<&str>,
    ) -> std::result::Result<(), AdmissionError> {
        match self.check_admission(role, seat, identity, password) {
            Ok(()) => {
                self.insert(role, seat, identity);
                debug!(
                    "Admitted {} as {} in seat {} of session {}",
                    identity.handle(),
                    role,
                    seat,
                    self.id
                );
                Ok(())
            }
            Err(reason) => {
                debug!(
                    "Rejected {} as {} for session {}: {}",
                    identity.handle(),
                    role,
                    self.id,
                    reason.code()
                );
                Err(reason)
            }
        }
    }

    /// First failing check wins
    fn check_admission(
        &self,
        role: ParticipantRole,
        seat: Seat,
        identity: &Identity,
        password: Option<&str>,
    ) -> std::result::Result<(), AdmissionError> {
        if self.started {
            return Err(AdmissionError::AlreadyStarted);
        }

        if role == ParticipantRole::Spectator && !self.spectators_allowed {
            return Err(AdmissionError::SpectatingDisabled);
        }

        if self.has_participant(identity.handle()) {
            return Err(AdmissionError::AlreadySeated);
        }

        if let Some(expected) = &self.password_digest {
            let matches = password
                .filter(|password| !password.is_empty())
                .map(|password| password_digest(password) == *expected)
                .unwrap_or(false);
            if !matches {
                return Err(AdmissionError::Unauthorized);
            }
        }

        if self.has_block_relation(identity) {
            return Err(AdmissionError::Blocked);
        }

        let seat_free = match role {
            ParticipantRole::Player => {
                self.players.len() < self.rules.max_players
                    && !self.players.values().any(|entry| entry.seat() == seat)
            }
            ParticipantRole::Spectator => self
                .rules
                .max_spectators
                .map(|cap| self.spectators.len() < cap)
                .unwrap_or(true),
        };
        if !seat_free {
            return Err(AdmissionError::SeatUnavailable);
        }

        Ok(())
    }

    fn insert(&mut self, role: ParticipantRole, seat: Seat, identity: &SharedIdentity) {
        let entry = ParticipantEntry::new(identity, role, seat);
        let roster = match role {
            ParticipantRole::Player => &mut self.players,
            ParticipantRole::Spectator => &mut self.spectators,
        };
        roster.insert(identity.handle().to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_session(owner: &SharedIdentity) -> LobbySession {
        LobbySession::new(
            owner.clone(),
            SessionOptions::new("test game", GameFormat::Joust),
            FormatRules::joust(),
        )
    }

    fn user(handle: &str) -> SharedIdentity {
        Identity::new(handle).shared()
    }

    #[test]
    fn test_session_creation() {
        let owner = user("owner");
        let session = create_test_session(&owner);

        assert_eq!(session.owner_handle(), "owner");
        assert_eq!(session.format(), GameFormat::Joust);
        assert!(!session.is_started());
        assert!(!session.is_private());
        assert!(session.spectators_allowed());
        assert!(!session.needs_password());
        // owner is not seated automatically
        assert!(!session.has_participant("owner"));
        assert!(session.get_players_and_spectators().is_empty());
    }

    #[test]
    fn test_join_inserts_player_keyed_by_handle() {
        let owner = user("owner");
        let bob = user("bob");
        let mut session = create_test_session(&owner);

        assert_eq!(session.join(1, &bob, None), Ok(()));
        let entry = session.player("bob").unwrap();
        assert_eq!(entry.handle(), "bob");
        assert_eq!(entry.role(), ParticipantRole::Player);
        assert_eq!(session.player_count(), 1);
    }

    #[test]
    fn test_watch_inserts_spectator() {
        let owner = user("owner");
        let carol = user("carol");
        let mut session = create_test_session(&owner);

        assert_eq!(session.watch(0, &carol, None), Ok(()));
        assert_eq!(session.spectator_count(), 1);
        assert!(session.player("carol").is_none());
        assert!(session.get_players_and_spectators().contains_key("carol"));
    }

    #[test]
    fn test_join_rejected_after_start() {
        let owner = user("owner");
        let bob = user("bob");
        let mut session = create_test_session(&owner);
        session.mark_started().unwrap();

        assert_eq!(session.join(1, &bob, None), Err(AdmissionError::AlreadyStarted));
        assert_eq!(session.watch(0, &bob, None), Err(AdmissionError::AlreadyStarted));
        assert!(session.get_players_and_spectators().is_empty());
    }

    #[test]
    fn test_started_is_one_way() {
        let owner = user("owner");
        let mut session = create_test_session(&owner);
        session.mark_started().unwrap();
        assert!(session.mark_started().is_err());
        assert!(session.is_started());
    }

    #[test]
    fn test_already_seated_across_rosters() {
        let owner = user("owner");
        let bob = user("bob");
        let mut session = create_test_session(&owner);

        session.watch(0, &bob, None).unwrap();
        assert_eq!(session.join(1, &bob, None), Err(AdmissionError::AlreadySeated));
        assert_eq!(session.watch(0, &bob, None), Err(AdmissionError::AlreadySeated));
        assert_eq!(session.add_player(1, &bob), Err(AdmissionError::AlreadySeated));
    }

    #[test]
    fn test_password_protected_session() {
        let owner = user("owner");
        let bob = user("bob");
        let mut session = LobbySession::new(
            owner.clone(),
            SessionOptions::new("locked", GameFormat::Joust).with_password("hunter2"),
            FormatRules::joust(),
        );
        assert!(session.needs_password());

        assert_eq!(session.join(1, &bob, None), Err(AdmissionError::Unauthorized));
        assert_eq!(session.join(1, &bob, Some("")), Err(AdmissionError::Unauthorized));
        assert_eq!(
            session.join(1, &bob, Some("wrong")),
            Err(AdmissionError::Unauthorized)
        );
        assert_eq!(session.join(1, &bob, Some("hunter2")), Ok(()));
    }

    #[test]
    fn test_password_ignored_without_one() {
        let owner = user("owner");
        let bob = user("bob");
        let mut session = LobbySession::new(
            owner.clone(),
            SessionOptions::new("open", GameFormat::Joust).with_password(""),
            FormatRules::joust(),
        );
        assert!(!session.needs_password());
        assert_eq!(session.join(1, &bob, Some("anything")), Ok(()));
    }

    #[test]
    fn test_owner_blocking_requester() {
        let owner = Identity::with_blocked("owner", ["bob"]).shared();
        let bob = user("bob");
        let mut session = create_test_session(&owner);

        assert_eq!(session.join(1, &bob, None), Err(AdmissionError::Blocked));
        assert_eq!(session.watch(0, &bob, None), Err(AdmissionError::Blocked));
        assert!(!session.has_participant("bob"));
    }

    #[test]
    fn test_requester_blocking_owner() {
        let owner = user("owner");
        let bob = Identity::with_blocked("bob", ["owner"]).shared();
        let mut session = create_test_session(&owner);

        assert_eq!(session.join(1, &bob, None), Err(AdmissionError::Blocked));
    }

    #[test]
    fn test_seated_player_blocking_requester() {
        let owner = user("owner");
        let bob = Identity::with_blocked("bob", ["carol"]).shared();
        let carol = user("carol");
        let mut session = LobbySession::new(
            owner.clone(),
            SessionOptions::new("melee", GameFormat::Melee),
            FormatRules::melee(),
        );

        session.join(1, &bob, None).unwrap();
        assert_eq!(session.join(2, &carol, None), Err(AdmissionError::Blocked));
        assert_eq!(session.watch(0, &carol, None), Err(AdmissionError::Blocked));
    }

    #[test]
    fn test_requester_blocking_seated_player_is_admitted() {
        let owner = user("owner");
        let bob = user("bob");
        let carol = Identity::with_blocked("carol", ["bob"]).shared();
        let mut session = create_test_session(&owner);

        session.join(1, &bob, None).unwrap();
        assert_eq!(session.join(2, &carol, None), Ok(()));
    }

    #[test]
    fn test_spectator_block_does_not_gate_admission() {
        let owner = user("owner");
        let watcher = Identity::with_blocked("watcher", ["bob"]).shared();
        let bob = user("bob");
        let mut session = create_test_session(&owner);

        session.watch(0, &watcher, None).unwrap();
        assert_eq!(session.join(1, &bob, None), Ok(()));
    }

    #[test]
    fn test_block_list_changes_apply_to_next_request() {
        let owner = user("owner");
        let bob = user("bob");
        let mut session = create_test_session(&owner);

        owner.block("bob");
        assert_eq!(session.join(1, &bob, None), Err(AdmissionError::Blocked));
        owner.unblock("bob");
        assert_eq!(session.join(1, &bob, None), Ok(()));
    }

    #[test]
    fn test_spectating_disabled() {
        let owner = user("owner");
        let carol = user("carol");
        let mut session = LobbySession::new(
            owner.clone(),
            SessionOptions::new("no watchers", GameFormat::Joust).with_spectators(false),
            FormatRules::joust(),
        );

        assert_eq!(
            session.watch(0, &carol, None),
            Err(AdmissionError::SpectatingDisabled)
        );
        assert_eq!(session.join(1, &carol, None), Ok(()));
    }

    #[test]
    fn test_seat_capacity() {
        let owner = user("owner");
        let mut session = create_test_session(&owner);

        session.add_player(1, &owner).unwrap();
        session.join(2, &user("bob"), None).unwrap();
        assert_eq!(
            session.join(3, &user("carol"), None),
            Err(AdmissionError::SeatUnavailable)
        );
    }

    #[test]
    fn test_taken_seat_is_unavailable() {
        let owner = user("owner");
        let mut session = create_test_session(&owner);

        session.join(1, &user("bob"), None).unwrap();
        assert_eq!(
            session.join(1, &user("carol"), None),
            Err(AdmissionError::SeatUnavailable)
        );
    }

    #[test]
    fn test_spectator_cap() {
        let owner = user("owner");
        let rules = FormatRules {
            max_spectators: Some(1),
            ..FormatRules::joust()
        };
        let mut session = LobbySession::new(
            owner.clone(),
            SessionOptions::new("capped", GameFormat::Joust),
            rules,
        );

        session.watch(0, &user("carol"), None).unwrap();
        assert_eq!(
            session.watch(0, &user("dave"), None),
            Err(AdmissionError::SeatUnavailable)
        );
    }

    #[test]
    fn test_rejection_order() {
        let owner = Identity::with_blocked("owner", ["bob"]).shared();
        let bob = user("bob");
        let mut session = LobbySession::new(
            owner.clone(),
            SessionOptions::new("locked", GameFormat::Joust).with_password("pw"),
            FormatRules::joust(),
        );

        // password is checked before the block list
        assert_eq!(session.join(1, &bob, None), Err(AdmissionError::Unauthorized));
        assert_eq!(session.join(1, &bob, Some("pw")), Err(AdmissionError::Blocked));

        session.mark_started().unwrap();
        assert_eq!(
            session.join(1, &bob, Some("pw")),
            Err(AdmissionError::AlreadyStarted)
        );
    }

    #[test]
    fn test_add_player_bypasses_checks() {
        let owner = Identity::with_blocked("owner", ["bob"]).shared();
        let bob = user("bob");
        let mut session = create_test_session(&owner);

        assert_eq!(session.add_player(1, &bob), Ok(()));
        assert!(session.player("bob").is_some());
    }

    #[test]
    fn test_leave() {
        let owner = user("owner");
        let bob = user("bob");
        let carol = user("carol");
        let mut session = create_test_session(&owner);
        session.join(1, &bob, None).unwrap();
        session.watch(0, &carol, None).unwrap();

        assert_eq!(session.leave("bob").unwrap().role(), ParticipantRole::Player);
        assert_eq!(
            session.leave("carol").unwrap().role(),
            ParticipantRole::Spectator
        );
        assert!(session.leave("nobody").is_none());
        assert!(session.get_players_and_spectators().is_empty());
    }

    #[test]
    fn test_remove_participant_requires_owner() {
        let owner = user("owner");
        let bob = user("bob");
        let carol = user("carol");
        let mut session = create_test_session(&owner);
        session.join(1, &bob, None).unwrap();
        session.join(2, &carol, None).unwrap();

        assert!(session.remove_participant(&carol, "bob").is_err());
        assert!(session.player("bob").is_some());

        let removed = session.remove_participant(&owner, "bob").unwrap();
        assert_eq!(removed.handle(), "bob");
        assert!(session.remove_participant(&owner, "bob").is_err());
    }

    #[test]
    fn test_assign_game_fields() {
        let owner = user("owner");
        let bob = user("bob");
        let mut session = create_test_session(&owner);
        session.join(1, &bob, None).unwrap();

        session.assign_faction("bob", CardData::new("stark")).unwrap();
        session
            .assign_agendas("bob", vec![CardData::new("fealty")])
            .unwrap();
        assert!(session.assign_faction("bob", CardData::new("greyjoy")).is_err());
        assert!(session.assign_faction("nobody", CardData::new("stark")).is_err());

        let entry = session.player("bob").unwrap();
        assert_eq!(entry.faction().unwrap().code, "stark");
        assert_eq!(entry.agendas().unwrap()[0].code, "fealty");
    }

    #[test]
    fn test_visibility() {
        let owner = user("owner");
        let bob = Identity::with_blocked("bob", ["viewer"]).shared();
        let mut session = create_test_session(&owner);

        let stranger = user("stranger");
        assert!(session.is_visible_for(Some(&stranger)));
        assert!(session.is_visible_for(None));

        let viewer = user("viewer");
        assert!(session.is_visible_for(Some(&viewer)));
        session.join(1, &bob, None).unwrap();
        assert!(!session.is_visible_for(Some(&viewer)));

        session.leave("bob");
        assert!(session.is_visible_for(Some(&viewer)));

        viewer.block("owner");
        assert!(!session.is_visible_for(Some(&viewer)));
    }

    #[test]
    fn test_toggle_private() {
        let owner = user("owner");
        let mut session = create_test_session(&owner);
        session.set_private(true);
        assert!(session.is_private());
        session.mark_started().unwrap();
        session.set_private(false);
        assert!(!session.is_private());
    }
}

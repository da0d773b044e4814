//! Privacy-filtered session summaries
//!
//! Per-seat game data is only exposed to authenticated viewers of a started,
//! non-private session. Redaction keeps the shape of the data: a redacted
//! agenda list has the same length, with every slot emptied.

use crate::identity::Identity;
use crate::lobby::participant::ParticipantEntry;
use crate::lobby::session::LobbySession;
use crate::types::{GameFormat, Seat, SessionId, UserHandle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Who is asking for a summary
#[derive(Debug, Clone, Copy)]
pub struct ViewerContext<'a> {
    pub viewer: Option<&'a Identity>,
    pub authenticated: bool,
}

impl<'a> ViewerContext<'a> {
    pub fn new(viewer: Option<&'a Identity>, authenticated: bool) -> Self {
        Self {
            viewer,
            authenticated,
        }
    }
}

/// Anonymous and authenticated, same as passing `(None, true)`
impl Default for ViewerContext<'_> {
    fn default() -> Self {
        Self {
            viewer: None,
            authenticated: true,
        }
    }
}

/// Client-facing view of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub name: String,
    pub owner: UserHandle,
    pub format: GameFormat,
    pub started: bool,
    pub game_private: bool,
    pub spectators_allowed: bool,
    pub needs_password: bool,
    pub created_at: DateTime<Utc>,
    pub players: BTreeMap<UserHandle, ParticipantSummary>,
    pub spectators: BTreeMap<UserHandle, ParticipantSummary>,
}

/// Client-facing view of one seat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub name: UserHandle,
    pub seat: Seat,
    pub owner: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agendas: Option<Vec<Option<String>>>,
}

/// Build the summary of `session` as seen by `context`
pub fn project(session: &LobbySession, context: ViewerContext<'_>) -> SessionSummary {
    let reveal = context.authenticated && session.is_started() && !session.is_private();

    debug!(
        "Projecting session {} for {:?} (authenticated: {}, reveal game data: {})",
        session.id(),
        context.viewer.map(Identity::handle),
        context.authenticated,
        reveal
    );

    let players = session
        .players()
        .map(|entry| {
            (
                entry.handle().to_string(),
                player_summary(session, entry, reveal),
            )
        })
        .collect();

    let spectators = session
        .spectators()
        .map(|entry| {
            (
                entry.handle().to_string(),
                ParticipantSummary {
                    name: entry.handle().to_string(),
                    seat: entry.seat(),
                    owner: session.is_owner(entry.handle()),
                    faction: None,
                    agendas: None,
                },
            )
        })
        .collect();

    SessionSummary {
        id: session.id(),
        name: session.name().to_string(),
        owner: session.owner_handle().to_string(),
        format: session.format(),
        started: session.is_started(),
        game_private: session.is_private(),
        spectators_allowed: session.spectators_allowed(),
        needs_password: session.needs_password(),
        created_at: session.created_at(),
        players,
        spectators,
    }
}

fn player_summary(
    session: &LobbySession,
    entry: &ParticipantEntry,
    reveal: bool,
) -> ParticipantSummary {
    let faction = entry
        .faction()
        .filter(|_| reveal)
        .map(|faction| faction.code.clone());

    let agendas = entry.agendas().map(|agendas| {
        agendas
            .iter()
            .map(|agenda| reveal.then(|| agenda.code.clone()))
            .collect()
    });

    ParticipantSummary {
        name: entry.handle().to_string(),
        seat: entry.seat(),
        owner: session.is_owner(entry.handle()),
        faction,
        agendas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SharedIdentity;
    use crate::lobby::settings::{FormatRules, SessionOptions};
    use crate::types::CardData;

    /// Session with a seated player "player1" holding stark / fealty
    fn seated_session(owner: &SharedIdentity, player: &SharedIdentity) -> LobbySession {
        let mut session = LobbySession::new(
            owner.clone(),
            SessionOptions::new("summary test", GameFormat::Joust),
            FormatRules::joust(),
        );
        session.add_player(1, player).unwrap();
        session
            .assign_faction(player.handle(), CardData::new("stark"))
            .unwrap();
        session
            .assign_agendas(player.handle(), vec![CardData::new("fealty")])
            .unwrap();
        session
    }

    #[test]
    fn test_started_public_authenticated_reveals_game_data() {
        let owner = Identity::new("owner").shared();
        let player = Identity::new("player1").shared();
        let mut session = seated_session(&owner, &player);
        session.mark_started().unwrap();

        let summary = session.get_summary(ViewerContext::new(None, true));
        let seat = &summary.players["player1"];
        assert_eq!(seat.faction.as_deref(), Some("stark"));
        assert_eq!(seat.agendas, Some(vec![Some("fealty".to_string())]));
    }

    #[test]
    fn test_unauthenticated_viewer_gets_redacted_shape() {
        let owner = Identity::new("owner").shared();
        let player = Identity::new("player1").shared();
        let mut session = seated_session(&owner, &player);
        session.mark_started().unwrap();

        let summary = session.get_summary(ViewerContext::new(None, false));
        let seat = &summary.players["player1"];
        assert_eq!(seat.faction, None);
        assert_eq!(seat.agendas, Some(vec![None]));

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["players"]["player1"].get("faction").is_none());
        assert_eq!(json["players"]["player1"]["agendas"], serde_json::json!([null]));
    }

    #[test]
    fn test_private_game_redacts() {
        let owner = Identity::new("owner").shared();
        let player = Identity::new("player1").shared();
        let mut session = seated_session(&owner, &player);
        session.mark_started().unwrap();
        session.set_private(true);

        let summary = session.get_summary(ViewerContext::default());
        let seat = &summary.players["player1"];
        assert_eq!(seat.faction, None);
        assert_eq!(seat.agendas, Some(vec![None]));
    }

    #[test]
    fn test_unstarted_game_redacts() {
        let owner = Identity::new("owner").shared();
        let player = Identity::new("player1").shared();
        let session = seated_session(&owner, &player);

        let summary = session.get_summary(ViewerContext::default());
        let seat = &summary.players["player1"];
        assert_eq!(seat.faction, None);
        assert_eq!(seat.agendas, Some(vec![None]));
    }

    #[test]
    fn test_default_context_matches_explicit_authenticated() {
        let owner = Identity::new("owner").shared();
        let player = Identity::new("player1").shared();
        let mut session = seated_session(&owner, &player);
        session.mark_started().unwrap();

        assert_eq!(
            session.get_summary(ViewerContext::default()),
            session.get_summary(ViewerContext::new(None, true))
        );
    }

    #[test]
    fn test_always_present_fields() {
        let owner = Identity::new("owner").shared();
        let player = Identity::new("player1").shared();
        let watcher = Identity::new("watcher").shared();
        let mut session = seated_session(&owner, &player);
        session.watch(0, &watcher, None).unwrap();

        let summary = session.get_summary(ViewerContext::new(None, false));
        assert_eq!(summary.owner, "owner");
        assert_eq!(summary.format, GameFormat::Joust);
        assert!(!summary.started);
        assert!(!summary.game_private);
        assert!(summary.spectators_allowed);
        assert_eq!(summary.players["player1"].seat, 1);
        assert_eq!(summary.spectators["watcher"].name, "watcher");
        assert_eq!(summary.spectators["watcher"].agendas, None);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["gamePrivate"], false);
        assert_eq!(json["spectatorsAllowed"], true);
    }

    #[test]
    fn test_unassigned_fields_are_omitted() {
        let owner = Identity::new("owner").shared();
        let player = Identity::new("player1").shared();
        let mut session = LobbySession::new(
            owner.clone(),
            SessionOptions::new("fresh", GameFormat::Joust),
            FormatRules::joust(),
        );
        session.add_player(1, &player).unwrap();
        session.mark_started().unwrap();

        let summary = session.get_summary(ViewerContext::default());
        assert_eq!(summary.players["player1"].faction, None);
        assert_eq!(summary.players["player1"].agendas, None);
    }

    #[test]
    fn test_owner_flag() {
        let owner = Identity::new("owner").shared();
        let player = Identity::new("player1").shared();
        let mut session = seated_session(&owner, &player);
        session.add_player(2, &owner).unwrap();

        let summary = session.get_summary(ViewerContext::default());
        assert!(summary.players["owner"].owner);
        assert!(!summary.players["player1"].owner);
    }

    #[test]
    fn test_projection_is_repeatable() {
        let owner = Identity::new("owner").shared();
        let player = Identity::new("player1").shared();
        let mut session = seated_session(&owner, &player);
        session.mark_started().unwrap();
        let viewer = Identity::new("viewer");

        let first = session.get_summary(ViewerContext::new(Some(&viewer), true));
        let second = session.get_summary(ViewerContext::new(Some(&viewer), true));
        assert_eq!(first, second);
    }
}

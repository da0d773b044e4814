//! Session registry owning every open lobby session
//!
//! This module provides the `SessionRegistry`, which creates sessions,
//! serializes access to each one behind its own lock, publishes lobby events
//! and builds per-viewer listings.

use crate::error::{LobbyError, Result};
use crate::events::EventPublisher;
use crate::identity::{Identity, SharedIdentity};
use crate::lobby::session::LobbySession;
use crate::lobby::settings::{FormatProvider, SessionOptions};
use crate::lobby::summary::{SessionSummary, ViewerContext};
use crate::metrics::MetricsCollector;
use crate::types::{LeaveReason, LobbyEvent, ParticipantRole, Seat, SessionId, UserHandle};
use crate::utils::current_timestamp;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// A session behind its own lock
pub type SessionHandle = Arc<RwLock<LobbySession>>;

/// Statistics about registry operations
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStats {
    /// Total number of sessions created
    pub sessions_created: u64,
    /// Total number of sessions closed
    pub sessions_closed: u64,
    /// Join/watch requests admitted
    pub admissions_accepted: u64,
    /// Join/watch requests turned away
    pub admissions_rejected: u64,
    /// Total number of games started
    pub games_started: u64,
    /// Current number of open sessions
    pub active_sessions: usize,
}

/// Owner of all open lobby sessions
#[derive(Clone)]
pub struct SessionRegistry {
    /// Map of open sessions by ID
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
    /// Seat rules per game format
    format_provider: Arc<dyn FormatProvider>,
    /// Event publisher for lobby events
    event_publisher: Arc<dyn EventPublisher>,
    /// Registry statistics
    stats: Arc<RwLock<RegistryStats>>,
    /// Metrics collector for recording lobby activity
    metrics_collector: Arc<MetricsCollector>,
}

fn lock_error(what: &str) -> LobbyError {
    LobbyError::InternalError {
        message: format!("Failed to acquire {} lock", what),
    }
}

impl SessionRegistry {
    /// Create a new registry
    pub fn new(
        format_provider: Arc<dyn FormatProvider>,
        event_publisher: Arc<dyn EventPublisher>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            format_provider,
            event_publisher,
            stats: Arc::new(RwLock::new(RegistryStats::default())),
            metrics_collector,
        }
    }

    /// Open a new session owned by `owner`
    pub async fn create_session(
        &self,
        owner: SharedIdentity,
        options: SessionOptions,
    ) -> Result<SessionId> {
        let rules = self.format_provider.rules_for(options.format)?;
        let format = rules.format;
        let owner_handle = owner.handle().to_string();

        let session = LobbySession::new(owner, options, rules);
        let session_id = session.id();

        info!(
            "Creating {} session {} '{}' for owner '{}' (password: {}, spectators: {}, private: {})",
            format,
            session_id,
            session.name(),
            owner_handle,
            session.needs_password(),
            session.spectators_allowed(),
            session.is_private()
        );

        {
            let mut sessions = self.sessions.write().map_err(|_| lock_error("sessions"))?;
            sessions.insert(session_id, Arc::new(RwLock::new(session)));
        }

        self.update_stats(|stats| {
            stats.sessions_created += 1;
            stats.active_sessions += 1;
        })?;
        self.metrics_collector.record_session_created(format);

        self.publish(LobbyEvent::SessionCreated {
            session_id,
            owner: owner_handle,
            format,
            timestamp: current_timestamp(),
        })
        .await;

        Ok(session_id)
    }

    /// Request a player seat; a rejection carries an `AdmissionError`
    pub async fn join_session(
        &self,
        session_id: SessionId,
        seat: Seat,
        identity: &SharedIdentity,
        password: Option<&str>,
    ) -> Result<()> {
        self.admit(session_id, ParticipantRole::Player, seat, identity, password)
            .await
    }

    /// Request a spectator seat; a rejection carries an `AdmissionError`
    pub async fn watch_session(
        &self,
        session_id: SessionId,
        seat: Seat,
        identity: &SharedIdentity,
        password: Option<&str>,
    ) -> Result<()> {
        self.admit(
            session_id,
            ParticipantRole::Spectator,
            seat,
            identity,
            password,
        )
        .await
    }

    /// Seat a player directly without the admission gate
    pub async fn add_player(
        &self,
        session_id: SessionId,
        seat: Seat,
        identity: &SharedIdentity,
    ) -> Result<()> {
        let handle = self.session(session_id)?;
        {
            let mut session = handle.write().map_err(|_| lock_error("session"))?;
            session.add_player(seat, identity)?;
        }

        info!(
            "Seated '{}' directly in seat {} of session {}",
            identity.handle(),
            seat,
            session_id
        );
        self.publish(LobbyEvent::ParticipantJoined {
            session_id,
            user: identity.handle().to_string(),
            role: ParticipantRole::Player,
            seat,
            timestamp: current_timestamp(),
        })
        .await;

        Ok(())
    }

    /// Remove a participant at their own request. Returns whether anyone left.
    pub async fn leave_session(&self, session_id: SessionId, user: &str) -> Result<bool> {
        let handle = self.session(session_id)?;
        let removed = {
            let mut session = handle.write().map_err(|_| lock_error("session"))?;
            session.leave(user)
        };

        match removed {
            Some(entry) => {
                info!("'{}' left session {}", user, session_id);
                self.participant_left(session_id, entry.handle(), entry.role(), LeaveReason::Left)
                    .await;
                Ok(true)
            }
            None => {
                debug!("'{}' was not seated in session {}", user, session_id);
                Ok(false)
            }
        }
    }

    /// Owner removes another participant
    pub async fn remove_participant(
        &self,
        session_id: SessionId,
        by: &Identity,
        target: &str,
    ) -> Result<()> {
        let handle = self.session(session_id)?;
        let entry = {
            let mut session = handle.write().map_err(|_| lock_error("session"))?;
            session.remove_participant(by, target)?
        };

        info!(
            "'{}' removed '{}' from session {}",
            by.handle(),
            target,
            session_id
        );
        self.participant_left(session_id, entry.handle(), entry.role(), LeaveReason::Removed)
            .await;
        Ok(())
    }

    /// Owner toggles whether per-seat game data is hidden
    pub fn set_private(&self, session_id: SessionId, by: &Identity, game_private: bool) -> Result<()> {
        let handle = self.session(session_id)?;
        let mut session = handle.write().map_err(|_| lock_error("session"))?;
        if !session.is_owner(by.handle()) {
            return Err(LobbyError::NotOwner {
                user: by.handle().to_string(),
                session_id: session_id.to_string(),
            }
            .into());
        }
        session.set_private(game_private);
        info!("Session {} private: {}", session_id, game_private);
        Ok(())
    }

    /// Transition a session into the started state
    pub async fn start_session(&self, session_id: SessionId) -> Result<()> {
        let handle = self.session(session_id)?;
        let (format, players) = {
            let mut session = handle.write().map_err(|_| lock_error("session"))?;
            session.mark_started()?;
            let mut players: Vec<UserHandle> =
                session.players().map(|entry| entry.handle().to_string()).collect();
            players.sort();
            (session.format(), players)
        };

        info!(
            "Session {} started with {} players",
            session_id,
            players.len()
        );
        self.update_stats(|stats| stats.games_started += 1)?;
        self.metrics_collector.record_game_started(format);

        self.publish(LobbyEvent::SessionStarted {
            session_id,
            players,
            timestamp: current_timestamp(),
        })
        .await;
        Ok(())
    }

    /// Drop a concluded or abandoned session
    pub async fn close_session(&self, session_id: SessionId) -> Result<()> {
        let handle = {
            let mut sessions = self.sessions.write().map_err(|_| lock_error("sessions"))?;
            sessions
                .remove(&session_id)
                .ok_or_else(|| LobbyError::SessionNotFound {
                    session_id: session_id.to_string(),
                })?
        };

        let (format, seated) = {
            let session = handle.read().map_err(|_| lock_error("session"))?;
            (session.format(), session.get_players_and_spectators().len())
        };

        for _ in 0..seated {
            self.metrics_collector
                .record_participant_left(LeaveReason::SessionClosed);
        }
        self.update_stats(|stats| {
            stats.sessions_closed += 1;
            stats.active_sessions = stats.active_sessions.saturating_sub(1);
        })?;
        self.metrics_collector.record_session_closed(format);

        info!(
            "Closed session {} ({} participants released)",
            session_id, seated
        );
        self.publish(LobbyEvent::SessionClosed {
            session_id,
            timestamp: current_timestamp(),
        })
        .await;
        Ok(())
    }

    /// Exclusive access for the rules engine (seat field assignment)
    pub fn update_session<F, R>(&self, session_id: SessionId, f: F) -> Result<R>
    where
        F: FnOnce(&mut LobbySession) -> R,
    {
        let handle = self.session(session_id)?;
        let mut session = handle.write().map_err(|_| lock_error("session"))?;
        Ok(f(&mut session))
    }

    /// Summary of one session for a viewer
    pub fn get_summary(
        &self,
        session_id: SessionId,
        context: ViewerContext<'_>,
    ) -> Result<SessionSummary> {
        let handle = self.session(session_id)?;
        let session = handle.read().map_err(|_| lock_error("session"))?;
        Ok(session.get_summary(context))
    }

    /// Whether a session would appear in this viewer's listing
    pub fn is_visible_for(&self, session_id: SessionId, viewer: Option<&Identity>) -> Result<bool> {
        let handle = self.session(session_id)?;
        let session = handle.read().map_err(|_| lock_error("session"))?;
        Ok(session.is_visible_for(viewer))
    }

    /// Summaries of every session visible to the viewer, oldest first
    pub fn list_sessions(
        &self,
        viewer: Option<&Identity>,
        authenticated: bool,
    ) -> Result<Vec<SessionSummary>> {
        let timer = self.metrics_collector.start_timer();

        let handles: Vec<SessionHandle> = {
            let sessions = self.sessions.read().map_err(|_| lock_error("sessions"))?;
            sessions.values().cloned().collect()
        };

        let context = ViewerContext::new(viewer, authenticated);
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let session = handle.read().map_err(|_| lock_error("session"))?;
            if session.is_visible_for(viewer) {
                summaries.push(session.get_summary(context));
            }
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let duration = timer.stop();
        self.metrics_collector.record_listing(duration);
        debug!(
            "Listed {} sessions for {:?} in {:.3}ms",
            summaries.len(),
            viewer.map(Identity::handle),
            duration.as_secs_f64() * 1000.0
        );

        Ok(summaries)
    }

    /// IDs of all open sessions
    pub fn session_ids(&self) -> Result<Vec<SessionId>> {
        let sessions = self.sessions.read().map_err(|_| lock_error("sessions"))?;
        Ok(sessions.keys().copied().collect())
    }

    /// Get current registry statistics
    pub fn get_stats(&self) -> Result<RegistryStats> {
        let stats = self.stats.read().map_err(|_| lock_error("stats"))?;
        Ok(stats.clone())
    }

    fn session(&self, session_id: SessionId) -> Result<SessionHandle> {
        let sessions = self.sessions.read().map_err(|_| lock_error("sessions"))?;
        sessions.get(&session_id).cloned().ok_or_else(|| {
            LobbyError::SessionNotFound {
                session_id: session_id.to_string(),
            }
            .into()
        })
    }

    async fn admit(
        &self,
        session_id: SessionId,
        role: ParticipantRole,
        seat: Seat,
        identity: &SharedIdentity,
        password: Option<&str>,
    ) -> Result<()> {
        let handle = self.session(session_id)?;
        let outcome = {
            let mut session = handle.write().map_err(|_| lock_error("session"))?;
            match role {
                ParticipantRole::Player => session.join(seat, identity, password),
                ParticipantRole::Spectator => session.watch(seat, identity, password),
            }
        };

        self.metrics_collector.record_admission(role, outcome);
        let user = identity.handle().to_string();

        match outcome {
            Ok(()) => {
                info!(
                    "Admitted '{}' as {} in seat {} of session {}",
                    user, role, seat, session_id
                );
                self.update_stats(|stats| stats.admissions_accepted += 1)?;
                self.publish(LobbyEvent::ParticipantJoined {
                    session_id,
                    user,
                    role,
                    seat,
                    timestamp: current_timestamp(),
                })
                .await;
                Ok(())
            }
            Err(reason) => {
                warn!(
                    "Rejected '{}' as {} for session {}: {}",
                    user,
                    role,
                    session_id,
                    reason.code()
                );
                self.update_stats(|stats| stats.admissions_rejected += 1)?;
                self.publish(LobbyEvent::AdmissionRejected {
                    session_id,
                    user,
                    role,
                    reason: reason.code().to_string(),
                    timestamp: current_timestamp(),
                })
                .await;
                Err(reason.into())
            }
        }
    }

    async fn participant_left(
        &self,
        session_id: SessionId,
        user: &str,
        role: ParticipantRole,
        reason: LeaveReason,
    ) {
        self.metrics_collector.record_participant_left(reason);
        self.publish(LobbyEvent::ParticipantLeft {
            session_id,
            user: user.to_string(),
            role,
            reason,
            timestamp: current_timestamp(),
        })
        .await;
    }

    fn update_stats<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut RegistryStats),
    {
        let mut stats = self.stats.write().map_err(|_| lock_error("stats"))?;
        f(&mut stats);
        Ok(())
    }

    /// Publish failures are logged; the state change already happened
    async fn publish(&self, event: LobbyEvent) {
        let kind = event.kind();
        if let Err(e) = self.event_publisher.publish(event).await {
            warn!("Failed to publish {} event: {}", kind, e);
        }
    }
}

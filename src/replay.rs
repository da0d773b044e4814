//! Scripted replay of lobby operations
//!
//! Drives a `SessionRegistry` from a JSON list of steps and reports the
//! outcome of each one. Identities live in an in-memory directory filled by
//! `register` steps, standing in for the account subsystem.

use crate::config::LobbySettings;
use crate::error::{AdmissionError, LobbyError, Result};
use crate::identity::{Identity, SharedIdentity};
use crate::lobby::{SessionOptions, SessionRegistry, ViewerContext};
use crate::types::{CardData, GameFormat, Seat, SessionId};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

fn default_true() -> bool {
    true
}

/// One scripted operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    Register {
        user: String,
        #[serde(default)]
        blocks: Vec<String>,
    },
    Block {
        user: String,
        target: String,
    },
    Unblock {
        user: String,
        target: String,
    },
    Create {
        session: String,
        owner: String,
        format: GameFormat,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        spectators: Option<bool>,
        #[serde(default)]
        private: bool,
    },
    Join {
        session: String,
        user: String,
        seat: Seat,
        #[serde(default)]
        password: Option<String>,
    },
    Watch {
        session: String,
        user: String,
        #[serde(default)]
        seat: Seat,
        #[serde(default)]
        password: Option<String>,
    },
    AddPlayer {
        session: String,
        user: String,
        seat: Seat,
    },
    Leave {
        session: String,
        user: String,
    },
    Kick {
        session: String,
        by: String,
        target: String,
    },
    SetPrivate {
        session: String,
        by: String,
        private: bool,
    },
    Start {
        session: String,
    },
    Assign {
        session: String,
        user: String,
        #[serde(default)]
        faction: Option<String>,
        #[serde(default)]
        agendas: Option<Vec<String>>,
    },
    Visible {
        session: String,
        #[serde(default)]
        viewer: Option<String>,
    },
    Summary {
        session: String,
        #[serde(default)]
        viewer: Option<String>,
        #[serde(default = "default_true")]
        authenticated: bool,
    },
    List {
        #[serde(default)]
        viewer: Option<String>,
        #[serde(default = "default_true")]
        authenticated: bool,
    },
    Close {
        session: String,
    },
}

impl ScriptStep {
    /// Operation name, matching the serialized `op` tag
    pub fn op(&self) -> &'static str {
        match self {
            ScriptStep::Register { .. } => "register",
            ScriptStep::Block { .. } => "block",
            ScriptStep::Unblock { .. } => "unblock",
            ScriptStep::Create { .. } => "create",
            ScriptStep::Join { .. } => "join",
            ScriptStep::Watch { .. } => "watch",
            ScriptStep::AddPlayer { .. } => "add_player",
            ScriptStep::Leave { .. } => "leave",
            ScriptStep::Kick { .. } => "kick",
            ScriptStep::SetPrivate { .. } => "set_private",
            ScriptStep::Start { .. } => "start",
            ScriptStep::Assign { .. } => "assign",
            ScriptStep::Visible { .. } => "visible",
            ScriptStep::Summary { .. } => "summary",
            ScriptStep::List { .. } => "list",
            ScriptStep::Close { .. } => "close",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    Ok,
    Rejected,
    Error,
}

/// Result of one replayed step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub op: &'static str,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

/// Parse a JSON array of steps
pub fn parse_script(contents: &str) -> Result<Vec<ScriptStep>> {
    serde_json::from_str(contents).context("Failed to parse replay script")
}

/// Replays scripts against one registry
pub struct ReplayRunner {
    registry: SessionRegistry,
    identities: HashMap<String, SharedIdentity>,
    sessions: HashMap<String, SessionId>,
    default_spectators_allowed: bool,
}

impl ReplayRunner {
    pub fn new(registry: SessionRegistry, settings: &LobbySettings) -> Self {
        Self {
            registry,
            identities: HashMap::new(),
            sessions: HashMap::new(),
            default_spectators_allowed: settings.default_spectators_allowed,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Run every step in order; a failing step does not stop the script
    pub async fn run(&mut self, steps: &[ScriptStep]) -> Vec<StepReport> {
        let mut reports = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let report = match self.execute(step).await {
                Ok(data) => StepReport {
                    step: index,
                    op: step.op(),
                    outcome: StepOutcome::Ok,
                    reason: None,
                    data,
                },
                Err(e) => match e.downcast_ref::<AdmissionError>() {
                    Some(reason) => StepReport {
                        step: index,
                        op: step.op(),
                        outcome: StepOutcome::Rejected,
                        reason: Some(reason.code().to_string()),
                        data: Value::Null,
                    },
                    None => StepReport {
                        step: index,
                        op: step.op(),
                        outcome: StepOutcome::Error,
                        reason: Some(e.to_string()),
                        data: Value::Null,
                    },
                },
            };

            debug!(
                "Replay step {} ({}): {:?}",
                report.step, report.op, report.outcome
            );
            reports.push(report);
        }

        reports
    }

    async fn execute(&mut self, step: &ScriptStep) -> Result<Value> {
        match step {
            ScriptStep::Register { user, blocks } => {
                if self.identities.contains_key(user) {
                    return Err(anyhow::anyhow!("User already registered: {}", user));
                }
                let identity = Identity::with_blocked(user.as_str(), blocks).shared();
                self.identities.insert(user.clone(), identity);
                Ok(Value::Null)
            }
            ScriptStep::Block { user, target } => {
                let changed = self.identity(user)?.block(target);
                Ok(json!({ "changed": changed }))
            }
            ScriptStep::Unblock { user, target } => {
                let changed = self.identity(user)?.unblock(target);
                Ok(json!({ "changed": changed }))
            }
            ScriptStep::Create {
                session,
                owner,
                format,
                name,
                password,
                spectators,
                private,
            } => {
                if self.sessions.contains_key(session) {
                    return Err(anyhow::anyhow!("Session label already used: {}", session));
                }
                let owner = self.identity(owner)?;
                let mut options = SessionOptions::new(
                    name.clone().unwrap_or_else(|| session.clone()),
                    *format,
                )
                .with_spectators(spectators.unwrap_or(self.default_spectators_allowed))
                .private(*private);
                if let Some(password) = password {
                    options = options.with_password(password.as_str());
                }

                let session_id = self.registry.create_session(owner, options).await?;
                self.sessions.insert(session.clone(), session_id);
                Ok(json!({ "session_id": session_id }))
            }
            ScriptStep::Join {
                session,
                user,
                seat,
                password,
            } => {
                let session_id = self.session_id(session)?;
                let identity = self.identity(user)?;
                self.registry
                    .join_session(session_id, *seat, &identity, password.as_deref())
                    .await?;
                Ok(Value::Null)
            }
            ScriptStep::Watch {
                session,
                user,
                seat,
                password,
            } => {
                let session_id = self.session_id(session)?;
                let identity = self.identity(user)?;
                self.registry
                    .watch_session(session_id, *seat, &identity, password.as_deref())
                    .await?;
                Ok(Value::Null)
            }
            ScriptStep::AddPlayer {
                session,
                user,
                seat,
            } => {
                let session_id = self.session_id(session)?;
                let identity = self.identity(user)?;
                self.registry
                    .add_player(session_id, *seat, &identity)
                    .await?;
                Ok(Value::Null)
            }
            ScriptStep::Leave { session, user } => {
                let session_id = self.session_id(session)?;
                let removed = self.registry.leave_session(session_id, user).await?;
                Ok(json!({ "removed": removed }))
            }
            ScriptStep::Kick {
                session,
                by,
                target,
            } => {
                let session_id = self.session_id(session)?;
                let by = self.identity(by)?;
                self.registry
                    .remove_participant(session_id, &by, target)
                    .await?;
                Ok(Value::Null)
            }
            ScriptStep::SetPrivate {
                session,
                by,
                private,
            } => {
                let session_id = self.session_id(session)?;
                let by = self.identity(by)?;
                self.registry.set_private(session_id, &by, *private)?;
                Ok(Value::Null)
            }
            ScriptStep::Start { session } => {
                let session_id = self.session_id(session)?;
                self.registry.start_session(session_id).await?;
                Ok(Value::Null)
            }
            ScriptStep::Assign {
                session,
                user,
                faction,
                agendas,
            } => {
                let session_id = self.session_id(session)?;
                self.registry.update_session(session_id, |lobby| -> Result<()> {
                    if let Some(faction) = faction {
                        lobby.assign_faction(user, CardData::new(faction.as_str()))?;
                    }
                    if let Some(agendas) = agendas {
                        let cards = agendas
                            .iter()
                            .map(|code| CardData::new(code.as_str()))
                            .collect();
                        lobby.assign_agendas(user, cards)?;
                    }
                    Ok(())
                })??;
                Ok(Value::Null)
            }
            ScriptStep::Visible { session, viewer } => {
                let session_id = self.session_id(session)?;
                let viewer = self.viewer(viewer.as_deref())?;
                let visible = self
                    .registry
                    .is_visible_for(session_id, viewer.as_deref())?;
                Ok(json!({ "visible": visible }))
            }
            ScriptStep::Summary {
                session,
                viewer,
                authenticated,
            } => {
                let session_id = self.session_id(session)?;
                let viewer = self.viewer(viewer.as_deref())?;
                let summary = self.registry.get_summary(
                    session_id,
                    ViewerContext::new(viewer.as_deref(), *authenticated),
                )?;
                Ok(serde_json::to_value(summary)?)
            }
            ScriptStep::List {
                viewer,
                authenticated,
            } => {
                let viewer = self.viewer(viewer.as_deref())?;
                let summaries = self
                    .registry
                    .list_sessions(viewer.as_deref(), *authenticated)?;
                Ok(serde_json::to_value(summaries)?)
            }
            ScriptStep::Close { session } => {
                let session_id = self.session_id(session)?;
                self.registry.close_session(session_id).await?;
                self.sessions.remove(session);
                Ok(Value::Null)
            }
        }
    }

    fn identity(&self, user: &str) -> Result<SharedIdentity> {
        self.identities.get(user).cloned().ok_or_else(|| {
            LobbyError::ParticipantNotFound {
                user: user.to_string(),
            }
            .into()
        })
    }

    fn viewer(&self, viewer: Option<&str>) -> Result<Option<SharedIdentity>> {
        viewer.map(|user| self.identity(user)).transpose()
    }

    fn session_id(&self, label: &str) -> Result<SessionId> {
        self.sessions.get(label).copied().ok_or_else(|| {
            LobbyError::SessionNotFound {
                session_id: label.to_string(),
            }
            .into()
        })
    }
}

//! Session creation options and per-format seat rules
//!
//! This module defines how seat capacity is derived for each game format,
//! along with the static provider built from application configuration.

use crate::config::LobbySettings;
use crate::error::{LobbyError, Result};
use crate::types::GameFormat;
use serde::{Deserialize, Serialize};

/// Seat capacity for a game format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRules {
    /// Format these rules apply to
    pub format: GameFormat,
    /// Maximum number of seated players
    pub max_players: usize,
    /// Maximum number of spectators, unbounded when `None`
    pub max_spectators: Option<usize>,
}

impl FormatRules {
    /// Head-to-head rules
    pub fn joust() -> Self {
        Self {
            format: GameFormat::Joust,
            max_players: 2,
            max_spectators: None,
        }
    }

    /// Multiplayer rules
    pub fn melee() -> Self {
        Self {
            format: GameFormat::Melee,
            max_players: 6,
            max_spectators: None,
        }
    }
}

/// What the owner asks for when opening a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    pub name: String,
    pub format: GameFormat,
    /// Join password; empty means none
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub spectators_allowed: bool,
    #[serde(default)]
    pub game_private: bool,
}

fn default_true() -> bool {
    true
}

impl SessionOptions {
    pub fn new(name: impl Into<String>, format: GameFormat) -> Self {
        Self {
            name: name.into(),
            format,
            password: None,
            spectators_allowed: true,
            game_private: false,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_spectators(mut self, allowed: bool) -> Self {
        self.spectators_allowed = allowed;
        self
    }

    pub fn private(mut self, game_private: bool) -> Self {
        self.game_private = game_private;
        self
    }
}

/// Trait for providing seat rules per game format
pub trait FormatProvider: Send + Sync {
    /// Get rules for a specific format
    fn rules_for(&self, format: GameFormat) -> Result<FormatRules>;

    /// Get all available formats
    fn available_formats(&self) -> Vec<GameFormat>;

    /// Validate a set of rules
    fn validate_rules(&self, rules: &FormatRules) -> Result<()>;
}

/// Fixed rules for the two supported formats
#[derive(Debug, Clone)]
pub struct StaticFormatProvider {
    joust: FormatRules,
    melee: FormatRules,
}

impl StaticFormatProvider {
    /// Create a provider with default rules
    pub fn new() -> Self {
        Self {
            joust: FormatRules::joust(),
            melee: FormatRules::melee(),
        }
    }

    /// Build rules from lobby settings
    pub fn from_settings(settings: &LobbySettings) -> Result<Self> {
        let joust = FormatRules {
            max_players: settings.joust_max_players,
            max_spectators: settings.max_spectators,
            ..FormatRules::joust()
        };
        let melee = FormatRules {
            max_players: settings.melee_max_players,
            max_spectators: settings.max_spectators,
            ..FormatRules::melee()
        };

        let provider = Self {
            joust: joust.clone(),
            melee: melee.clone(),
        };
        provider.validate_rules(&joust)?;
        provider.validate_rules(&melee)?;

        Ok(provider)
    }
}

impl Default for StaticFormatProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for StaticFormatProvider {
    fn rules_for(&self, format: GameFormat) -> Result<FormatRules> {
        match format {
            GameFormat::Joust => Ok(self.joust.clone()),
            GameFormat::Melee => Ok(self.melee.clone()),
        }
    }

    fn available_formats(&self) -> Vec<GameFormat> {
        vec![GameFormat::Joust, GameFormat::Melee]
    }

    fn validate_rules(&self, rules: &FormatRules) -> Result<()> {
        if rules.max_players < 2 {
            return Err(LobbyError::ConfigurationError {
                message: format!("{} sessions need at least 2 player seats", rules.format),
            }
            .into());
        }

        if rules.max_players > 8 {
            return Err(LobbyError::ConfigurationError {
                message: format!("{} sessions cannot exceed 8 player seats", rules.format),
            }
            .into());
        }

        if rules.max_spectators == Some(0) {
            return Err(LobbyError::ConfigurationError {
                message: "Spectator cap must be greater than 0; disable spectators per session instead"
                    .to_string(),
            }
            .into());
        }

        Ok(())
    }
}

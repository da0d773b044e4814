//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! lobby coordinator, including environment variable loading, TOML files
//! and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub lobby: LobbySettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Seat and spectator defaults for new sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbySettings {
    /// Player seats in a joust session
    pub joust_max_players: usize,
    /// Player seats in a melee session
    pub melee_max_players: usize,
    /// Spectator cap per session, unbounded when unset
    pub max_spectators: Option<usize>,
    /// Whether sessions allow spectators unless the owner says otherwise
    pub default_spectators_allowed: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "lobby-coordinator".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for LobbySettings {
    fn default() -> Self {
        Self {
            joust_max_players: 2,
            melee_max_players: 6,
            max_spectators: None,
            default_spectators_allowed: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Lobby settings
        if let Ok(players) = env::var("JOUST_MAX_PLAYERS") {
            self.lobby.joust_max_players = players
                .parse()
                .map_err(|_| anyhow!("Invalid JOUST_MAX_PLAYERS value: {}", players))?;
        }
        if let Ok(players) = env::var("MELEE_MAX_PLAYERS") {
            self.lobby.melee_max_players = players
                .parse()
                .map_err(|_| anyhow!("Invalid MELEE_MAX_PLAYERS value: {}", players))?;
        }
        if let Ok(spectators) = env::var("MAX_SPECTATORS") {
            self.lobby.max_spectators = Some(
                spectators
                    .parse()
                    .map_err(|_| anyhow!("Invalid MAX_SPECTATORS value: {}", spectators))?,
            );
        }
        if let Ok(allowed) = env::var("DEFAULT_SPECTATORS_ALLOWED") {
            self.lobby.default_spectators_allowed = allowed
                .parse()
                .map_err(|_| anyhow!("Invalid DEFAULT_SPECTATORS_ALLOWED value: {}", allowed))?;
        }

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    // Validate seat capacities
    for (label, seats) in [
        ("joust", config.lobby.joust_max_players),
        ("melee", config.lobby.melee_max_players),
    ] {
        if !(2..=8).contains(&seats) {
            return Err(anyhow!(
                "{} player seats must be between 2 and 8, got {}",
                label,
                seats
            ));
        }
    }
    if config.lobby.melee_max_players < config.lobby.joust_max_players {
        return Err(anyhow!("Melee sessions cannot seat fewer players than joust"));
    }
    if config.lobby.max_spectators == Some(0) {
        return Err(anyhow!("Spectator cap must be greater than 0"));
    }

    Ok(())
}

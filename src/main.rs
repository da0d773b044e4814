//! Entry point for the lobby coordinator
//!
//! Loads configuration, builds a session registry and replays a scripted
//! sequence of lobby operations against it, printing one report per step.

use anyhow::{Context, Result};
use clap::Parser;
use lobby_coordinator::config::{validate_config, AppConfig};
use lobby_coordinator::events::LogEventPublisher;
use lobby_coordinator::lobby::{SessionRegistry, StaticFormatProvider};
use lobby_coordinator::metrics::MetricsCollector;
use lobby_coordinator::replay::{parse_script, ReplayRunner, StepOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Lobby Coordinator - game session admission, visibility and summaries
#[derive(Parser)]
#[command(
    name = "lobby-coordinator",
    version,
    about = "Coordinates pre-game lobby sessions for a card game server",
    long_about = "Lobby Coordinator owns pre-game sessions: it decides who may take a player \
                 or spectator seat, which sessions each viewer may see, and what each viewer \
                 learns about the seats. Scripts of lobby operations can be replayed against \
                 a fresh registry for inspection."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without replaying anything")]
    dry_run: bool,

    /// Replay script
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "JSON array of lobby operations to replay"
    )]
    script: Option<PathBuf>,

    /// Print metrics after the replay
    #[arg(long, help = "Print Prometheus metrics after the replay")]
    metrics: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn display_startup_banner(config: &AppConfig) {
    info!("Lobby Coordinator");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   Seats: joust {}, melee {}",
        config.lobby.joust_max_players, config.lobby.melee_max_players
    );
    match config.lobby.max_spectators {
        Some(cap) => info!("   Spectator cap: {}", cap),
        None => info!("   Spectator cap: none"),
    }
}

/// Load and merge configuration from file/environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(config_path) => AppConfig::from_file(config_path)?,
        None => AppConfig::from_env()?,
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    validate_config(&config)?;
    Ok(config)
}

fn build_registry(config: &AppConfig, metrics: Arc<MetricsCollector>) -> Result<SessionRegistry> {
    let provider = StaticFormatProvider::from_settings(&config.lobby)?;
    Ok(SessionRegistry::new(
        Arc::new(provider),
        Arc::new(LogEventPublisher),
        metrics,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        return Ok(());
    }

    let metrics = Arc::new(MetricsCollector::new()?);
    let registry = build_registry(&config, metrics.clone())?;

    match &args.script {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script {}", path.display()))?;
            let steps = match parse_script(&contents) {
                Ok(steps) => steps,
                Err(e) => {
                    error!("{:#}", e);
                    std::process::exit(1);
                }
            };

            info!("Replaying {} steps from {}", steps.len(), path.display());
            let mut runner = ReplayRunner::new(registry, &config.lobby);
            let reports = runner.run(&steps).await;

            for report in &reports {
                println!("{}", serde_json::to_string(report)?);
            }

            let failed = reports
                .iter()
                .filter(|report| report.outcome == StepOutcome::Error)
                .count();
            if failed > 0 {
                warn!("{} of {} steps failed", failed, reports.len());
            }

            let stats = runner.registry().get_stats()?;
            info!(
                "Replay finished: {} sessions created, {} admitted, {} rejected, {} started",
                stats.sessions_created,
                stats.admissions_accepted,
                stats.admissions_rejected,
                stats.games_started
            );
        }
        None => {
            warn!("No script given; nothing to replay");
        }
    }

    if args.metrics {
        print!("{}", metrics.gather_text()?);
    }

    Ok(())
}

//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the lobby coordinator using
//! Prometheus metrics.

use crate::error::AdmissionError;
use crate::types::{GameFormat, LeaveReason, ParticipantRole};
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the lobby coordinator
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Session lifecycle metrics
    session_metrics: SessionMetrics,

    /// Admission and roster metrics
    admission_metrics: AdmissionMetrics,
}

/// Session lifecycle metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Total sessions created
    pub sessions_created_total: IntCounterVec,

    /// Number of open sessions by format
    pub active_sessions: IntGaugeVec,

    /// Total games started
    pub games_started_total: IntCounterVec,

    /// Time spent building a listing
    pub listing_duration_seconds: HistogramVec,
}

/// Admission and roster metrics
#[derive(Clone)]
pub struct AdmissionMetrics {
    /// Join/watch decisions by role and outcome
    pub admissions_total: IntCounterVec,

    /// Participants leaving by reason
    pub participants_left_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let session_metrics = SessionMetrics::new(&registry)?;
        let admission_metrics = AdmissionMetrics::new(&registry)?;

        Ok(Self {
            registry,
            session_metrics,
            admission_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn sessions(&self) -> &SessionMetrics {
        &self.session_metrics
    }

    pub fn admissions(&self) -> &AdmissionMetrics {
        &self.admission_metrics
    }

    /// Record a session being opened
    pub fn record_session_created(&self, format: GameFormat) {
        let format = format.to_string();
        self.session_metrics
            .sessions_created_total
            .with_label_values(&[format.as_str()])
            .inc();
        self.session_metrics
            .active_sessions
            .with_label_values(&[format.as_str()])
            .inc();
    }

    /// Record a session being closed
    pub fn record_session_closed(&self, format: GameFormat) {
        self.session_metrics
            .active_sessions
            .with_label_values(&[format.to_string().as_str()])
            .dec();
    }

    /// Record a game starting
    pub fn record_game_started(&self, format: GameFormat) {
        self.session_metrics
            .games_started_total
            .with_label_values(&[format.to_string().as_str()])
            .inc();
    }

    /// Record a join/watch decision
    pub fn record_admission(
        &self,
        role: ParticipantRole,
        outcome: std::result::Result<(), AdmissionError>,
    ) {
        let outcome = match outcome {
            Ok(()) => "accepted",
            Err(reason) => reason.code(),
        };
        self.admission_metrics
            .admissions_total
            .with_label_values(&[role.to_string().as_str(), outcome])
            .inc();
    }

    /// Record a participant leaving
    pub fn record_participant_left(&self, reason: LeaveReason) {
        self.admission_metrics
            .participants_left_total
            .with_label_values(&[reason.as_str()])
            .inc();
    }

    /// Record how long a listing took
    pub fn record_listing(&self, duration: Duration) {
        self.session_metrics
            .listing_duration_seconds
            .with_label_values(&["list"])
            .observe(duration.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl SessionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let sessions_created_total = IntCounterVec::new(
            Opts::new("lobby_sessions_created_total", "Total sessions created"),
            &["format"],
        )?;
        registry.register(Box::new(sessions_created_total.clone()))?;

        let active_sessions = IntGaugeVec::new(
            Opts::new("lobby_active_sessions", "Number of open sessions"),
            &["format"],
        )?;
        registry.register(Box::new(active_sessions.clone()))?;

        let games_started_total = IntCounterVec::new(
            Opts::new("lobby_games_started_total", "Total games started"),
            &["format"],
        )?;
        registry.register(Box::new(games_started_total.clone()))?;

        let listing_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "lobby_listing_duration_seconds",
                "Time spent building a session listing",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
            &["operation"],
        )?;
        registry.register(Box::new(listing_duration_seconds.clone()))?;

        Ok(Self {
            sessions_created_total,
            active_sessions,
            games_started_total,
            listing_duration_seconds,
        })
    }
}

impl AdmissionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let admissions_total = IntCounterVec::new(
            Opts::new("lobby_admissions_total", "Join and watch decisions"),
            &["role", "outcome"],
        )?;
        registry.register(Box::new(admissions_total.clone()))?;

        let participants_left_total = IntCounterVec::new(
            Opts::new("lobby_participants_left_total", "Participants leaving sessions"),
            &["reason"],
        )?;
        registry.register(Box::new(participants_left_total.clone()))?;

        Ok(Self {
            admissions_total,
            participants_left_total,
        })
    }
}

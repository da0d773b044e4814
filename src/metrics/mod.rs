//! Metrics and monitoring for the lobby coordinator
//!
//! This module provides Prometheus metrics for session lifecycle, admission
//! decisions and listing performance.

pub mod collector;

pub use collector::{AdmissionMetrics, MetricsCollector, MetricsTimer, SessionMetrics};

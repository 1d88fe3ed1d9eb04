//! # Drone Analytics
//!
//! Heuristic attack tagging for drone communication telemetry.
//! Reads a telemetry table, classifies each row against fixed rules,
//! and produces a labeled dataset plus summary reports.
//!
//! ## Rules
//!
//! Applied in order; a later match replaces an earlier one.
//!
//! - Protocol/frequency mismatch
//! - GPS spoofing (implied ground speed between consecutive fixes)
//! - Traffic anomaly (packet volume)
//! - Signal jamming (signal-strength swing between consecutive rows)

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod reports;
pub mod rules;

pub use config::{RuleConfig, TaggerConfig};
pub use dataset::{Dataset, TelemetryRecord};
pub use engine::{Classification, RuleEvaluator};
pub use error::AnalyticsError;
pub use pipeline::run;
pub use reports::AttackReport;

//! # Tagger Configuration
//!
//! Paths and rule parameters for a tagging run. Defaults reproduce the
//! thresholds the heuristics were tuned with; every value can be overridden
//! so tests can inject small synthetic datasets.

use crate::error::{AnalyticsError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default GPS spoofing threshold (km/h).
pub const DEFAULT_MAX_SPEED_KMH: f64 = 500.0;

/// Default traffic anomaly threshold (packets).
pub const DEFAULT_MAX_TRAFFIC_VOLUME: u64 = 1000;

/// Default jamming threshold (absolute signal-strength delta).
pub const DEFAULT_MAX_SIGNAL_DELTA: f64 = 20.0;

/// Frequencies closer than this (GHz) are treated as the same band.
pub const FREQUENCY_TOLERANCE_GHZ: f64 = 1e-9;

/// Parameters of the four heuristic rules.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleConfig {
    /// Allowed frequency bands (GHz) per communication protocol
    pub protocol_bands: BTreeMap<String, Vec<f64>>,

    /// Implied ground speed above which a fix is considered spoofed
    pub max_speed_kmh: f64,

    /// Packet volume above which traffic is anomalous
    pub max_traffic_volume: u64,

    /// Row-to-row signal change above which the link is considered jammed
    pub max_signal_delta: f64,
}

impl RuleConfig {
    /// Allowed bands for `protocol`, or `None` if the protocol is not tracked.
    pub fn allowed_bands(&self, protocol: &str) -> Option<&[f64]> {
        self.protocol_bands.get(protocol).map(Vec::as_slice)
    }

    /// Reject thresholds that would make a rule meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.max_speed_kmh.is_finite() || self.max_speed_kmh < 0.0 {
            return Err(AnalyticsError::InvalidParameter(format!(
                "max_speed_kmh must be a non-negative number, got {}",
                self.max_speed_kmh
            )));
        }
        if !self.max_signal_delta.is_finite() || self.max_signal_delta < 0.0 {
            return Err(AnalyticsError::InvalidParameter(format!(
                "max_signal_delta must be a non-negative number, got {}",
                self.max_signal_delta
            )));
        }
        for (protocol, bands) in &self.protocol_bands {
            if bands.is_empty() {
                return Err(AnalyticsError::InvalidParameter(format!(
                    "protocol {protocol} has no allowed frequency bands"
                )));
            }
            if let Some(bad) = bands.iter().find(|band| !band.is_finite()) {
                return Err(AnalyticsError::InvalidParameter(format!(
                    "protocol {protocol} has non-finite band {bad}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        let protocol_bands = [
            ("ZigBee", vec![2.4]),
            ("LoRa", vec![0.868, 2.4]),
            ("Wi-Fi", vec![2.4, 5.0]),
        ]
        .into_iter()
        .map(|(protocol, bands)| (protocol.to_string(), bands))
        .collect();

        Self {
            protocol_bands,
            max_speed_kmh: DEFAULT_MAX_SPEED_KMH,
            max_traffic_volume: DEFAULT_MAX_TRAFFIC_VOLUME,
            max_signal_delta: DEFAULT_MAX_SIGNAL_DELTA,
        }
    }
}

/// Full configuration of a tagging run.
#[derive(Debug, Clone)]
pub struct TaggerConfig {
    /// Source telemetry table
    pub input_path: PathBuf,

    /// Labeled dataset destination
    pub output_path: PathBuf,

    /// Attack summary destination
    pub summary_path: PathBuf,

    /// Optional JSON report destination
    pub report_json_path: Option<PathBuf>,

    /// Optional Markdown report destination
    pub report_markdown_path: Option<PathBuf>,

    /// Rule parameters
    pub rules: RuleConfig,
}

impl TaggerConfig {
    /// Configuration with the given paths and default rules.
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        summary_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            summary_path: summary_path.into(),
            report_json_path: None,
            report_markdown_path: None,
            rules: RuleConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let outputs = [Some(&self.output_path), Some(&self.summary_path)]
            .into_iter()
            .chain([
                self.report_json_path.as_ref(),
                self.report_markdown_path.as_ref(),
            ])
            .flatten();
        let mut seen: Vec<&PathBuf> = Vec::new();
        for path in outputs {
            if path == &self.input_path {
                return Err(AnalyticsError::InvalidParameter(format!(
                    "output {} would overwrite the input",
                    path.display()
                )));
            }
            if seen.contains(&path) {
                return Err(AnalyticsError::InvalidParameter(format!(
                    "output {} is configured more than once",
                    path.display()
                )));
            }
            seen.push(path);
        }
        self.rules.validate()
    }
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self::new(
            "drone_communication_dataset.csv",
            "drone_communication_dataset_tagged.csv",
            "attack_summary.csv",
        )
    }
}

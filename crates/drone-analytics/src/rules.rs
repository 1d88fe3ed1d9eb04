//! The four heuristic attack rules.
//!
//! Each rule is a pure function of the current row, its predecessor and the
//! rule parameters. A rule returns the attack it detected, or `None`.

use crate::config::{FREQUENCY_TOLERANCE_GHZ, RuleConfig};
use crate::dataset::TelemetryRecord;
use drone_domain::AttackType;
use tracing::debug;

/// The current row and, except for the first row, the one before it.
#[derive(Debug, Clone, Copy)]
pub struct RowWindow<'a> {
    pub index: usize,
    pub previous: Option<&'a TelemetryRecord>,
    pub current: &'a TelemetryRecord,
}

impl<'a> RowWindow<'a> {
    /// Sliding windows of size two over `records`, first row included.
    pub fn over(records: &'a [TelemetryRecord]) -> impl Iterator<Item = RowWindow<'a>> + 'a {
        let first = records.first().map(|current| RowWindow {
            index: 0,
            previous: None,
            current,
        });
        let rest = records
            .windows(2)
            .enumerate()
            .map(|(idx, pair)| RowWindow {
                index: idx + 1,
                previous: Some(&pair[0]),
                current: &pair[1],
            });
        first.into_iter().chain(rest)
    }
}

/// Signature shared by every rule.
pub type Rule = fn(&RowWindow<'_>, &RuleConfig) -> Option<AttackType>;

/// Rules in evaluation order. A later match replaces an earlier one.
pub const RULES: [(&str, Rule); 4] = [
    ("protocol_frequency", protocol_frequency_mismatch),
    ("gps_spoofing", gps_spoofing),
    ("traffic_anomaly", traffic_anomaly),
    ("signal_jamming", signal_jamming),
];

/// Tracked protocol transmitting outside its allowed bands.
pub fn protocol_frequency_mismatch(
    window: &RowWindow<'_>,
    config: &RuleConfig,
) -> Option<AttackType> {
    let record = window.current;
    let bands = config.allowed_bands(&record.protocol)?;
    let allowed = bands
        .iter()
        .any(|band| (band - record.frequency_band).abs() <= FREQUENCY_TOLERANCE_GHZ);
    if allowed {
        return None;
    }
    debug!(
        row = window.index,
        protocol = %record.protocol,
        frequency_ghz = record.frequency_band,
        "Protocol/frequency mismatch"
    );
    Some(AttackType::ProtocolFrequencyMismatch)
}

/// Position jump implying an unrealistic ground speed.
pub fn gps_spoofing(window: &RowWindow<'_>, config: &RuleConfig) -> Option<AttackType> {
    let previous = window.previous?;
    let current = window.current;
    let speed = current
        .gps
        .implied_speed_kmh(current.timestamp, &previous.gps, previous.timestamp)?;
    if speed > config.max_speed_kmh {
        debug!(
            row = window.index,
            speed_kmh = speed,
            threshold = config.max_speed_kmh,
            "GPS spoofing"
        );
        return Some(AttackType::GpsSpoofing);
    }
    None
}

/// Packet volume above the configured ceiling.
pub fn traffic_anomaly(window: &RowWindow<'_>, config: &RuleConfig) -> Option<AttackType> {
    let volume = window.current.traffic_volume;
    if volume > config.max_traffic_volume {
        debug!(
            row = window.index,
            volume,
            threshold = config.max_traffic_volume,
            "Traffic anomaly"
        );
        return Some(AttackType::TrafficAnomaly);
    }
    None
}

/// Abrupt signal-strength swing between consecutive rows.
pub fn signal_jamming(window: &RowWindow<'_>, config: &RuleConfig) -> Option<AttackType> {
    let previous = window.previous?;
    let delta = (window.current.signal_strength - previous.signal_strength).abs();
    if delta > config.max_signal_delta {
        debug!(
            row = window.index,
            delta,
            threshold = config.max_signal_delta,
            "Signal jamming"
        );
        return Some(AttackType::SignalJamming);
    }
    None
}

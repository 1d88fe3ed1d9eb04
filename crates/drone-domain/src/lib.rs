//! # Drone Telemetry Tagger - Domain Model
//!
//! Value objects and enums shared by the analytics pipeline and the CLI:
//! GPS fixes, attack classifications and the binary normal/malicious label.
//! These types are the single source of truth for how a classification is
//! spelled on disk.

use chrono::{DateTime, Utc};
use geo::{Distance, Geodesic, Point};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// A single GPS fix as reported by the drone (WGS-84 degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsFix {
    /// Build a fix, rejecting out-of-range or non-finite coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(DomainError::InvalidCoordinates {
                lat: latitude,
                lon: longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Geodesic distance to another fix on the WGS-84 ellipsoid, in kilometers.
    #[must_use]
    pub fn distance_to_km(&self, other: &Self) -> f64 {
        let origin = Point::new(self.longitude, self.latitude);
        let destination = Point::new(other.longitude, other.latitude);
        Geodesic::distance(origin, destination) / 1000.0
    }

    /// Ground speed implied by moving from `earlier` to `self`.
    ///
    /// Returns `None` when the elapsed time is zero or negative, so callers
    /// never divide by a non-positive duration.
    #[must_use]
    pub fn implied_speed_kmh(
        &self,
        at: DateTime<Utc>,
        earlier: &Self,
        earlier_at: DateTime<Utc>,
    ) -> Option<f64> {
        let elapsed_hours = elapsed_hours(earlier_at, at);
        if elapsed_hours <= 0.0 {
            return None;
        }
        Some(self.distance_to_km(earlier) / elapsed_hours)
    }
}

/// Parses the serialized tuple form used by telemetry exports,
/// e.g. `(34.5553, 69.2075)` or `[34.5553, 69.2075]`.
impl FromStr for GpsFix {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DomainError::MalformedCoordinates(s.to_string());

        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .or_else(|| {
                trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
            })
            .unwrap_or(trimmed);

        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let [lat, lon] = parts.as_slice() else {
            return Err(malformed());
        };

        let lat: f64 = lat.parse().map_err(|_| malformed())?;
        let lon: f64 = lon.parse().map_err(|_| malformed())?;
        Self::new(lat, lon)
    }
}

impl fmt::Display for GpsFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Elapsed time between two instants in fractional hours (negative if `to`
/// precedes `from`).
#[must_use]
pub fn elapsed_hours(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    // Millisecond precision keeps sub-second exports meaningful.
    delta.num_milliseconds() as f64 / 1000.0 / 3600.0
}

// =============================================================================
// ENUMS
// =============================================================================

/// Heuristic attack classification assigned to a telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttackType {
    #[default]
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "Protocol_Frequency_Mismatch")]
    ProtocolFrequencyMismatch,
    #[serde(rename = "GPS_Spoofing")]
    GpsSpoofing,
    #[serde(rename = "Traffic_Anomaly")]
    TrafficAnomaly,
    #[serde(rename = "Signal_Jamming")]
    SignalJamming,
}

impl AttackType {
    /// Every classification, benign first.
    pub const ALL: [Self; 5] = [
        Self::Normal,
        Self::ProtocolFrequencyMismatch,
        Self::GpsSpoofing,
        Self::TrafficAnomaly,
        Self::SignalJamming,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::ProtocolFrequencyMismatch => "Protocol_Frequency_Mismatch",
            Self::GpsSpoofing => "GPS_Spoofing",
            Self::TrafficAnomaly => "Traffic_Anomaly",
            Self::SignalJamming => "Signal_Jamming",
        }
    }

    #[must_use]
    pub fn is_attack(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttackType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|attack| attack.as_str() == s)
            .ok_or_else(|| DomainError::UnknownAttackType(s.to_string()))
    }
}

/// Binary label derived from an [`AttackType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Normal,
    Malicious,
}

impl Label {
    pub const ALL: [Self; 2] = [Self::Normal, Self::Malicious];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Malicious => "malicious",
        }
    }
}

impl From<AttackType> for Label {
    fn from(attack: AttackType) -> Self {
        if attack.is_attack() {
            Self::Malicious
        } else {
            Self::Normal
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| DomainError::UnknownLabel(s.to_string()))
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Malformed coordinate pair: {0:?}")]
    MalformedCoordinates(String),

    #[error("Unknown attack type: {0}")]
    UnknownAttackType(String),

    #[error("Unknown label: {0}")]
    UnknownLabel(String),
}

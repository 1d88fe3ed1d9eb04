//! Telemetry dataset loading and labeled export.
//!
//! Rows keep their raw cells so the labeled output reproduces the input
//! schema exactly; the typed [`TelemetryRecord`] view carries only the fields
//! the rules read.

use crate::error::{AnalyticsError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::StringRecord;
use drone_domain::{AttackType, GpsFix, Label};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub const PROTOCOL_COLUMN: &str = "communication_protocol";
pub const FREQUENCY_COLUMN: &str = "frequency_band";
pub const TRAFFIC_COLUMN: &str = "network_traffic_volume";
pub const SIGNAL_COLUMN: &str = "signal_strength";
pub const GPS_COLUMN: &str = "drone_gps_coordinates";
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Columns appended to the labeled export.
pub const ATTACK_TYPE_COLUMN: &str = "Attack_Type";
pub const LABEL_COLUMN: &str = "Label";

/// Columns the rules cannot run without.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    PROTOCOL_COLUMN,
    FREQUENCY_COLUMN,
    TRAFFIC_COLUMN,
    SIGNAL_COLUMN,
    GPS_COLUMN,
    TIMESTAMP_COLUMN,
];

/// Naive layouts accepted for the `timestamp` column, interpreted as UTC.
const NAIVE_TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Typed view of one telemetry row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub protocol: String,
    pub frequency_band: f64,
    pub traffic_volume: u64,
    pub signal_strength: f64,
    pub gps: GpsFix,
    pub timestamp: DateTime<Utc>,
}

/// Header positions of the required columns.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    protocol: usize,
    frequency: usize,
    traffic: usize,
    signal: usize,
    gps: usize,
    timestamp: usize,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        Ok(Self {
            protocol: column_position(headers, PROTOCOL_COLUMN)?,
            frequency: column_position(headers, FREQUENCY_COLUMN)?,
            traffic: column_position(headers, TRAFFIC_COLUMN)?,
            signal: column_position(headers, SIGNAL_COLUMN)?,
            gps: column_position(headers, GPS_COLUMN)?,
            timestamp: column_position(headers, TIMESTAMP_COLUMN)?,
        })
    }
}

fn column_position(headers: &StringRecord, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| AnalyticsError::MissingColumn {
            column: column.to_string(),
        })
}

/// Ordered telemetry table: raw cells plus typed records, index-aligned.
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: StringRecord,
    raw: Vec<StringRecord>,
    records: Vec<TelemetryRecord>,
}

impl Dataset {
    /// Load a CSV file with a header row.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| AnalyticsError::io(path, e))?;
        let dataset = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            columns = dataset.headers.len(),
            "Loaded telemetry dataset"
        );
        Ok(dataset)
    }

    /// Load CSV from any reader. Fails on the first missing column or bad cell.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let columns = ColumnMap::resolve(&headers)?;

        let mut raw = Vec::new();
        let mut records = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let row = result?;
            records.push(parse_record(&row, &headers, columns, idx + 1)?);
            raw.push(row);
        }

        debug!(rows = records.len(), "Parsed telemetry rows");
        Ok(Self {
            headers,
            raw,
            records,
        })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of `column` in the header, or a schema error.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        column_position(&self.headers, column)
    }

    /// Raw cells of `column`, in row order.
    pub fn column(&self, column: &str) -> Result<impl Iterator<Item = &str> + '_> {
        let idx = self.column_index(column)?;
        Ok(self.raw.iter().map(move |row| row.get(idx).unwrap_or("")))
    }

    /// Render the labeled table: original cells plus `Attack_Type` and `Label`.
    pub fn to_labeled_csv(&self, attacks: &[AttackType]) -> Result<Vec<u8>> {
        if attacks.len() != self.raw.len() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "{} classifications for {} rows",
                attacks.len(),
                self.raw.len()
            )));
        }

        let mut wtr = csv::Writer::from_writer(Vec::new());

        let mut header = self.headers.clone();
        header.push_field(ATTACK_TYPE_COLUMN);
        header.push_field(LABEL_COLUMN);
        wtr.write_record(&header)?;

        for (row, attack) in self.raw.iter().zip(attacks) {
            let mut out = row.clone();
            out.push_field(attack.as_str());
            out.push_field(Label::from(*attack).as_str());
            wtr.write_record(&out)?;
        }

        wtr.into_inner()
            .map_err(|e| AnalyticsError::Serialization(e.to_string()))
    }
}

fn parse_record(
    row: &StringRecord,
    headers: &StringRecord,
    columns: ColumnMap,
    row_number: usize,
) -> Result<TelemetryRecord> {
    let cell = |idx: usize| row.get(idx).unwrap_or("").trim();
    let error = |idx: usize, reason: String| AnalyticsError::Parse {
        row: row_number,
        column: headers.get(idx).unwrap_or("").to_string(),
        value: cell(idx).to_string(),
        reason,
    };

    let protocol = cell(columns.protocol).to_string();
    let frequency_band = parse_finite(cell(columns.frequency))
        .map_err(|reason| error(columns.frequency, reason))?;
    let traffic_volume = parse_volume(cell(columns.traffic))
        .map_err(|reason| error(columns.traffic, reason))?;
    let signal_strength = parse_finite(cell(columns.signal))
        .map_err(|reason| error(columns.signal, reason))?;
    let gps: GpsFix = cell(columns.gps)
        .parse()
        .map_err(|e: drone_domain::DomainError| error(columns.gps, e.to_string()))?;
    let timestamp = parse_timestamp(cell(columns.timestamp)).ok_or_else(|| {
        error(
            columns.timestamp,
            "unrecognized date-time format".to_string(),
        )
    })?;

    Ok(TelemetryRecord {
        protocol,
        frequency_band,
        traffic_volume,
        signal_strength,
        gps,
        timestamp,
    })
}

fn parse_number<T>(value: &str) -> std::result::Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if value.is_empty() {
        return Err("empty cell".to_string());
    }
    value.parse().map_err(|e: T::Err| e.to_string())
}

/// Rule inputs must be real measurements; `NaN` and infinities are rejected.
fn parse_finite(value: &str) -> std::result::Result<f64, String> {
    let number: f64 = parse_number(value)?;
    if number.is_finite() {
        Ok(number)
    } else {
        Err("expected a finite number".to_string())
    }
}

/// Packet counts may be exported as `1500` or `1500.0`; anything negative or
/// fractional is rejected.
fn parse_volume(value: &str) -> std::result::Result<u64, String> {
    if let Ok(count) = value.parse::<u64>() {
        return Ok(count);
    }
    let float: f64 = parse_number(value)?;
    if float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float <= u64::MAX as f64 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = float as u64;
        return Ok(count);
    }
    Err("expected a non-negative whole packet count".to_string())
}

/// Parse the date-time layouts telemetry exports use. Naive values are UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HEADER: &str = "timestamp,communication_protocol,frequency_band,network_traffic_volume,signal_strength,drone_gps_coordinates,altitude";

    fn load(body: &str) -> Result<Dataset> {
        Dataset::from_reader(format!("{HEADER}\n{body}").as_bytes())
    }

    #[test]
    fn test_load_typed_records() {
        let dataset = load(
            "2024-03-01 10:00:00,ZigBee,2.4,120,-45.5,\"(34.5553, 69.2075)\",120\n\
             2024-03-01T10:05:30Z,LoRa,0.868,1500.0,-50,\"(34.56, 69.21)\",125\n",
        )
        .unwrap();

        assert_eq!(dataset.len(), 2);
        let first = &dataset.records()[0];
        assert_eq!(first.protocol, "ZigBee");
        assert_eq!(first.frequency_band, 2.4);
        assert_eq!(first.traffic_volume, 120);
        assert_eq!(first.signal_strength, -45.5);
        assert_eq!(first.gps.latitude, 34.5553);
        assert_eq!(
            first.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(dataset.records()[1].traffic_volume, 1500);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let err = Dataset::from_reader("timestamp,frequency_band\n2024-01-01,2.4\n".as_bytes())
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::MissingColumn { ref column } if column == PROTOCOL_COLUMN
        ));
    }

    #[test]
    fn test_malformed_coordinates_name_the_row() {
        let err = load(
            "2024-03-01 10:00:00,ZigBee,2.4,120,-45,\"(1.0, 2.0)\",1\n\
             2024-03-01 10:01:00,ZigBee,2.4,120,-45,\"(1.0;2.0)\",1\n",
        )
        .unwrap_err();
        match err {
            AnalyticsError::Parse { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, GPS_COLUMN);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_cells_surface() {
        let err = load("2024-03-01 10:00:00,ZigBee,high,120,-45,\"(1.0, 2.0)\",1\n").unwrap_err();
        assert!(matches!(err, AnalyticsError::Parse { ref column, .. } if column == FREQUENCY_COLUMN));

        let err = load("2024-03-01 10:00:00,ZigBee,2.4,-3,-45,\"(1.0, 2.0)\",1\n").unwrap_err();
        assert!(matches!(err, AnalyticsError::Parse { ref column, .. } if column == TRAFFIC_COLUMN));

        for cell in ["NaN", "inf", "-inf"] {
            let err = load(&format!(
                "2024-03-01 10:00:00,ZigBee,{cell},120,-45,\"(1.0, 2.0)\",1\n"
            ))
            .unwrap_err();
            assert!(matches!(err, AnalyticsError::Parse { ref column, .. } if column == FREQUENCY_COLUMN));

            let err = load(&format!(
                "2024-03-01 10:00:00,ZigBee,2.4,120,-45,\"(1.0, 2.0)\",1\n\
                 2024-03-01 10:01:00,ZigBee,2.4,120,{cell},\"(1.0, 2.0)\",1\n"
            ))
            .unwrap_err();
            assert!(matches!(
                err,
                AnalyticsError::Parse { row: 2, ref column, .. } if column == SIGNAL_COLUMN
            ));
        }

        let err = load("yesterday,ZigBee,2.4,3,-45,\"(1.0, 2.0)\",1\n").unwrap_err();
        assert!(matches!(err, AnalyticsError::Parse { ref column, .. } if column == TIMESTAMP_COLUMN));
    }

    #[test]
    fn test_timestamp_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-06 07:08:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-06T07:08:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-06 07:08"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-06T09:08:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-05-06"),
            Some(Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("06/05/2024"), None);
    }

    #[test]
    fn test_labeled_export_preserves_cells() {
        let dataset = load(
            "2024-03-01 10:00:00,ZigBee,2.4,120, -45 ,\"(1.0, 2.0)\",7\n\
             2024-03-01 10:01:00,Wi-Fi,5.0,120,-45,\"(1.0, 2.0)\",8\n",
        )
        .unwrap();
        let bytes = dataset
            .to_labeled_csv(&[AttackType::Normal, AttackType::TrafficAnomaly])
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], format!("{HEADER},Attack_Type,Label"));
        assert_eq!(
            lines[1],
            "2024-03-01 10:00:00,ZigBee,2.4,120, -45 ,\"(1.0, 2.0)\",7,normal,normal"
        );
        assert_eq!(
            lines[2],
            "2024-03-01 10:01:00,Wi-Fi,5.0,120,-45,\"(1.0, 2.0)\",8,Traffic_Anomaly,malicious"
        );
        assert!(dataset.to_labeled_csv(&[AttackType::Normal]).is_err());
    }
}

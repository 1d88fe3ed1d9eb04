//! Report generation for tagged telemetry.

use crate::dataset::{ATTACK_TYPE_COLUMN, Dataset};
use crate::engine::Classification;
use crate::error::{AnalyticsError, Result};
use drone_domain::{AttackType, Label};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Numeric columns averaged per attack type.
pub const FEATURE_COLUMNS: [&str; 6] = [
    "signal_strength",
    "packet_loss_rate",
    "round_trip_time",
    "frequency_band",
    "altitude",
    "speed_trajectory",
];

/// Column header of the summary count.
pub const COUNT_COLUMN: &str = "Count";

/// Number of records carrying a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: Label,
    pub count: usize,
}

/// Number of records carrying an attack type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackCount {
    pub attack_type: AttackType,
    pub count: usize,
}

/// Mean of one feature column; `None` when every cell in the group is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMean {
    pub feature: String,
    pub mean: Option<f64>,
}

/// Feature means for the records of one attack type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAverages {
    pub attack_type: AttackType,
    pub means: Vec<FeatureMean>,
}

/// Tagging run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackReport {
    pub generated_at: String,
    pub input_path: String,
    pub total_records: usize,
    pub label_distribution: Vec<LabelCount>,
    pub attack_breakdown: Vec<AttackCount>,
    pub feature_averages: Vec<FeatureAverages>,
    /// Rows where a later rule replaced an earlier detection
    pub overwritten_detections: usize,
}

impl AttackReport {
    /// Fail if any feature column is absent, before anything is aggregated.
    pub fn check_schema(dataset: &Dataset) -> Result<()> {
        for column in FEATURE_COLUMNS {
            dataset.column_index(column)?;
        }
        Ok(())
    }

    /// Aggregate a classified dataset. Read-only over both inputs.
    pub fn build(
        dataset: &Dataset,
        classifications: &[Classification],
        input_path: &str,
    ) -> Result<Self> {
        Self::check_schema(dataset)?;
        if classifications.len() != dataset.len() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "{} classifications for {} rows",
                classifications.len(),
                dataset.len()
            )));
        }

        let attacks: Vec<AttackType> = classifications.iter().map(|c| c.attack_type).collect();
        let attack_breakdown = attack_breakdown(&attacks);
        let feature_averages = feature_averages(dataset, &attacks, &attack_breakdown)?;

        Ok(Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            input_path: input_path.to_string(),
            total_records: dataset.len(),
            label_distribution: label_distribution(&attacks),
            attack_breakdown,
            feature_averages,
            overwritten_detections: classifications
                .iter()
                .filter(|c| c.was_overwritten())
                .count(),
        })
    }

    /// Summary table: `Attack_Type,Count`, count descending.
    pub fn summary_csv(&self) -> Result<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record([ATTACK_TYPE_COLUMN, COUNT_COLUMN])?;
        for entry in &self.attack_breakdown {
            let count = entry.count.to_string();
            wtr.write_record([entry.attack_type.as_str(), count.as_str()])?;
        }
        wtr.into_inner()
            .map_err(|e| AnalyticsError::Serialization(e.to_string()))
    }

    /// Generate report as JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable tables for the console.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("[+] Expanded Attack Report\n");
        out.push_str(&format!("Records analyzed: {}\n", self.total_records));

        out.push_str("\nLabel Distribution:\n");
        for entry in &self.label_distribution {
            out.push_str(&format!("  {:<30} {:>8}\n", entry.label.as_str(), entry.count));
        }

        out.push_str("\nAttack Type Breakdown:\n");
        for entry in &self.attack_breakdown {
            out.push_str(&format!(
                "  {:<30} {:>8}\n",
                entry.attack_type.as_str(),
                entry.count
            ));
        }
        if self.overwritten_detections > 0 {
            out.push_str(&format!(
                "  ({} rows matched more than one rule; the last match was kept)\n",
                self.overwritten_detections
            ));
        }

        out.push_str("\n[+] Feature Averages per Attack Type:\n");
        out.push_str(&format!("  {ATTACK_TYPE_COLUMN:<30}"));
        for feature in FEATURE_COLUMNS {
            out.push_str(&format!(" {feature:>16}"));
        }
        out.push('\n');
        for group in &self.feature_averages {
            out.push_str(&format!("  {:<30}", group.attack_type.as_str()));
            for mean in &group.means {
                out.push_str(&format!(" {:>16}", format_mean(mean.mean, 4)));
            }
            out.push('\n');
        }

        out
    }

    /// Generate Markdown report.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# Drone Telemetry Attack Report\n\n");
        md.push_str(&format!("**Generated:** {}\n\n", self.generated_at));
        md.push_str(&format!("**Input:** `{}`\n\n", self.input_path));

        md.push_str("## Label Distribution\n\n");
        md.push_str("| Label | Count |\n");
        md.push_str("|-------|-------|\n");
        for entry in &self.label_distribution {
            md.push_str(&format!("| {} | {} |\n", entry.label, entry.count));
        }
        md.push_str(&format!("| **Total** | **{}** |\n\n", self.total_records));

        if !self.attack_breakdown.is_empty() {
            md.push_str("## Attack Type Breakdown\n\n");
            md.push_str("| Attack Type | Count | Share |\n");
            md.push_str("|-------------|-------|-------|\n");
            for entry in &self.attack_breakdown {
                #[allow(clippy::cast_precision_loss)]
                let share = 100.0 * entry.count as f64 / self.total_records as f64;
                md.push_str(&format!(
                    "| {} | {} | {:.1}% |\n",
                    entry.attack_type, entry.count, share
                ));
            }
            md.push('\n');
            if self.overwritten_detections > 0 {
                md.push_str(&format!(
                    "_{} rows matched more than one rule; only the last match is reported._\n\n",
                    self.overwritten_detections
                ));
            }
        }

        if !self.feature_averages.is_empty() {
            md.push_str("## Feature Averages\n\n");
            md.push_str("| Attack Type |");
            for feature in FEATURE_COLUMNS {
                md.push_str(&format!(" {feature} |"));
            }
            md.push_str("\n|-------------|");
            for _ in FEATURE_COLUMNS {
                md.push_str("------|");
            }
            md.push('\n');
            for group in &self.feature_averages {
                md.push_str(&format!("| {} |", group.attack_type));
                for mean in &group.means {
                    md.push_str(&format!(" {} |", format_mean(mean.mean, 2)));
                }
                md.push('\n');
            }
            md.push('\n');
        }

        md
    }
}

fn format_mean(mean: Option<f64>, precision: usize) -> String {
    mean.map_or_else(|| "-".to_string(), |m| format!("{m:.precision$}"))
}

/// Counts per label, normal first; zero counts omitted.
fn label_distribution(attacks: &[AttackType]) -> Vec<LabelCount> {
    Label::ALL
        .into_iter()
        .map(|label| LabelCount {
            label,
            count: attacks
                .iter()
                .filter(|attack| Label::from(**attack) == label)
                .count(),
        })
        .filter(|entry| entry.count > 0)
        .collect()
}

/// Counts per attack type, count descending, ties in order of first appearance.
fn attack_breakdown(attacks: &[AttackType]) -> Vec<AttackCount> {
    let mut counts: Vec<AttackCount> = Vec::new();
    for attack in attacks {
        match counts.iter_mut().find(|entry| entry.attack_type == *attack) {
            Some(entry) => entry.count += 1,
            None => counts.push(AttackCount {
                attack_type: *attack,
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

fn feature_averages(
    dataset: &Dataset,
    attacks: &[AttackType],
    groups: &[AttackCount],
) -> Result<Vec<FeatureAverages>> {
    let mut columns = Vec::with_capacity(FEATURE_COLUMNS.len());
    for feature in FEATURE_COLUMNS {
        columns.push((feature, numeric_column(dataset, feature)?));
    }

    let averages = groups
        .iter()
        .map(|group| FeatureAverages {
            attack_type: group.attack_type,
            means: columns
                .iter()
                .map(|(feature, values)| {
                    let mean = values
                        .iter()
                        .zip(attacks)
                        .filter(|(_, attack)| **attack == group.attack_type)
                        .filter_map(|(value, _)| *value)
                        .mean();
                    FeatureMean {
                        feature: (*feature).to_string(),
                        mean: (!mean.is_nan()).then_some(mean),
                    }
                })
                .collect(),
        })
        .collect();

    Ok(averages)
}

/// Parse a feature column. Empty and `NaN` cells become `None`; anything else must be numeric.
fn numeric_column(dataset: &Dataset, column: &str) -> Result<Vec<Option<f64>>> {
    dataset
        .column(column)?
        .enumerate()
        .map(|(idx, cell)| {
            let cell = cell.trim();
            if cell.is_empty() {
                return Ok(None);
            }
            cell.parse::<f64>()
                .map(|value| (!value.is_nan()).then_some(value))
                .map_err(|e| AnalyticsError::Parse {
                    row: idx + 1,
                    column: column.to_string(),
                    value: cell.to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleEvaluator;

    const HEADER: &str = "timestamp,communication_protocol,frequency_band,network_traffic_volume,signal_strength,drone_gps_coordinates,packet_loss_rate,round_trip_time,altitude,speed_trajectory";

    fn dataset(body: &str) -> Dataset {
        Dataset::from_reader(format!("{HEADER}\n{body}").as_bytes()).unwrap()
    }

    fn sample() -> Dataset {
        dataset(
            "2024-01-01 00:00:00,ZigBee,2.4,100,-50,\"(1.0, 1.0)\",0.1,20,100,10\n\
             2024-01-01 00:01:00,ZigBee,5.0,100,-50,\"(1.0, 1.0)\",0.3,40,110,12\n\
             2024-01-01 00:02:00,ZigBee,2.4,2000,-50,\"(1.0, 1.0)\",,60,120,14\n\
             2024-01-01 00:03:00,ZigBee,2.4,100,-50,\"(1.0, 1.0)\",0.2,30,130,16\n\
             2024-01-01 00:04:00,ZigBee,2.4,100,-50,\"(1.0, 1.0)\",0.4,50,140,18\n",
        )
    }

    fn report(dataset: &Dataset) -> AttackReport {
        let classifications = RuleEvaluator::default().evaluate(dataset.records());
        AttackReport::build(dataset, &classifications, "telemetry.csv").unwrap()
    }

    #[test]
    fn test_counts_sum_to_total() {
        let data = sample();
        let report = report(&data);

        assert_eq!(report.total_records, 5);
        let attack_total: usize = report.attack_breakdown.iter().map(|e| e.count).sum();
        let label_total: usize = report.label_distribution.iter().map(|e| e.count).sum();
        assert_eq!(attack_total, 5);
        assert_eq!(label_total, 5);
        assert!(report.attack_breakdown.iter().all(|e| e.count > 0));

        assert_eq!(
            report.attack_breakdown,
            vec![
                AttackCount { attack_type: AttackType::Normal, count: 3 },
                AttackCount { attack_type: AttackType::ProtocolFrequencyMismatch, count: 1 },
                AttackCount { attack_type: AttackType::TrafficAnomaly, count: 1 },
            ]
        );
        assert_eq!(
            report.label_distribution,
            vec![
                LabelCount { label: Label::Normal, count: 3 },
                LabelCount { label: Label::Malicious, count: 2 },
            ]
        );
    }

    #[test]
    fn test_feature_means_skip_empty_cells() {
        let data = sample();
        let report = report(&data);

        let normal = &report.feature_averages[0];
        assert_eq!(normal.attack_type, AttackType::Normal);
        let rtt = normal.means.iter().find(|m| m.feature == "round_trip_time").unwrap();
        assert!((rtt.mean.unwrap() - 100.0 / 3.0).abs() < 1e-9);

        let traffic = report
            .feature_averages
            .iter()
            .find(|g| g.attack_type == AttackType::TrafficAnomaly)
            .unwrap();
        let loss = traffic.means.iter().find(|m| m.feature == "packet_loss_rate").unwrap();
        assert_eq!(loss.mean, None);
    }

    #[test]
    fn test_nan_feature_cells_are_skipped() {
        let data = dataset(
            "2024-01-01 00:00:00,ZigBee,2.4,100,-50,\"(1.0, 1.0)\",0.1,20,100,10\n\
             2024-01-01 00:01:00,ZigBee,2.4,100,-50,\"(1.0, 1.0)\",NaN,40,110,12\n",
        );
        let report = report(&data);

        let normal = &report.feature_averages[0];
        let loss = normal.means.iter().find(|m| m.feature == "packet_loss_rate").unwrap();
        assert_eq!(loss.mean, Some(0.1));
        let rtt = normal.means.iter().find(|m| m.feature == "round_trip_time").unwrap();
        assert_eq!(rtt.mean, Some(30.0));
    }

    #[test]
    fn test_missing_feature_column_fails() {
        let data = Dataset::from_reader(
            "timestamp,communication_protocol,frequency_band,network_traffic_volume,signal_strength,drone_gps_coordinates\n\
             2024-01-01 00:00:00,ZigBee,2.4,100,-50,\"(1.0, 1.0)\"\n"
                .as_bytes(),
        )
        .unwrap();
        let classifications = RuleEvaluator::default().evaluate(data.records());
        let err = AttackReport::build(&data, &classifications, "x.csv").unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::MissingColumn { ref column } if column == "packet_loss_rate"
        ));
    }

    #[test]
    fn test_non_numeric_feature_fails() {
        let data = dataset("2024-01-01 00:00:00,ZigBee,2.4,100,-50,\"(1.0, 1.0)\",lossy,20,100,10\n");
        let classifications = RuleEvaluator::default().evaluate(data.records());
        assert!(matches!(
            AttackReport::build(&data, &classifications, "x.csv"),
            Err(AnalyticsError::Parse { .. })
        ));
    }

    #[test]
    fn test_summary_csv_layout() {
        let data = sample();
        let csv = String::from_utf8(report(&data).summary_csv().unwrap()).unwrap();
        assert_eq!(
            csv,
            "Attack_Type,Count\nnormal,3\nProtocol_Frequency_Mismatch,1\nTraffic_Anomaly,1\n"
        );
    }

    #[test]
    fn test_renderings() {
        let data = sample();
        let report = report(&data);

        let text = report.render_text();
        assert!(text.contains("Label Distribution:"));
        assert!(text.contains("Traffic_Anomaly"));

        let md = report.to_markdown();
        assert!(md.contains("# Drone Telemetry Attack Report"));
        assert!(md.contains("| Traffic_Anomaly | 1 | 20.0% |"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["total_records"], 5);
        assert_eq!(json["attack_breakdown"][0]["attack_type"], "normal");
    }

    #[test]
    fn test_empty_dataset_report() {
        let data = dataset("");
        let report = report(&data);
        assert_eq!(report.total_records, 0);
        assert!(report.attack_breakdown.is_empty());
        assert!(report.label_distribution.is_empty());
        assert_eq!(
            String::from_utf8(report.summary_csv().unwrap()).unwrap(),
            "Attack_Type,Count\n"
        );
    }
}

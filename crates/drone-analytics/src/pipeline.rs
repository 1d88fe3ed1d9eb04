//! End-to-end tagging run: load, evaluate, label, report, write.

use crate::config::TaggerConfig;
use crate::dataset::Dataset;
use crate::engine::RuleEvaluator;
use crate::error::{AnalyticsError, Result};
use crate::reports::AttackReport;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// A rendered output file waiting to be written.
struct Artifact {
    path: PathBuf,
    contents: Vec<u8>,
}

/// Run the full pipeline described by `config`.
///
/// Every output is rendered in memory before the first file is written, and
/// files already written are removed if a later write fails.
pub fn run(config: &TaggerConfig) -> Result<AttackReport> {
    config.validate()?;
    let evaluator = RuleEvaluator::new(config.rules.clone())?;

    let dataset = Dataset::from_path(&config.input_path)?;
    AttackReport::check_schema(&dataset)?;

    let classifications = evaluator.evaluate(dataset.records());
    let attacks: Vec<_> = classifications.iter().map(|c| c.attack_type).collect();

    let report = AttackReport::build(
        &dataset,
        &classifications,
        &config.input_path.display().to_string(),
    )?;

    let mut artifacts = vec![
        Artifact {
            path: config.output_path.clone(),
            contents: dataset.to_labeled_csv(&attacks)?,
        },
        Artifact {
            path: config.summary_path.clone(),
            contents: report.summary_csv()?,
        },
    ];
    if let Some(path) = &config.report_json_path {
        artifacts.push(Artifact {
            path: path.clone(),
            contents: report.to_json()?.into_bytes(),
        });
    }
    if let Some(path) = &config.report_markdown_path {
        artifacts.push(Artifact {
            path: path.clone(),
            contents: report.to_markdown().into_bytes(),
        });
    }

    write_all(&artifacts)?;
    Ok(report)
}

fn write_all(artifacts: &[Artifact]) -> Result<()> {
    for (idx, artifact) in artifacts.iter().enumerate() {
        if let Err(source) = fs::write(&artifact.path, &artifact.contents) {
            for written in &artifacts[..idx] {
                if let Err(e) = fs::remove_file(&written.path) {
                    warn!(path = %written.path.display(), error = %e, "Failed to remove partial output");
                }
            }
            return Err(AnalyticsError::io(&artifact.path, source));
        }
        info!(
            path = %artifact.path.display(),
            bytes = artifact.contents.len(),
            "Wrote output"
        );
    }
    Ok(())
}

//! Drone Telemetry Tagger CLI
//!
//! Classifies each telemetry row with a heuristic attack type, then writes
//! the labeled dataset, the attack summary and the console report.

use anyhow::{Context, Result};
use clap::Parser;
use drone_analytics::{RuleConfig, TaggerConfig, config};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "drone-tagger")]
#[command(about = "Tag drone telemetry with heuristic attack classifications")]
struct Args {
    /// Source telemetry table (CSV with header)
    #[arg(
        short,
        long,
        env = "TAGGER_INPUT_PATH",
        default_value = "drone_communication_dataset.csv"
    )]
    input: PathBuf,

    /// Labeled dataset destination
    #[arg(
        short,
        long,
        env = "TAGGER_OUTPUT_PATH",
        default_value = "drone_communication_dataset_tagged.csv"
    )]
    output: PathBuf,

    /// Attack summary destination
    #[arg(
        short,
        long,
        env = "TAGGER_SUMMARY_PATH",
        default_value = "attack_summary.csv"
    )]
    summary: PathBuf,

    /// Also write the report as JSON
    #[arg(long, env = "TAGGER_REPORT_JSON")]
    report_json: Option<PathBuf>,

    /// Also write the report as Markdown
    #[arg(long, env = "TAGGER_REPORT_MARKDOWN")]
    report_markdown: Option<PathBuf>,

    /// Implied ground speed (km/h) above which a fix counts as spoofed
    #[arg(long, env = "TAGGER_MAX_SPEED_KMH", default_value_t = config::DEFAULT_MAX_SPEED_KMH)]
    max_speed_kmh: f64,

    /// Packet volume above which traffic counts as anomalous
    #[arg(long, env = "TAGGER_MAX_TRAFFIC_VOLUME", default_value_t = config::DEFAULT_MAX_TRAFFIC_VOLUME)]
    max_traffic_volume: u64,

    /// Row-to-row signal change above which the link counts as jammed
    #[arg(long, env = "TAGGER_MAX_SIGNAL_DELTA", default_value_t = config::DEFAULT_MAX_SIGNAL_DELTA)]
    max_signal_delta: f64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> TaggerConfig {
        TaggerConfig {
            input_path: self.input,
            output_path: self.output,
            summary_path: self.summary,
            report_json_path: self.report_json,
            report_markdown_path: self.report_markdown,
            rules: RuleConfig {
                max_speed_kmh: self.max_speed_kmh,
                max_traffic_volume: self.max_traffic_volume,
                max_signal_delta: self.max_signal_delta,
                ..RuleConfig::default()
            },
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for the report tables
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!(
            "drone_tagger={level},drone_analytics={level}",
            level = args.log_level
        ))
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.into_config();
    info!("Input: {}", config.input_path.display());
    info!(
        "Thresholds: speed {} km/h, traffic {} packets, signal delta {}",
        config.rules.max_speed_kmh, config.rules.max_traffic_volume, config.rules.max_signal_delta
    );

    let report = drone_analytics::run(&config)
        .with_context(|| format!("Tagging {} failed", config.input_path.display()))?;

    info!("Analysis complete. Labeled dataset saved to {}", config.output_path.display());
    info!("Attack summary saved to {}", config.summary_path.display());

    print!("{}", report.render_text());
    Ok(())
}

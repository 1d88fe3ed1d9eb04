//! Sequential rule evaluation over a telemetry dataset.

use crate::config::RuleConfig;
use crate::dataset::TelemetryRecord;
use crate::error::Result;
use crate::rules::{RULES, RowWindow};
use drone_domain::AttackType;
use tracing::{debug, info};

/// Outcome of evaluating one row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    /// Final label: the last rule that fired, or `normal`.
    pub attack_type: AttackType,
    /// Every rule that fired, in evaluation order.
    pub fired: Vec<AttackType>,
}

impl Classification {
    /// True when an earlier detection was overwritten by a later rule.
    pub fn was_overwritten(&self) -> bool {
        self.fired.len() > 1
    }
}

/// Applies the heuristic rules row by row, in original order.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    config: RuleConfig,
}

impl RuleEvaluator {
    /// Create an evaluator after validating the rule parameters.
    pub fn new(config: RuleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Every rule that fires on this window, in evaluation order.
    pub fn explain(&self, window: &RowWindow<'_>) -> Vec<AttackType> {
        RULES
            .iter()
            .filter_map(|(_, rule)| rule(window, &self.config))
            .collect()
    }

    /// Classify one window. Later rules overwrite earlier ones.
    pub fn classify(&self, window: &RowWindow<'_>) -> Classification {
        let fired = self.explain(window);
        Classification {
            attack_type: fired.last().copied().unwrap_or_default(),
            fired,
        }
    }

    /// Classify every record. Output is index-aligned with `records`.
    pub fn evaluate(&self, records: &[TelemetryRecord]) -> Vec<Classification> {
        let classifications: Vec<Classification> = RowWindow::over(records)
            .map(|window| self.classify(&window))
            .collect();

        let flagged = classifications
            .iter()
            .filter(|c| c.attack_type.is_attack())
            .count();
        let overwritten = classifications
            .iter()
            .filter(|c| c.was_overwritten())
            .count();
        info!(
            rows = classifications.len(),
            flagged, overwritten, "Rule evaluation complete"
        );
        if overwritten > 0 {
            debug!(overwritten, "Rows where a later rule replaced an earlier detection");
        }

        classifications
    }

    /// Attack type per record, same length and order as `records`.
    pub fn attack_types(&self, records: &[TelemetryRecord]) -> Vec<AttackType> {
        self.evaluate(records)
            .into_iter()
            .map(|c| c.attack_type)
            .collect()
    }
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self {
            config: RuleConfig::default(),
        }
    }
}

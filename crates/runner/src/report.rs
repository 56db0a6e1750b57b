//! Aggregated run reports.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use stressforge_calibrate::CalibrationOutcome;

/// Per-instance result; a failed instance keeps its reason instead of a
/// score and never contributes to the aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum InstanceResult {
    Scored { outcome: CalibrationOutcome },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceOutcome {
    pub label: String,
    pub result: InstanceResult,
}

impl InstanceOutcome {
    pub fn from_result(label: String, result: anyhow::Result<CalibrationOutcome>) -> Self {
        match result {
            Ok(outcome) => Self {
                label,
                result: InstanceResult::Scored { outcome },
            },
            Err(err) => Self {
                label,
                result: InstanceResult::Failed {
                    reason: format!("{err:#}"),
                },
            },
        }
    }

    pub fn failed(label: String, reason: impl Into<String>) -> Self {
        Self {
            label,
            result: InstanceResult::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn score(&self) -> Option<u32> {
        match &self.result {
            InstanceResult::Scored { outcome } => Some(outcome.score),
            InstanceResult::Failed { .. } => None,
        }
    }
}

/// Aggregate over one parallel run.
///
/// `total` and `average` (integer division) cover scored instances only;
/// failures are surfaced through `failed` and the per-instance reasons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub instances: Vec<InstanceOutcome>,
    pub total: u64,
    pub average: u64,
    pub scored: usize,
    pub failed: usize,
    pub wall_time_ms: u64,
}

impl RunReport {
    pub fn from_outcomes(instances: Vec<InstanceOutcome>, wall_time: Duration) -> Self {
        let scores: Vec<u64> = instances
            .iter()
            .filter_map(|instance| instance.score().map(u64::from))
            .collect();
        let total: u64 = scores.iter().sum();
        let scored = scores.len();
        let failed = instances.len() - scored;
        let average = if scored > 0 { total / scored as u64 } else { 0 };

        Self {
            instances,
            total,
            average,
            scored,
            failed,
            wall_time_ms: wall_time.as_millis() as u64,
        }
    }

    /// Save report to JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load report from JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let report = serde_json::from_str(&json)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(label: &str, score: u32) -> InstanceOutcome {
        InstanceOutcome {
            label: label.to_string(),
            result: InstanceResult::Scored {
                outcome: CalibrationOutcome {
                    label: label.to_string(),
                    kernel: "synthetic".to_string(),
                    score,
                    iterations: 1,
                    final_step: 1,
                    final_limit_ms: 0,
                    trace: Vec::new(),
                },
            },
        }
    }

    #[test]
    fn aggregate_skips_failed_instances() {
        let outcomes = vec![
            scored("worker-1", 400),
            InstanceOutcome::failed("worker-2".to_string(), "out of memory"),
            scored("worker-3", 600),
        ];
        let report = RunReport::from_outcomes(outcomes, Duration::from_millis(10));

        assert_eq!(report.total, 1_000);
        assert_eq!(report.average, 500);
        assert_eq!(report.scored, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.instances[1].score(), None);
    }

    #[test]
    fn all_failed_run_reports_zero_aggregate() {
        let outcomes = vec![InstanceOutcome::failed("worker-1".to_string(), "boom")];
        let report = RunReport::from_outcomes(outcomes, Duration::ZERO);
        assert_eq!(report.total, 0);
        assert_eq!(report.average, 0);
        assert_eq!(report.scored, 0);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn instance_result_serializes_with_status_tag() {
        let json = serde_json::to_string(&scored("worker-1", 42).result).unwrap();
        assert!(json.contains("Scored"));

        let failed = InstanceResult::Failed {
            reason: "device lost".into(),
        };
        let json = serde_json::to_string(&failed).unwrap();
        assert!(json.contains("Failed"));
        assert!(json.contains("device lost"));
    }
}

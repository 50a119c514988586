//! ---
//! drill_section: "04-execution-engine"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario execution engine."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
//! SLO guard applied after every step.

use std::fmt;

use drill_persistence::StepDetail;
use drill_scenario::{ChaosStep, Comparison};
use serde::Serialize;
use serde_json::json;

use crate::executor::StepResult;
use crate::{EngineError, Result};

/// Outcome of evaluating a step's SLO expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SloStatus {
    /// The observed value satisfied the expectation.
    Met,
    /// The observed value breached the expectation.
    Violated,
    /// No value was available; needs manual confirmation.
    Pending,
}

impl SloStatus {
    /// Lowercase label used in details and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SloStatus::Met => "met",
            SloStatus::Violated => "violated",
            SloStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for SloStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluation report for one SLO expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct SloReport {
    /// Metric name from the expectation.
    pub name: String,
    /// Comparison operator.
    pub comparison: Comparison,
    /// Threshold compared against.
    pub threshold: f64,
    /// Observed value, if any.
    pub value: Option<f64>,
    /// Evaluation status.
    pub status: SloStatus,
}

impl SloReport {
    /// Detail fields merged into the step entry.
    pub fn detail(&self) -> StepDetail {
        let mut detail = StepDetail::new();
        detail.insert("slo_name".into(), json!(self.name));
        detail.insert("slo_comparison".into(), json!(self.comparison.as_str()));
        detail.insert("slo_threshold".into(), json!(self.threshold));
        detail.insert("slo_value".into(), json!(self.value));
        detail.insert("slo_status".into(), json!(self.status));
        detail
    }
}

/// Evaluate `step`'s expectation against `result`.
///
/// Returns `Ok(None)` when the step has no expectation, a `pending` report
/// when no value was observed, a `met` report on pass, and
/// [`EngineError::SloViolated`] on a breach.
pub fn evaluate(step: &ChaosStep, result: &StepResult) -> Result<Option<SloReport>> {
    let Some(expectation) = step.expected_slo() else {
        return Ok(None);
    };
    let mut report = SloReport {
        name: expectation.name().to_owned(),
        comparison: expectation.comparison(),
        threshold: expectation.threshold(),
        value: result.metric_value(),
        status: SloStatus::Pending,
    };
    let Some(value) = report.value else {
        return Ok(Some(report));
    };
    if expectation.is_satisfied_by(value) {
        report.status = SloStatus::Met;
        Ok(Some(report))
    } else {
        report.status = SloStatus::Violated;
        Err(EngineError::SloViolated {
            step: step.id().to_owned(),
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ActionOutput, ShellExecution};
    use drill_persistence::StepStatus;
    use drill_scenario::{SloExpectation, StepAction};
    use std::time::Duration;

    fn metric_step(comparison: &str, threshold: f64) -> ChaosStep {
        ChaosStep::new(
            "probe",
            StepAction::CheckMetric {
                query: "latency".into(),
            },
        )
        .unwrap()
        .with_expected_slo(SloExpectation::new("latency_p95", comparison, threshold).unwrap())
    }

    fn metric_result(value: Option<f64>) -> StepResult {
        StepResult {
            status: if value.is_some() {
                StepStatus::Success
            } else {
                StepStatus::Skipped
            },
            output: ActionOutput::Metric {
                query: "latency".into(),
                value,
                error: None,
            },
            observation: None,
            elapsed: Duration::ZERO,
        }
    }

    fn status(comparison: &str, threshold: f64, value: f64) -> Option<SloStatus> {
        match evaluate(&metric_step(comparison, threshold), &metric_result(Some(value))) {
            Ok(report) => report.map(|report| report.status),
            Err(EngineError::SloViolated { report, .. }) => Some(report.status),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn boundary_passes_in_both_directions() {
        assert_eq!(status("<=", 100.0, 100.0), Some(SloStatus::Met));
        assert_eq!(status(">=", 100.0, 100.0), Some(SloStatus::Met));
    }

    #[test]
    fn comparisons_apply_in_the_right_direction() {
        assert_eq!(status("<=", 100.0, 80.0), Some(SloStatus::Met));
        assert_eq!(status("<=", 100.0, 150.0), Some(SloStatus::Violated));
        assert_eq!(status(">=", 99.0, 99.5), Some(SloStatus::Met));
        assert_eq!(status(">=", 99.0, 98.0), Some(SloStatus::Violated));
    }

    #[test]
    fn violation_is_a_hard_stop() {
        let err = evaluate(&metric_step("<=", 100.0), &metric_result(Some(150.0))).unwrap_err();
        let EngineError::SloViolated { step, report } = err else {
            panic!("expected SLO violation");
        };
        assert_eq!(step, "probe");
        assert_eq!(report.value, Some(150.0));
        assert_eq!(report.detail()["slo_status"], json!("violated"));
    }

    #[test]
    fn missing_value_is_pending() {
        let report = evaluate(&metric_step("<=", 100.0), &metric_result(None))
            .unwrap()
            .unwrap();
        assert_eq!(report.status, SloStatus::Pending);

        let shell = ChaosStep::new(
            "stop",
            StepAction::Shell {
                command: "true".into(),
            },
        )
        .unwrap()
        .with_expected_slo(SloExpectation::new("availability", ">=", 99.0).unwrap());
        let result = StepResult {
            status: StepStatus::Success,
            output: ActionOutput::Shell {
                command: "true".into(),
                execution: ShellExecution::DryRun,
            },
            observation: None,
            elapsed: Duration::ZERO,
        };
        let report = evaluate(&shell, &result).unwrap().unwrap();
        assert_eq!(report.status, SloStatus::Pending);
        assert_eq!(report.detail()["slo_value"], serde_json::Value::Null);
    }

    #[test]
    fn no_expectation_means_no_report() {
        let step = ChaosStep::new(
            "plain",
            StepAction::CheckMetric {
                query: "latency".into(),
            },
        )
        .unwrap();
        assert!(evaluate(&step, &metric_result(Some(1.0))).unwrap().is_none());
    }
}

//! ---
//! drill_section: "02-scenario-model"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario, step and SLO expectation model."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::slo::SloExpectation;
use crate::{Result, ScenarioError};

/// Discriminant of a [`StepAction`], as written in definitions and run records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// Run a command through the configured shell.
    Shell,
    /// Query the metric backend.
    CheckMetric,
}

impl ActionKind {
    /// Wire label of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Shell => "shell",
            ActionKind::CheckMetric => "check-metric",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input {
            "shell" => Ok(ActionKind::Shell),
            "check-metric" => Ok(ActionKind::CheckMetric),
            other => Err(other.to_owned()),
        }
    }
}

/// Payload of a step; each variant carries exactly what its executor path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Execute `command` in a child process.
    Shell {
        /// Command line handed to the shell.
        command: String,
    },
    /// Fetch a single value for `query` from the metric backend.
    CheckMetric {
        /// Backend-specific query string.
        query: String,
    },
}

impl StepAction {
    /// Discriminant of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            StepAction::Shell { .. } => ActionKind::Shell,
            StepAction::CheckMetric { .. } => ActionKind::CheckMetric,
        }
    }
}

/// One atomic action within a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ChaosStep {
    id: String,
    action: StepAction,
    rollback: Option<String>,
    expected_slo: Option<SloExpectation>,
    observation: Option<String>,
}

impl ChaosStep {
    /// Build a step, rejecting empty identifiers and empty action payloads.
    pub fn new(id: impl Into<String>, action: StepAction) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ScenarioError::MissingField {
                context: "step".into(),
                field: "id",
            });
        }
        let (field, payload) = match &action {
            StepAction::Shell { command } => ("command", command),
            StepAction::CheckMetric { query } => ("query", query),
        };
        if payload.trim().is_empty() {
            return Err(ScenarioError::MissingField {
                context: format!("step {id}"),
                field,
            });
        }
        Ok(Self {
            id,
            action,
            rollback: None,
            expected_slo: None,
            observation: None,
        })
    }

    /// Attach a rollback hint surfaced to operators when the step fails.
    pub fn with_rollback(mut self, rollback: impl Into<String>) -> Self {
        self.rollback = Some(rollback.into());
        self
    }

    /// Attach the SLO this step's outcome must satisfy.
    pub fn with_expected_slo(mut self, slo: SloExpectation) -> Self {
        self.expected_slo = Some(slo);
        self
    }

    /// Attach a free-form observation note.
    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = Some(observation.into());
        self
    }

    /// Step identifier, unique within its scenario.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Action payload.
    pub fn action(&self) -> &StepAction {
        &self.action
    }

    /// Action discriminant.
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// Rollback hint, if any.
    pub fn rollback(&self) -> Option<&str> {
        self.rollback.as_deref()
    }

    /// SLO expectation, if any.
    pub fn expected_slo(&self) -> Option<&SloExpectation> {
        self.expected_slo.as_ref()
    }

    /// Observation note, if any.
    pub fn observation(&self) -> Option<&str> {
        self.observation.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_step_requires_command() {
        let err = ChaosStep::new(
            "kill-node",
            StepAction::Shell {
                command: "  ".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::MissingField {
                field: "command",
                ..
            }
        ));
    }

    #[test]
    fn metric_step_requires_query() {
        let err = ChaosStep::new(
            "probe",
            StepAction::CheckMetric {
                query: String::new(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ScenarioError::MissingField { field: "query", .. }));
    }

    #[test]
    fn builder_attaches_optional_fields() {
        let slo = SloExpectation::new("latency_p95", "<=", 250.0).unwrap();
        let step = ChaosStep::new(
            "probe",
            StepAction::CheckMetric {
                query: "latency_p95".into(),
            },
        )
        .unwrap()
        .with_expected_slo(slo.clone())
        .with_rollback("systemctl start edge")
        .with_observation("watch the p95 panel");

        assert_eq!(step.kind(), ActionKind::CheckMetric);
        assert_eq!(step.expected_slo(), Some(&slo));
        assert_eq!(step.rollback(), Some("systemctl start edge"));
        assert_eq!(step.observation(), Some("watch the p95 panel"));
    }

    #[test]
    fn action_kind_labels() {
        assert_eq!(ActionKind::CheckMetric.as_str(), "check-metric");
        assert_eq!("shell".parse::<ActionKind>(), Ok(ActionKind::Shell));
        assert!("http".parse::<ActionKind>().is_err());
    }
}

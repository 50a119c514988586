//! ---
//! drill_section: "02-scenario-model"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario, step and SLO expectation model."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
//! Serde shape of scenario documents and their conversion into validated
//! [`ChaosScenario`] values.

use serde::{Deserialize, Serialize};

use crate::scenario::{ChaosScenario, SteadyStateCheck};
use crate::slo::SloExpectation;
use crate::step::{ActionKind, ChaosStep, StepAction};
use crate::{Result, ScenarioError};

/// Scenario document as written by operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// Scenario identifier.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Blast-radius statement.
    pub impact: String,
    /// Opaque steady-state description.
    #[serde(default)]
    pub steady_state_check: SteadyStateCheck,
    /// Ordered steps.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

/// Step entry of a [`ScenarioDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Step identifier.
    pub id: String,
    /// `shell` or `check-metric`.
    pub action: String,
    /// Command for `shell` steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Query for `check-metric` steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Rollback hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<String>,
    /// SLO guard for this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_slo: Option<SloDefinition>,
    /// Observation note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

/// `expected_slo` sub-document. Every field is optional at the serde level so
/// that omissions surface as [`ScenarioError::MissingField`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SloDefinition {
    /// Metric name.
    #[serde(default)]
    pub name: Option<String>,
    /// `<=` or `>=`.
    #[serde(default)]
    pub comparison: Option<String>,
    /// Numeric threshold; numeric strings are accepted.
    #[serde(default)]
    pub threshold: Option<Threshold>,
}

/// Threshold as found in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    /// Plain number.
    Number(f64),
    /// Number written as a string.
    Text(String),
}

impl ScenarioDefinition {
    /// Decode a JSON document.
    pub fn from_json_str(source: &str, origin: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|err| ScenarioError::Decode {
            path: origin.to_owned(),
            message: err.to_string(),
        })
    }

    /// Decode a TOML document.
    pub fn from_toml_str(source: &str, origin: &str) -> Result<Self> {
        toml::from_str(source).map_err(|err| ScenarioError::Decode {
            path: origin.to_owned(),
            message: err.to_string(),
        })
    }
}

impl TryFrom<ScenarioDefinition> for ChaosScenario {
    type Error = ScenarioError;

    fn try_from(definition: ScenarioDefinition) -> Result<Self> {
        let steps = definition
            .steps
            .into_iter()
            .map(ChaosStep::try_from)
            .collect::<Result<Vec<_>>>()?;
        ChaosScenario::new(
            definition.id,
            definition.title,
            definition.description,
            definition.impact,
            definition.steady_state_check,
            steps,
        )
    }
}

impl TryFrom<StepDefinition> for ChaosStep {
    type Error = ScenarioError;

    fn try_from(definition: StepDefinition) -> Result<Self> {
        let context = format!("step {}", definition.id);
        let kind = definition.action.parse::<ActionKind>().map_err(|action| {
            ScenarioError::UnsupportedAction {
                step: definition.id.clone(),
                action,
            }
        })?;
        let action = match kind {
            ActionKind::Shell => StepAction::Shell {
                command: required(definition.command, &context, "command")?,
            },
            ActionKind::CheckMetric => StepAction::CheckMetric {
                query: required(definition.query, &context, "query")?,
            },
        };

        let mut step = ChaosStep::new(definition.id, action)?;
        if let Some(slo) = definition.expected_slo {
            step = step.with_expected_slo(slo.into_expectation(&context)?);
        }
        if let Some(rollback) = definition.rollback {
            step = step.with_rollback(rollback);
        }
        if let Some(observation) = definition.observation {
            step = step.with_observation(observation);
        }
        Ok(step)
    }
}

impl SloDefinition {
    fn into_expectation(self, context: &str) -> Result<SloExpectation> {
        let slo_context = format!("{context} expected_slo");
        let name = required(self.name, &slo_context, "name")?;
        let comparison = required(self.comparison, &slo_context, "comparison")?;
        let threshold = match self.threshold {
            Some(Threshold::Number(value)) => value,
            Some(Threshold::Text(text)) => {
                text.trim()
                    .parse::<f64>()
                    .map_err(|_| ScenarioError::InvalidThreshold { name: name.clone() })?
            }
            None => {
                return Err(ScenarioError::MissingField {
                    context: slo_context,
                    field: "threshold",
                })
            }
        };
        SloExpectation::new(name, &comparison, threshold)
    }
}

fn required(value: Option<String>, context: &str, field: &'static str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ScenarioError::MissingField {
            context: context.to_owned(),
            field,
        }),
    }
}

impl From<&ChaosScenario> for ScenarioDefinition {
    fn from(scenario: &ChaosScenario) -> Self {
        Self {
            id: scenario.id().to_owned(),
            title: scenario.title().to_owned(),
            description: scenario.description().to_owned(),
            impact: scenario.impact().to_owned(),
            steady_state_check: scenario.steady_state_check().clone(),
            steps: scenario.steps().iter().map(StepDefinition::from).collect(),
        }
    }
}

impl From<&ChaosStep> for StepDefinition {
    fn from(step: &ChaosStep) -> Self {
        let (command, query) = match step.action() {
            StepAction::Shell { command } => (Some(command.clone()), None),
            StepAction::CheckMetric { query } => (None, Some(query.clone())),
        };
        Self {
            id: step.id().to_owned(),
            action: step.kind().as_str().to_owned(),
            command,
            query,
            rollback: step.rollback().map(ToOwned::to_owned),
            expected_slo: step.expected_slo().map(|slo| SloDefinition {
                name: Some(slo.name().to_owned()),
                comparison: Some(slo.comparison().as_str().to_owned()),
                threshold: Some(Threshold::Number(slo.threshold())),
            }),
            observation: step.observation().map(ToOwned::to_owned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slo::Comparison;

    const NODE_LOSS: &str = r#"{
        "id": "node-loss",
        "title": "Lose one edge node",
        "description": "Stop an edge node and watch failover",
        "impact": "one of three edge nodes",
        "steady_state_check": {"p95_ms": 120},
        "steps": [
            {"id": "stop", "action": "shell", "command": "systemctl stop edge", "rollback": "systemctl start edge"},
            {"id": "probe", "action": "check-metric", "query": "latency_p95",
             "expected_slo": {"name": "latency_p95", "comparison": "<=", "threshold": "250"}}
        ]
    }"#;

    #[test]
    fn converts_json_document() {
        let definition = ScenarioDefinition::from_json_str(NODE_LOSS, "node-loss.json").unwrap();
        let scenario = ChaosScenario::try_from(definition).unwrap();
        assert_eq!(scenario.steps().len(), 2);
        let slo = scenario.steps()[1].expected_slo().unwrap();
        assert_eq!(slo.comparison(), Comparison::AtMost);
        assert_eq!(slo.threshold(), 250.0);
        assert_eq!(scenario.steps()[0].rollback(), Some("systemctl start edge"));
        assert_eq!(scenario.steady_state_check()["p95_ms"], serde_json::json!(120));
    }

    #[test]
    fn converts_toml_document() {
        let source = r#"
            id = "cpu-burn"
            title = "Burn CPU"
            description = "stress one core"
            impact = "single host"

            [[steps]]
            id = "burn"
            action = "shell"
            command = "stress --cpu 1 --timeout 5"
        "#;
        let definition = ScenarioDefinition::from_toml_str(source, "cpu-burn.toml").unwrap();
        let scenario = ChaosScenario::try_from(definition).unwrap();
        assert_eq!(scenario.id(), "cpu-burn");
        assert!(scenario.steady_state_check().is_empty());
    }

    #[test]
    fn slo_without_comparison_is_rejected() {
        let mut definition = ScenarioDefinition::from_json_str(NODE_LOSS, "x").unwrap();
        definition.steps[1].expected_slo.as_mut().unwrap().comparison = None;
        let err = ChaosScenario::try_from(definition).unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::MissingField {
                field: "comparison",
                ..
            }
        ));
    }

    #[test]
    fn slo_without_threshold_is_rejected() {
        let mut definition = ScenarioDefinition::from_json_str(NODE_LOSS, "x").unwrap();
        definition.steps[1].expected_slo.as_mut().unwrap().threshold = None;
        let err = ChaosScenario::try_from(definition).unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::MissingField {
                field: "threshold",
                ..
            }
        ));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let mut definition = ScenarioDefinition::from_json_str(NODE_LOSS, "x").unwrap();
        definition.steps[0].action = "http".into();
        let err = ChaosScenario::try_from(definition).unwrap_err();
        assert!(matches!(err, ScenarioError::UnsupportedAction { action, .. } if action == "http"));
    }

    #[test]
    fn shell_step_without_command_is_rejected() {
        let mut definition = ScenarioDefinition::from_json_str(NODE_LOSS, "x").unwrap();
        definition.steps[0].command = None;
        assert!(ChaosScenario::try_from(definition).is_err());
    }

    #[test]
    fn definition_survives_show_conversion() {
        let definition = ScenarioDefinition::from_json_str(NODE_LOSS, "x").unwrap();
        let scenario = ChaosScenario::try_from(definition).unwrap();
        let shown = ScenarioDefinition::from(&scenario);
        let rebuilt = ChaosScenario::try_from(shown).unwrap();
        assert_eq!(rebuilt, scenario);
    }
}

//! ---
//! drill_section: "02-scenario-model"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario, step and SLO expectation model."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
use std::collections::HashSet;

use indexmap::IndexMap;

use crate::step::ChaosStep;
use crate::{Result, ScenarioError};

/// Opaque steady-state description; displayed and persisted, never interpreted.
pub type SteadyStateCheck = IndexMap<String, serde_json::Value>;

/// Named, ordered fault-injection test case.
///
/// Constructed once through [`ChaosScenario::new`] (or a
/// [`crate::ScenarioDefinition`]) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ChaosScenario {
    id: String,
    title: String,
    description: String,
    impact: String,
    steady_state_check: SteadyStateCheck,
    steps: Vec<ChaosStep>,
}

impl ChaosScenario {
    /// Assemble a scenario, enforcing a non-empty id, title and step list and
    /// unique step ids.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        impact: impl Into<String>,
        steady_state_check: SteadyStateCheck,
        steps: Vec<ChaosStep>,
    ) -> Result<Self> {
        let id = id.into();
        let title = title.into();
        if id.trim().is_empty() {
            return Err(ScenarioError::MissingField {
                context: "scenario".into(),
                field: "id",
            });
        }
        if title.trim().is_empty() {
            return Err(ScenarioError::MissingField {
                context: format!("scenario {id}"),
                field: "title",
            });
        }
        if steps.is_empty() {
            return Err(ScenarioError::EmptyScenario(id));
        }
        let mut seen = HashSet::with_capacity(steps.len());
        for step in &steps {
            if !seen.insert(step.id()) {
                return Err(ScenarioError::DuplicateStep {
                    scenario: id,
                    step: step.id().to_owned(),
                });
            }
        }
        Ok(Self {
            id,
            title,
            description: description.into(),
            impact: impact.into(),
            steady_state_check,
            steps,
        })
    }

    /// Scenario identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Longer description of the experiment.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Blast-radius statement.
    pub fn impact(&self) -> &str {
        &self.impact
    }

    /// Steady-state description.
    pub fn steady_state_check(&self) -> &SteadyStateCheck {
        &self.steady_state_check
    }

    /// Steps in execution order; never empty.
    pub fn steps(&self) -> &[ChaosStep] {
        &self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepAction;

    fn shell(id: &str) -> ChaosStep {
        ChaosStep::new(
            id,
            StepAction::Shell {
                command: "true".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_step_list() {
        let err = ChaosScenario::new("s", "t", "", "", SteadyStateCheck::new(), vec![]).unwrap_err();
        assert!(matches!(err, ScenarioError::EmptyScenario(id) if id == "s"));
    }

    #[test]
    fn rejects_duplicate_step_ids() {
        let err = ChaosScenario::new(
            "s",
            "t",
            "",
            "",
            SteadyStateCheck::new(),
            vec![shell("a"), shell("b"), shell("a")],
        )
        .unwrap_err();
        assert!(matches!(err, ScenarioError::DuplicateStep { step, .. } if step == "a"));
    }

    #[test]
    fn keeps_step_order() {
        let scenario = ChaosScenario::new(
            "s",
            "t",
            "d",
            "i",
            SteadyStateCheck::new(),
            vec![shell("one"), shell("two"), shell("three")],
        )
        .unwrap();
        let ids: Vec<_> = scenario.steps().iter().map(ChaosStep::id).collect();
        assert_eq!(ids, vec!["one", "two", "three"]);
    }
}

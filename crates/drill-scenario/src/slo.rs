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

use crate::{Result, ScenarioError};

/// Direction of an SLO threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    /// The observed value must not exceed the threshold (`<=`).
    #[serde(rename = "<=")]
    AtMost,
    /// The observed value must reach the threshold (`>=`).
    #[serde(rename = ">=")]
    AtLeast,
}

impl Comparison {
    /// Operator symbol as written in scenario definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::AtMost => "<=",
            Comparison::AtLeast => ">=",
        }
    }

    /// Apply the comparison. The boundary value always passes.
    pub fn passes(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::AtMost => value <= threshold,
            Comparison::AtLeast => value >= threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparison {
    type Err = ScenarioError;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.trim() {
            "<=" => Ok(Comparison::AtMost),
            ">=" => Ok(Comparison::AtLeast),
            other => Err(ScenarioError::UnsupportedComparison(other.to_owned())),
        }
    }
}

/// Threshold constraint a step's observed metric must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SloExpectation {
    name: String,
    comparison: Comparison,
    threshold: f64,
}

impl SloExpectation {
    /// Build an expectation, rejecting unknown operators and non-finite thresholds.
    pub fn new(name: impl Into<String>, comparison: &str, threshold: f64) -> Result<Self> {
        let comparison = comparison.parse::<Comparison>()?;
        Self::with_comparison(name, comparison, threshold)
    }

    /// Build an expectation from an already-typed comparison.
    pub fn with_comparison(
        name: impl Into<String>,
        comparison: Comparison,
        threshold: f64,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ScenarioError::MissingField {
                context: "expected_slo".into(),
                field: "name",
            });
        }
        if !threshold.is_finite() {
            return Err(ScenarioError::InvalidThreshold { name });
        }
        Ok(Self {
            name,
            comparison,
            threshold,
        })
    }

    /// Metric name as known to the monitoring system.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Threshold direction.
    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    /// Threshold value, in the unit the monitoring system reports.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether `value` satisfies this expectation.
    pub fn is_satisfied_by(&self, value: f64) -> bool {
        self.comparison.passes(value, self.threshold)
    }
}

impl fmt::Display for SloExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.comparison, self.threshold)
    }
}

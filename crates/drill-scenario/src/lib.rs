//! ---
//! drill_section: "02-scenario-model"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario, step and SLO expectation model."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
//! Data model for declarative chaos scenarios.
//!
//! Scenarios are built from [`ScenarioDefinition`] documents and validated
//! eagerly: a [`ChaosScenario`] value that exists is always safe to hand to
//! the execution engine.
#![warn(missing_docs)]

pub mod catalog;
pub mod definition;
pub mod scenario;
pub mod slo;
pub mod step;

pub use catalog::ScenarioCatalog;
pub use definition::{ScenarioDefinition, SloDefinition, StepDefinition};
pub use scenario::ChaosScenario;
pub use slo::{Comparison, SloExpectation};
pub use step::{ActionKind, ChaosStep, StepAction};

/// Result alias used throughout the scenario crate.
pub type Result<T> = std::result::Result<T, ScenarioError>;

/// Configuration errors raised while building scenarios or looking them up.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// A field required by the scenario invariants is absent or empty.
    #[error("{context}: missing required field `{field}`")]
    MissingField {
        /// Scenario or step the field belongs to.
        context: String,
        /// Name of the absent field.
        field: &'static str,
    },
    /// The scenario declares no steps.
    #[error("scenario {0} declares no steps")]
    EmptyScenario(String),
    /// Two steps share the same identifier.
    #[error("scenario {scenario} declares step {step} more than once")]
    DuplicateStep {
        /// Scenario identifier.
        scenario: String,
        /// Repeated step identifier.
        step: String,
    },
    /// The step action is not one of `shell` or `check-metric`.
    #[error("step {step}: unsupported action `{action}`")]
    UnsupportedAction {
        /// Step identifier.
        step: String,
        /// Action value found in the definition.
        action: String,
    },
    /// The SLO comparison operator is not `<=` or `>=`.
    #[error("unsupported SLO comparison `{0}` (expected `<=` or `>=`)")]
    UnsupportedComparison(String),
    /// The SLO threshold is NaN or infinite.
    #[error("SLO {name}: threshold must be a finite number")]
    InvalidThreshold {
        /// SLO metric name.
        name: String,
    },
    /// No scenario with the requested identifier exists in the catalog.
    #[error("scenario {0} not found")]
    NotFound(String),
    /// Two catalog sources declare the same scenario identifier.
    #[error("scenario {0} is defined more than once")]
    DuplicateScenario(String),
    /// The definition document could not be decoded.
    #[error("{path}: {message}")]
    Decode {
        /// Source the document was read from.
        path: String,
        /// Decoder message.
        message: String,
    },
    /// Wrapper for IO errors encountered while reading definitions.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

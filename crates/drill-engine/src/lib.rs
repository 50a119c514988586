//! ---
//! drill_section: "04-execution-engine"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario execution engine."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
//! Scenario execution engine.
//!
//! A run is a strictly sequential pipeline: every step goes through the
//! [`StepExecutor`] and then the SLO guard ([`slo::evaluate`]); its merged
//! outcome is appended to a [`RunRecorder`]. The first failure stops the run
//! and seals the record with the failure description, so an artifact exists
//! after every run attempt that got past scenario lookup.
#![warn(missing_docs)]

use std::time::Duration;

use drill_persistence::{PersistenceError, StepDetail};
use drill_scenario::ScenarioError;
use serde_json::json;

pub mod cancel;
pub mod executor;
pub mod probe;
pub mod process;
pub mod recorder;
pub mod replay;
pub mod runner;
pub mod slo;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use executor::{ActionOutput, ShellExecution, StepExecutor, StepResult};
pub use probe::{FixedMetricSource, HttpMetricSource, MetricQueryError, MetricSource};
pub use process::{ProcessLauncher, ProcessOutput, ShellLauncher};
pub use recorder::{RecorderState, RunRecorder};
pub use replay::Replay;
pub use runner::{ChaosRunner, RunError, RunOptions, RunOutcome};
pub use slo::{SloReport, SloStatus};

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure class of an [`EngineError`], used by callers to pick exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed scenario, unknown id, or other caller/config mistake.
    Configuration,
    /// A step's command or metric query failed.
    Execution,
    /// A confirmed SLO breach.
    SloViolation,
    /// The run was cancelled or hit a step deadline.
    Interrupted,
    /// The run artifact could not be written.
    Storage,
}

/// Errors that stop a run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Scenario lookup or construction failed.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// The command could not be started at all.
    #[error("step {step}: failed to launch `{command}`: {source}")]
    Launch {
        /// Step identifier.
        step: String,
        /// Command line.
        command: String,
        /// Spawn error.
        #[source]
        source: std::io::Error,
    },
    /// The command exited unsuccessfully.
    #[error("step {step}: `{command}` exited with {}", describe_exit(.exit_code))]
    CommandFailed {
        /// Step identifier.
        step: String,
        /// Command line.
        command: String,
        /// Exit code; `None` when terminated by a signal.
        exit_code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
    /// The metric backend was reachable but failed, and strict mode is on.
    #[error("step {step}: metric query `{query}` failed: {source}")]
    MetricQuery {
        /// Step identifier.
        step: String,
        /// Query string.
        query: String,
        /// Backend error.
        #[source]
        source: MetricQueryError,
    },
    /// The observed metric breached the step's SLO.
    #[error(
        "step {step}: SLO {} violated: observed {}, expected {} {}",
        .report.name,
        .report.value.unwrap_or(f64::NAN),
        .report.comparison,
        .report.threshold
    )]
    SloViolated {
        /// Step identifier.
        step: String,
        /// Evaluation report carrying the metric name, value and threshold.
        report: SloReport,
    },
    /// The step exceeded its deadline.
    #[error("step {step}: exceeded deadline of {after:?}")]
    Timeout {
        /// Step identifier.
        step: String,
        /// Configured deadline.
        after: Duration,
    },
    /// The run was cancelled while the step was pending or in flight.
    #[error("step {step}: run cancelled")]
    Cancelled {
        /// Step identifier.
        step: String,
    },
    /// The run artifact could not be written.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_owned(),
    }
}

impl EngineError {
    /// Classify the error.
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::Scenario(_) => FailureKind::Configuration,
            EngineError::Launch { .. }
            | EngineError::CommandFailed { .. }
            | EngineError::MetricQuery { .. } => FailureKind::Execution,
            EngineError::SloViolated { .. } => FailureKind::SloViolation,
            EngineError::Timeout { .. } | EngineError::Cancelled { .. } => FailureKind::Interrupted,
            EngineError::Persistence(_) => FailureKind::Storage,
        }
    }

    /// Step-detail fields describing the failure, recorded on the failed step.
    pub fn detail(&self) -> StepDetail {
        let mut detail = StepDetail::new();
        match self {
            EngineError::Launch { command, .. } => {
                detail.insert("command".into(), json!(command));
            }
            EngineError::CommandFailed {
                command,
                exit_code,
                stdout,
                stderr,
                ..
            } => {
                detail.insert("command".into(), json!(command));
                detail.insert("exit_code".into(), json!(exit_code));
                detail.insert("stdout".into(), json!(stdout));
                detail.insert("stderr".into(), json!(stderr));
            }
            EngineError::MetricQuery { query, source, .. } => {
                detail.insert("metric_query".into(), json!(query));
                detail.insert("metric_error".into(), json!(source.to_string()));
            }
            EngineError::SloViolated { report, .. } => detail.extend(report.detail()),
            EngineError::Timeout { after, .. } => {
                detail.insert(
                    "timeout_ms".into(),
                    json!(drill_common::time::duration_to_millis(*after)),
                );
            }
            EngineError::Cancelled { .. }
            | EngineError::Scenario(_)
            | EngineError::Persistence(_) => {}
        }
        detail.insert("error".into(), json!(self.to_string()));
        detail
    }
}

//! ---
//! drill_section: "04-execution-engine"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario execution engine."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
//! Step executor: turns one [`ChaosStep`] into a [`StepResult`].

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use drill_common::config::{ExecutionConfig, MetricsConfig};
use drill_common::time::duration_to_millis;
use drill_persistence::{StepDetail, StepStatus};
use drill_scenario::{ChaosStep, StepAction};
use serde_json::json;
use tracing::{debug, warn};

use crate::cancel::CancelSignal;
use crate::probe::{HttpMetricSource, MetricQueryError, MetricSource};
use crate::process::{ProcessLauncher, ShellLauncher};
use crate::{EngineError, Result};

/// Marker recorded in place of output for shell steps skipped by a dry run.
pub const DRY_RUN_MARKER: &str = "dry-run: not executed";

/// What happened to a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellExecution {
    /// Not executed because the run is a dry run.
    DryRun,
    /// Ran to a successful exit.
    Completed {
        /// Exit code reported by the process.
        exit_code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
}

/// Action-specific outcome of a step.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutput {
    /// Outcome of a `shell` step.
    Shell {
        /// Command line.
        command: String,
        /// Execution outcome.
        execution: ShellExecution,
    },
    /// Outcome of a `check-metric` step.
    Metric {
        /// Query string.
        query: String,
        /// Observed value, if any.
        value: Option<f64>,
        /// Backend failure that was degraded to `skipped`.
        error: Option<String>,
    },
}

/// Result of executing one step, before SLO evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Execution status.
    pub status: StepStatus,
    /// Action-specific outcome.
    pub output: ActionOutput,
    /// Observation text carried over from the step.
    pub observation: Option<String>,
    /// Wall time spent on the step.
    pub elapsed: Duration,
}

impl StepResult {
    /// Metric value attached to the result, if any.
    pub fn metric_value(&self) -> Option<f64> {
        match &self.output {
            ActionOutput::Metric { value, .. } => *value,
            ActionOutput::Shell { .. } => None,
        }
    }

    /// Detail fields recorded for this step.
    pub fn detail(&self) -> StepDetail {
        let mut detail = StepDetail::new();
        if let Some(observation) = &self.observation {
            detail.insert("observation".into(), json!(observation));
        }
        match &self.output {
            ActionOutput::Shell { command, execution } => {
                detail.insert("command".into(), json!(command));
                match execution {
                    ShellExecution::DryRun => {
                        detail.insert("output".into(), json!(DRY_RUN_MARKER));
                    }
                    ShellExecution::Completed {
                        exit_code,
                        stdout,
                        stderr,
                    } => {
                        detail.insert("exit_code".into(), json!(exit_code));
                        detail.insert("stdout".into(), json!(stdout));
                        detail.insert("stderr".into(), json!(stderr));
                    }
                }
            }
            ActionOutput::Metric {
                query,
                value,
                error,
            } => {
                detail.insert("metric_query".into(), json!(query));
                detail.insert("metric_value".into(), json!(value));
                if let Some(error) = error {
                    detail.insert("metric_error".into(), json!(error));
                }
            }
        }
        detail.insert("duration_ms".into(), json!(duration_to_millis(self.elapsed)));
        detail
    }
}

/// Executes steps one at a time against a process launcher and metric source.
#[derive(Clone)]
pub struct StepExecutor {
    launcher: Arc<dyn ProcessLauncher>,
    metrics: Arc<dyn MetricSource>,
    step_timeout: Option<Duration>,
    strict_metrics: bool,
}

impl std::fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepExecutor")
            .field("step_timeout", &self.step_timeout)
            .field("strict_metrics", &self.strict_metrics)
            .finish_non_exhaustive()
    }
}

impl StepExecutor {
    /// Executor without a deadline and with lenient metric handling.
    pub fn new(launcher: Arc<dyn ProcessLauncher>, metrics: Arc<dyn MetricSource>) -> Self {
        Self {
            launcher,
            metrics,
            step_timeout: None,
            strict_metrics: false,
        }
    }

    /// Bound every step by `timeout`.
    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Treat metric backend failures as fatal instead of degrading to `skipped`.
    pub fn with_strict_metrics(mut self, strict: bool) -> Self {
        self.strict_metrics = strict;
        self
    }

    /// Executor wired to a shell launcher and HTTP metric source from configuration.
    pub fn from_config(
        execution: &ExecutionConfig,
        metrics: &MetricsConfig,
    ) -> std::result::Result<Self, MetricQueryError> {
        let source = HttpMetricSource::from_config(metrics)?;
        Ok(Self::new(
            Arc::new(ShellLauncher::from_config(execution)),
            Arc::new(source),
        )
        .with_step_timeout(execution.step_timeout)
        .with_strict_metrics(metrics.strict))
    }

    /// Execute `step`, honouring the dry-run flag, the step deadline and `cancel`.
    pub async fn execute(
        &self,
        step: &ChaosStep,
        dry_run: bool,
        cancel: &CancelSignal,
    ) -> Result<StepResult> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled {
                step: step.id().to_owned(),
            });
        }
        let started = Instant::now();
        let (status, output) = self.guard(step, cancel, self.perform(step, dry_run)).await?;
        let elapsed = started.elapsed();
        debug!(step = step.id(), status = status.as_str(), ?elapsed, "step executed");
        Ok(StepResult {
            status,
            output,
            observation: step.observation().map(str::to_owned),
            elapsed,
        })
    }

    async fn guard<T>(
        &self,
        step: &ChaosStep,
        cancel: &CancelSignal,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let bounded = async {
            match self.step_timeout {
                Some(after) => match tokio::time::timeout(after, work).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(EngineError::Timeout {
                        step: step.id().to_owned(),
                        after,
                    }),
                },
                None => work.await,
            }
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled {
                step: step.id().to_owned(),
            }),
            outcome = bounded => outcome,
        }
    }

    async fn perform(&self, step: &ChaosStep, dry_run: bool) -> Result<(StepStatus, ActionOutput)> {
        match step.action() {
            StepAction::Shell { command } => {
                if dry_run {
                    return Ok((
                        StepStatus::Skipped,
                        ActionOutput::Shell {
                            command: command.clone(),
                            execution: ShellExecution::DryRun,
                        },
                    ));
                }
                let output =
                    self.launcher
                        .launch(command)
                        .await
                        .map_err(|source| EngineError::Launch {
                            step: step.id().to_owned(),
                            command: command.clone(),
                            source,
                        })?;
                if !output.success {
                    return Err(EngineError::CommandFailed {
                        step: step.id().to_owned(),
                        command: command.clone(),
                        exit_code: output.exit_code,
                        stdout: output.stdout,
                        stderr: output.stderr,
                    });
                }
                Ok((
                    StepStatus::Success,
                    ActionOutput::Shell {
                        command: command.clone(),
                        execution: ShellExecution::Completed {
                            exit_code: output.exit_code,
                            stdout: output.stdout,
                            stderr: output.stderr,
                        },
                    },
                ))
            }
            StepAction::CheckMetric { query } => match finite(self.metrics.fetch_value(query).await) {
                Ok(value) => {
                    let status = if value.is_some() {
                        StepStatus::Success
                    } else {
                        StepStatus::Skipped
                    };
                    Ok((
                        status,
                        ActionOutput::Metric {
                            query: query.clone(),
                            value,
                            error: None,
                        },
                    ))
                }
                Err(source) if self.strict_metrics => Err(EngineError::MetricQuery {
                    step: step.id().to_owned(),
                    query: query.clone(),
                    source,
                }),
                Err(source) => {
                    warn!(step = step.id(), query = %query, error = %source, "metric query failed, skipping step");
                    Ok((
                        StepStatus::Skipped,
                        ActionOutput::Metric {
                            query: query.clone(),
                            value: None,
                            error: Some(source.to_string()),
                        },
                    ))
                }
            },
        }
    }
}

fn finite(
    fetched: std::result::Result<Option<f64>, MetricQueryError>,
) -> std::result::Result<Option<f64>, MetricQueryError> {
    match fetched {
        Ok(Some(value)) if !value.is_finite() => Err(MetricQueryError::Malformed(format!(
            "value {value} is not a finite number"
        ))),
        other => other,
    }
}

//! ---
//! drill_section: "04-execution-engine"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario execution engine."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
//! Scenario runner: look up, execute strictly in order, seal.

use std::path::PathBuf;
use std::time::Instant;

use drill_logging::{drill_error, drill_info, drill_warn, log_run_event, LogContext, RunEventOutcome};
use drill_metrics::DrillMetrics;
use drill_persistence::{RunId, RunRecord, RunStore, StepDetail, StepStatus};
use drill_scenario::{ChaosScenario, ChaosStep, ScenarioCatalog};
use serde_json::json;

use crate::cancel::CancelSignal;
use crate::executor::StepExecutor;
use crate::recorder::RunRecorder;
use crate::slo::{self, SloStatus};
use crate::{EngineError, FailureKind};

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Suppress shell side effects.
    pub dry_run: bool,
    /// Free-form operator note stored with the run and used in its identity.
    pub note: Option<String>,
}

/// Result of a run that completed every step.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Run identity.
    pub run_id: RunId,
    /// Path of the sealed artifact.
    pub artifact: PathBuf,
    /// Sealed record.
    pub record: RunRecord,
}

/// A failed run, carrying the artifact location when one was sealed.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RunError {
    /// Sealed artifact containing the failure reason; `None` when the run
    /// never started or the artifact could not be written.
    pub artifact: Option<PathBuf>,
    /// Failure that stopped the run.
    pub error: EngineError,
}

impl RunError {
    fn without_artifact(error: impl Into<EngineError>) -> Self {
        Self {
            artifact: None,
            error: error.into(),
        }
    }

    /// Failure class of the underlying error.
    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }
}

/// Drives scenarios from a catalog through the executor and SLO guard.
#[derive(Debug)]
pub struct ChaosRunner {
    catalog: ScenarioCatalog,
    executor: StepExecutor,
    store: RunStore,
    metrics: Option<DrillMetrics>,
}

impl ChaosRunner {
    /// Build a runner.
    pub fn new(catalog: ScenarioCatalog, executor: StepExecutor, store: RunStore) -> Self {
        Self {
            catalog,
            executor,
            store,
            metrics: None,
        }
    }

    /// Publish run, step and SLO metrics.
    pub fn with_metrics(mut self, metrics: DrillMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Scenarios sorted by id.
    pub fn list_scenarios(&self) -> impl Iterator<Item = &ChaosScenario> {
        self.catalog.iter()
    }

    /// Look up one scenario.
    pub fn show(&self, scenario_id: &str) -> Result<&ChaosScenario, EngineError> {
        Ok(self.catalog.get(scenario_id)?)
    }

    /// Artifact store used for runs.
    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// Run `scenario_id`.
    ///
    /// Steps run strictly in order. The first failing step is recorded as
    /// `failed`, the record is sealed with the error text, and the error is
    /// returned together with the artifact path.
    pub async fn run(
        &self,
        scenario_id: &str,
        options: RunOptions,
        cancel: &CancelSignal,
    ) -> Result<RunOutcome, RunError> {
        let scenario = self.catalog.get(scenario_id).map_err(RunError::without_artifact)?;
        let mut recorder = RunRecorder::start(
            self.store.clone(),
            scenario,
            options.note.clone(),
            options.dry_run,
        );
        let run_id = recorder.id().clone();
        let ctx = LogContext::new()
            .with_scenario(scenario.id())
            .with_run(run_id.as_str())
            .with_dry_run(options.dry_run);
        log_run_event(
            Some(&ctx),
            "run.started",
            &format!("running {} ({} steps)", scenario.title(), scenario.steps().len()),
            RunEventOutcome::Success,
        );

        for step in scenario.steps() {
            let step_ctx = ctx.clone().with_step(step.id());
            drill_info!(context = step_ctx, "executing {} step", step.kind().as_str());
            let outcome = self
                .run_step(step, &options, cancel, &mut recorder, &step_ctx)
                .await;
            if let Err((error, detail)) = outcome {
                return Err(self.fail(scenario, step, &mut recorder, error, detail, &step_ctx));
            }
        }

        let artifact = recorder.finalize().map_err(RunError::without_artifact)?;
        self.count_run(scenario, "finalized");
        log_run_event(
            Some(&ctx),
            "run.finalized",
            &format!("run sealed at {}", artifact.display()),
            RunEventOutcome::Success,
        );
        Ok(RunOutcome {
            run_id,
            artifact,
            record: recorder.record().clone(),
        })
    }

    async fn run_step(
        &self,
        step: &ChaosStep,
        options: &RunOptions,
        cancel: &CancelSignal,
        recorder: &mut RunRecorder,
        ctx: &LogContext<'_>,
    ) -> Result<(), (EngineError, StepDetail)> {
        let started = Instant::now();
        let result = match self.executor.execute(step, options.dry_run, cancel).await {
            Ok(result) => result,
            Err(error) => {
                self.count_step(step, StepStatus::Failed, started);
                return Err((error, StepDetail::new()));
            }
        };
        let mut detail = result.detail();
        match slo::evaluate(step, &result) {
            Ok(Some(report)) => {
                self.count_slo(&report.name, report.status);
                if report.status == SloStatus::Pending {
                    drill_warn!(
                        context = ctx,
                        "SLO {} could not be verified automatically, confirm manually",
                        report.name
                    );
                }
                detail.extend(report.detail());
            }
            Ok(None) => {}
            Err(error) => {
                if let EngineError::SloViolated { report, .. } = &error {
                    self.count_slo(&report.name, report.status);
                }
                self.count_step(step, StepStatus::Failed, started);
                return Err((error, detail));
            }
        }
        self.count_step(step, result.status, started);
        recorder.append(step, result.status, detail);
        Ok(())
    }

    fn fail(
        &self,
        scenario: &ChaosScenario,
        step: &ChaosStep,
        recorder: &mut RunRecorder,
        error: EngineError,
        mut detail: StepDetail,
        ctx: &LogContext<'_>,
    ) -> RunError {
        detail.extend(error.detail());
        if let Some(rollback) = step.rollback() {
            detail.insert("rollback".into(), json!(rollback));
        }
        recorder.append(step, StepStatus::Failed, detail);
        let reason = error.to_string();
        self.count_run(scenario, "aborted");
        match recorder.abort(&reason) {
            Ok(artifact) => {
                log_run_event(
                    Some(ctx),
                    "run.aborted",
                    &format!("{reason}; record sealed at {}", artifact.display()),
                    RunEventOutcome::Fault,
                );
                RunError {
                    artifact: Some(artifact),
                    error,
                }
            }
            Err(storage) => {
                drill_error!(context = ctx.clone(), "unable to seal aborted run: {}", storage);
                log_run_event(Some(ctx), "run.aborted", &reason, RunEventOutcome::Fault);
                RunError {
                    artifact: None,
                    error,
                }
            }
        }
    }

    fn count_run(&self, scenario: &ChaosScenario, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_run(scenario.id(), outcome);
        }
    }

    fn count_step(&self, step: &ChaosStep, status: StepStatus, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.record_step(step.kind().as_str(), status.as_str(), started.elapsed());
        }
    }

    fn count_slo(&self, name: &str, status: SloStatus) {
        if let Some(metrics) = &self.metrics {
            metrics.record_slo(name, status.as_str());
        }
    }
}

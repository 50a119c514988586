//! ---
//! drill_section: "04-execution-engine"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario execution engine."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
//! Run recorder: `Created -> Recording -> Sealed`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use drill_persistence::{RunId, RunRecord, RunStore, StepDetail, StepEntry, StepStatus};
use drill_scenario::{ChaosScenario, ChaosStep};
use tracing::{debug, warn};

use crate::Result;

/// Lifecycle state of a [`RunRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderState {
    /// Identity assigned, no step recorded yet.
    Created,
    /// At least one step recorded.
    Recording,
    /// Persisted at the contained path; terminal.
    Sealed(PathBuf),
}

/// Accumulates one run's record and seals it exactly once.
#[derive(Debug)]
pub struct RunRecorder {
    store: RunStore,
    id: RunId,
    record: RunRecord,
    state: RecorderState,
}

impl RunRecorder {
    /// Start recording a run of `scenario` now.
    pub fn start(store: RunStore, scenario: &ChaosScenario, note: Option<String>, dry_run: bool) -> Self {
        Self::start_at(store, scenario, note, dry_run, Utc::now())
    }

    /// Start recording a run of `scenario` at `started_at`.
    pub fn start_at(
        store: RunStore,
        scenario: &ChaosScenario,
        note: Option<String>,
        dry_run: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        let id = RunId::new(started_at, scenario.id(), note.as_deref());
        let record = RunRecord::new(scenario.id(), scenario.title(), started_at, note, dry_run);
        Self {
            store,
            id,
            record,
            state: RecorderState::Created,
        }
    }

    /// Run identity (artifact stem before collision suffixes).
    pub fn id(&self) -> &RunId {
        &self.id
    }

    /// In-memory record.
    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Current state.
    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    /// Artifact path once sealed.
    pub fn artifact(&self) -> Option<&Path> {
        match &self.state {
            RecorderState::Sealed(path) => Some(path),
            _ => None,
        }
    }

    /// Append the outcome of `step`. Ignored once sealed.
    pub fn append(&mut self, step: &ChaosStep, status: StepStatus, detail: StepDetail) {
        if let RecorderState::Sealed(path) = &self.state {
            warn!(run = %self.id, step = step.id(), artifact = %path.display(), "append after seal ignored");
            return;
        }
        self.record.steps.push(StepEntry {
            step_id: step.id().to_owned(),
            action: step.kind().as_str().to_owned(),
            status,
            detail,
        });
        self.state = RecorderState::Recording;
    }

    /// Seal after a clean run. Idempotent.
    pub fn finalize(&mut self) -> Result<PathBuf> {
        self.seal(None)
    }

    /// Attach `reason` and seal. Idempotent; a sealed record keeps its first outcome.
    pub fn abort(&mut self, reason: &str) -> Result<PathBuf> {
        self.seal(Some(reason))
    }

    fn seal(&mut self, failure: Option<&str>) -> Result<PathBuf> {
        if let RecorderState::Sealed(path) = &self.state {
            debug!(run = %self.id, artifact = %path.display(), "record already sealed");
            return Ok(path.clone());
        }
        if let Some(reason) = failure {
            self.record.failed = Some(reason.to_owned());
        }
        let path = self.store.seal(&self.id, &self.record)?;
        self.state = RecorderState::Sealed(path.clone());
        Ok(path)
    }
}

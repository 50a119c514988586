//! ---
//! drill_section: "04-execution-engine"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario execution engine."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
//! Read-only rendering of sealed run artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use drill_persistence::{RunRecord, RunStore};
use serde_json::Value;

use crate::Result;

/// A loaded run artifact.
#[derive(Debug, Clone)]
pub struct Replay {
    source: PathBuf,
    record: RunRecord,
}

impl Replay {
    /// Load the artifact at `path`. The file is only read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = path.as_ref().to_path_buf();
        let record = RunStore::load(&source)?;
        Ok(Self { source, record })
    }

    /// Artifact location.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Stored record.
    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Human-readable report.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Replay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = &self.record;
        writeln!(f, "Scenario: {} ({})", record.scenario_title, record.scenario_id)?;
        writeln!(f, "Started:  {}", record.started_at.to_rfc3339())?;
        writeln!(f, "Dry run:  {}", record.dry_run)?;
        writeln!(f, "Note:     {}", record.note.as_deref().unwrap_or("none"))?;
        writeln!(f, "Failure:  {}", record.failed.as_deref().unwrap_or("none"))?;
        writeln!(f, "Steps:")?;
        for entry in &record.steps {
            writeln!(
                f,
                "  - {} [{}] {}",
                entry.step_id,
                entry.action,
                entry.status.as_str()
            )?;
            for (key, value) in &entry.detail {
                if key == "status" {
                    continue;
                }
                writeln!(f, "      {key}: {}", display_value(value))?;
            }
        }
        Ok(())
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "-".to_owned(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use drill_persistence::{RunId, StepDetail, StepEntry, StepStatus};
    use serde_json::json;
    use tempfile::tempdir;

    fn sealed(dir: &Path) -> (PathBuf, RunRecord) {
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut record = RunRecord::new("cache-evict", "Cache eviction", started, None, false);
        let mut detail = StepDetail::new();
        detail.insert("command".into(), json!("redis-cli flushall"));
        detail.insert("exit_code".into(), json!(1));
        detail.insert("metric_value".into(), Value::Null);
        record.steps.push(StepEntry {
            step_id: "flush".into(),
            action: "shell".into(),
            status: StepStatus::Failed,
            detail,
        });
        record.failed = Some("step flush: `redis-cli flushall` exited with exit code 1".into());
        let store = RunStore::new(dir);
        let path = store
            .seal(&RunId::new(started, "cache-evict", None), &record)
            .unwrap();
        (path, record)
    }

    #[test]
    fn round_trips_every_stored_field() {
        let dir = tempdir().unwrap();
        let (path, record) = sealed(dir.path());
        let replay = Replay::load(&path).unwrap();
        assert_eq!(replay.record(), &record);
        assert_eq!(replay.source(), path.as_path());
    }

    #[test]
    fn renders_identity_failure_and_details() {
        let dir = tempdir().unwrap();
        let (path, _) = sealed(dir.path());
        let before = std::fs::read(&path).unwrap();
        let text = Replay::load(&path).unwrap().render();

        assert!(text.contains("Scenario: Cache eviction (cache-evict)"));
        assert!(text.contains("Started:  2024-05-01T12:00:00+00:00"));
        assert!(text.contains("Dry run:  false"));
        assert!(text.contains("Note:     none"));
        assert!(text.contains("Failure:  step flush"));
        assert!(text.contains("  - flush [shell] failed"));
        assert!(text.contains("      command: redis-cli flushall"));
        assert!(text.contains("      exit_code: 1"));
        assert!(text.contains("      metric_value: -"));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn missing_artifact_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(Replay::load(dir.path().join("nope.json")).is_err());
    }
}

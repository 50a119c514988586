//! ---
//! drill_section: "03-persistence-replay"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Run record model and artifact storage."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Free-form detail attached to a step entry. Insertion order is preserved so
/// replays print fields the way the executor produced them.
pub type StepDetail = IndexMap<String, serde_json::Value>;

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// The action ran and produced its result.
    Success,
    /// The action intentionally did nothing (dry run, metric backend unavailable).
    Skipped,
    /// The action or its SLO guard failed; the run was aborted here.
    Failed,
}

impl StepStatus {
    /// Lowercase label used in artifacts and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Success => "success",
            StepStatus::Skipped => "skipped",
            StepStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded outcome of one attempted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEntry {
    /// Step identifier.
    pub step_id: String,
    /// Action label (`shell`, `check-metric`).
    pub action: String,
    /// Step outcome.
    pub status: StepStatus,
    /// Merged execution output and SLO report.
    #[serde(default)]
    pub detail: StepDetail,
}

/// Durable description of one scenario execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Scenario identifier.
    pub scenario_id: String,
    /// Scenario title at the time of the run.
    pub scenario_title: String,
    /// Instant the run started.
    pub started_at: DateTime<Utc>,
    /// Operator note (change ticket, on-call name).
    #[serde(default)]
    pub note: Option<String>,
    /// Whether shell steps were suppressed.
    pub dry_run: bool,
    /// Attempted steps in attempt order.
    #[serde(default)]
    pub steps: Vec<StepEntry>,
    /// Failure description when the run was aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,
}

impl RunRecord {
    /// Start an empty record.
    pub fn new(
        scenario_id: impl Into<String>,
        scenario_title: impl Into<String>,
        started_at: DateTime<Utc>,
        note: Option<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            scenario_title: scenario_title.into(),
            started_at,
            note,
            dry_run,
            steps: Vec::new(),
            failed: None,
        }
    }

    /// Whether the run was aborted.
    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }
}

/// Storage identity of a run: `<timestamp>_<scenario>[_<note>]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// Timestamp layout used as the identity prefix (millisecond precision).
    pub const TIMESTAMP_FORMAT: &'static str = "%Y%m%dT%H%M%S%.3fZ";

    /// Derive the identity of a run from its start time, scenario and note.
    pub fn new(started_at: DateTime<Utc>, scenario_id: &str, note: Option<&str>) -> Self {
        let mut id = format!(
            "{}_{}",
            started_at.format(Self::TIMESTAMP_FORMAT),
            sanitize_component(scenario_id)
        );
        if let Some(slug) = note.map(slugify_note).filter(|slug| !slug.is_empty()) {
            id.push('_');
            id.push_str(&slug);
        }
        Self(id)
    }

    /// Identity as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turn an operator note into a filesystem-safe slug.
///
/// Letters and digits from any script are kept; everything else collapses
/// into single dashes.
pub fn slugify_note(input: &str) -> String {
    let mut slug = String::new();
    let mut previous_dash = false;
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            previous_dash = false;
        } else if !previous_dash && !slug.is_empty() {
            slug.push('-');
            previous_dash = true;
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.') {
                ch
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn run_id_includes_timestamp_scenario_and_note() {
        let id = RunId::new(at(), "node-loss", Some("CHG 4711 / alice"));
        assert_eq!(id.as_str(), "20260314T092653.000Z_node-loss_chg-4711-alice");
    }

    #[test]
    fn run_id_without_note() {
        let id = RunId::new(at(), "node-loss", None);
        assert_eq!(id.as_str(), "20260314T092653.000Z_node-loss");
        let blank = RunId::new(at(), "node-loss", Some("  "));
        assert_eq!(blank, id);
    }

    #[test]
    fn non_ascii_notes_are_kept() {
        let id = RunId::new(at(), "node-loss", Some("值班 张三"));
        assert_eq!(id.as_str(), "20260314T092653.000Z_node-loss_值班-张三");
        assert_eq!(slugify_note("Ärger / Łódź"), "ärger-łódź");
        assert_eq!(slugify_note("../../é"), "é");
    }

    #[test]
    fn scenario_component_is_path_safe() {
        let id = RunId::new(at(), "../etc/passwd", None);
        assert!(!id.as_str().contains('/'));
    }

    #[test]
    fn failed_field_is_omitted_when_absent() {
        let record = RunRecord::new("s", "title", at(), None, true);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("failed").is_none());
        assert_eq!(json["note"], serde_json::Value::Null);
        assert_eq!(json["dry_run"], serde_json::json!(true));
    }
}

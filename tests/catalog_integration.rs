//! ---
//! drill_section: "15-testing-qa-runbook"
//! drill_subsection: "integration-tests"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Validation of the bundled scenario library."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use drill_scenario::{ActionKind, Comparison, ScenarioCatalog, ScenarioDefinition, ScenarioError};
use tempfile::tempdir;

fn library() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("chaos")
        .join("scenarios")
}

#[test]
fn bundled_scenarios_load_sorted_by_id() {
    let catalog = ScenarioCatalog::load_dir(library()).unwrap();
    let ids: Vec<_> = catalog.iter().map(|s| s.id()).collect();
    assert_eq!(ids, ["cache-evict", "db-failover"]);

    let failover = catalog.get("db-failover").unwrap();
    assert_eq!(failover.steps().len(), 3);
    assert_eq!(failover.steps()[0].rollback(), Some("systemctl start postgresql@primary"));
    let guard = failover.steps()[1].expected_slo().unwrap();
    assert_eq!(guard.comparison(), Comparison::AtMost);
    assert_eq!(guard.threshold(), 250.0);

    let evict = catalog.get("cache-evict").unwrap();
    assert_eq!(evict.steps()[1].kind(), ActionKind::CheckMetric);
    assert_eq!(evict.steps()[1].expected_slo().unwrap().threshold(), 0.999);
}

#[test]
fn bundled_scenarios_carry_frontmatter() {
    let path = library().join("db-failover.toml");
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("# ---"), "{} must include frontmatter", path.display());
}

#[test]
fn show_output_reloads_to_same_scenario() {
    let catalog = ScenarioCatalog::load_dir(library()).unwrap();
    let scenario = catalog.get("db-failover").unwrap();
    let rendered = serde_json::to_string_pretty(&ScenarioDefinition::from(scenario)).unwrap();
    let reparsed = ScenarioDefinition::from_json_str(&rendered, "show").unwrap();
    let rebuilt = drill_scenario::ChaosScenario::try_from(reparsed).unwrap();
    assert_eq!(&rebuilt, scenario);
}

#[test]
fn duplicate_ids_across_files_are_rejected() {
    let dir = tempdir().unwrap();
    let source = fs::read_to_string(library().join("cache-evict.json")).unwrap();
    fs::write(dir.path().join("a.json"), &source).unwrap();
    fs::write(dir.path().join("b.json"), &source).unwrap();
    let err = ScenarioCatalog::load_dir(dir.path()).unwrap_err();
    assert!(matches!(err, ScenarioError::DuplicateScenario(id) if id == "cache-evict"));
}

#[test]
fn slo_without_threshold_fails_at_load() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("broken.toml"),
        r#"
        id = "broken"
        title = "Broken"
        description = ""
        impact = ""

        [[steps]]
        id = "probe"
        action = "check-metric"
        query = "up"

        [steps.expected_slo]
        name = "up"
        comparison = ">="
        "#,
    )
    .unwrap();
    let err = ScenarioCatalog::load_dir(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        ScenarioError::MissingField {
            field: "threshold",
            ..
        }
    ));
}

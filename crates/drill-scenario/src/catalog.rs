//! ---
//! drill_section: "02-scenario-model"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario, step and SLO expectation model."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::definition::ScenarioDefinition;
use crate::scenario::ChaosScenario;
use crate::{Result, ScenarioError};

/// Lookup table of validated scenarios keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: BTreeMap<String, ChaosScenario>,
}

impl ScenarioCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already-constructed scenarios.
    pub fn from_scenarios(scenarios: impl IntoIterator<Item = ChaosScenario>) -> Result<Self> {
        let mut catalog = Self::new();
        for scenario in scenarios {
            catalog.insert(scenario)?;
        }
        Ok(catalog)
    }

    /// Load every `*.json` and `*.toml` document directly inside `dir`.
    ///
    /// Any invalid document fails the whole load.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut catalog = Self::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| ScenarioError::Decode {
                path: dir.display().to_string(),
                message: err.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let origin = path.display().to_string();
            let definition = match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => ScenarioDefinition::from_json_str(&fs::read_to_string(path)?, &origin)?,
                Some("toml") => ScenarioDefinition::from_toml_str(&fs::read_to_string(path)?, &origin)?,
                _ => {
                    debug!(path = %origin, "ignoring non-scenario file");
                    continue;
                }
            };
            catalog.insert(ChaosScenario::try_from(definition)?)?;
        }
        info!(dir = %dir.display(), scenarios = catalog.len(), "scenario catalog loaded");
        Ok(catalog)
    }

    /// Add a scenario, rejecting a second scenario with the same id.
    pub fn insert(&mut self, scenario: ChaosScenario) -> Result<()> {
        if self.scenarios.contains_key(scenario.id()) {
            return Err(ScenarioError::DuplicateScenario(scenario.id().to_owned()));
        }
        self.scenarios.insert(scenario.id().to_owned(), scenario);
        Ok(())
    }

    /// Look a scenario up by id.
    pub fn get(&self, id: &str) -> Result<&ChaosScenario> {
        self.scenarios
            .get(id)
            .ok_or_else(|| ScenarioError::NotFound(id.to_owned()))
    }

    /// All scenarios sorted by id.
    pub fn iter(&self) -> impl Iterator<Item = &ChaosScenario> {
        self.scenarios.values()
    }

    /// Number of scenarios.
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the catalog holds no scenarios.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, id: &str) {
        let body = format!(
            r#"{{"id": "{id}", "title": "{id} title", "description": "", "impact": "",
                "steps": [{{"id": "s1", "action": "shell", "command": "true"}}]}}"#
        );
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn lists_scenarios_sorted_by_id() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.json", "zeta");
        write(dir.path(), "b.json", "alpha");
        fs::write(dir.path().join("README.md"), "not a scenario").unwrap();

        let catalog = ScenarioCatalog::load_dir(dir.path()).unwrap();
        let ids: Vec<_> = catalog.iter().map(ChaosScenario::id).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    #[test]
    fn duplicate_ids_across_files_fail() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.json", "same");
        write(dir.path(), "b.json", "same");
        let err = ScenarioCatalog::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ScenarioError::DuplicateScenario(id) if id == "same"));
    }

    #[test]
    fn invalid_document_fails_the_load() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("bad.json"),
            r#"{"id": "bad", "title": "t", "description": "", "impact": "", "steps": []}"#,
        )
        .unwrap();
        let err = ScenarioCatalog::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ScenarioError::EmptyScenario(_)));
    }

    #[test]
    fn missing_scenario_is_not_found() {
        let catalog = ScenarioCatalog::new();
        assert!(matches!(
            catalog.get("nope"),
            Err(ScenarioError::NotFound(id)) if id == "nope"
        ));
    }
}

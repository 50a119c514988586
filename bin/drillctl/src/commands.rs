//! ---
//! drill_section: "06-operator-interfaces"
//! drill_subsection: "binary"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Operator CLI for chaos scenario runs."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use drill_common::config::DrillConfig;
use drill_common::time::human_duration;
use drill_engine::{cancel_pair, ChaosRunner, FailureKind, Replay, RunOptions, StepExecutor};
use drill_metrics::{new_registry, write_textfile, DrillMetrics};
use drill_persistence::RunStore;
use drill_scenario::{ScenarioCatalog, ScenarioDefinition};
use tokio::signal;
use tracing::{info, warn};

use crate::{EXIT_CONFIG, EXIT_OK, EXIT_RUN_FAILED};

fn load_catalog(config: &DrillConfig) -> Result<ScenarioCatalog> {
    ScenarioCatalog::load_dir(&config.scenarios_dir).with_context(|| {
        format!(
            "unable to load scenarios from {}",
            config.scenarios_dir.display()
        )
    })
}

pub fn list(config: &DrillConfig) -> Result<()> {
    let catalog = load_catalog(config)?;
    if catalog.is_empty() {
        println!("no scenarios in {}", config.scenarios_dir.display());
        return Ok(());
    }
    for scenario in catalog.iter() {
        println!(
            "{}\t{}\t{} steps",
            scenario.id(),
            scenario.title(),
            scenario.steps().len()
        );
    }
    Ok(())
}

pub fn show(config: &DrillConfig, id: &str) -> Result<()> {
    let catalog = load_catalog(config)?;
    let scenario = catalog.get(id)?;
    let definition = ScenarioDefinition::from(scenario);
    println!("{}", serde_json::to_string_pretty(&definition)?);
    Ok(())
}

pub async fn run(config: &DrillConfig, id: &str, dry_run: bool, note: Option<String>) -> Result<u8> {
    let catalog = load_catalog(config)?;
    let executor = StepExecutor::from_config(&config.execution, &config.metrics)
        .context("unable to build metric client")?;
    let registry = new_registry();
    let metrics = DrillMetrics::new(registry.clone())?;
    let runner = ChaosRunner::new(catalog, executor, RunStore::new(&config.runs_dir))
        .with_metrics(metrics);

    let (handle, cancel) = cancel_pair();
    let interrupt = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            handle.cancel();
        }
    });

    let started = Instant::now();
    let outcome = runner.run(id, RunOptions { dry_run, note }, &cancel).await;
    let elapsed = human_duration(started.elapsed());
    interrupt.abort();

    if let Some(path) = &config.telemetry.textfile {
        if let Err(err) = write_textfile(&registry, path) {
            warn!(error = %err, "unable to write metrics textfile");
        }
    }

    match outcome {
        Ok(outcome) => {
            info!(run = %outcome.run_id, steps = outcome.record.steps.len(), "run completed");
            println!("run {} completed in {elapsed}", outcome.run_id);
            println!("artifact: {}", outcome.artifact.display());
            Ok(EXIT_OK)
        }
        Err(err) => {
            eprintln!("run failed after {elapsed}: {err}");
            if let Some(artifact) = &err.artifact {
                println!("artifact: {}", artifact.display());
            }
            Ok(match err.kind() {
                FailureKind::Configuration => EXIT_CONFIG,
                _ => EXIT_RUN_FAILED,
            })
        }
    }
}

pub fn replay(path: &Path) -> Result<()> {
    let replay =
        Replay::load(path).with_context(|| format!("unable to load {}", path.display()))?;
    print!("{}", replay.render());
    Ok(())
}

pub fn runs(config: &DrillConfig) -> Result<()> {
    let store = RunStore::new(&config.runs_dir);
    let artifacts = store.list()?;
    if artifacts.is_empty() {
        println!("no runs in {}", store.root().display());
    }
    for artifact in artifacts {
        println!("{}", artifact.display());
    }
    Ok(())
}

//! ---
//! drill_section: "06-operator-interfaces"
//! drill_subsection: "binary"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Operator CLI for chaos scenario runs."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use drill_common::config::DrillConfig;
use drill_common::logging::init_tracing;
use url::Url;

mod commands;

/// Ran cleanly.
const EXIT_OK: u8 = 0;
/// A run started but failed; its artifact holds the reason.
const EXIT_RUN_FAILED: u8 = 1;
/// Configuration or usage error; nothing was executed.
const EXIT_CONFIG: u8 = 2;

#[derive(Debug, Parser)]
#[command(author, version, about = "Drill chaos scenario runner", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "URL", help = "Override the metric query endpoint")]
    metrics_endpoint: Option<Url>,

    #[arg(long, value_name = "DIR", help = "Override the scenario directory")]
    scenarios_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Override the run artifact directory")]
    runs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "List available scenarios")]
    List,
    #[command(about = "Print one scenario definition as JSON")]
    Show {
        #[arg(value_name = "SCENARIO")]
        id: String,
    },
    #[command(about = "Run a scenario")]
    Run {
        #[arg(value_name = "SCENARIO")]
        id: String,
        #[arg(long, help = "Record intended actions without executing shell steps")]
        dry_run: bool,
        #[arg(long, value_name = "TEXT", help = "Operator note stored with the run")]
        note: Option<String>,
    },
    #[command(about = "Render a stored run artifact")]
    Replay {
        #[arg(value_name = "ARTIFACT")]
        path: PathBuf,
    },
    #[command(about = "List stored run artifacts")]
    Runs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_CONFIG)
        }
    }
}

async fn dispatch(cli: Cli) -> Result<u8> {
    let config = load_config(&cli)?;
    init_tracing("drillctl", &config.logging)?;

    match cli.command {
        Commands::List => commands::list(&config)?,
        Commands::Show { id } => commands::show(&config, &id)?,
        Commands::Run { id, dry_run, note } => {
            return commands::run(&config, &id, dry_run, note).await;
        }
        Commands::Replay { path } => commands::replay(&path)?,
        Commands::Runs => commands::runs(&config)?,
    }
    Ok(EXIT_OK)
}

fn load_config(cli: &Cli) -> Result<DrillConfig> {
    let candidates = [PathBuf::from("drill.toml"), PathBuf::from("chaos/drill.toml")];
    let loaded = DrillConfig::load(cli.config.as_deref(), &candidates)
        .context("unable to load configuration")?;
    let mut config = loaded.config;
    if let Some(endpoint) = &cli.metrics_endpoint {
        config.metrics.endpoint = Some(endpoint.clone());
    }
    if let Some(dir) = &cli.scenarios_dir {
        config.scenarios_dir = dir.clone();
    }
    if let Some(dir) = &cli.runs_dir {
        config.runs_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "drillctl",
            "--metrics-endpoint",
            "http://prom:9000/query",
            "--runs-dir",
            "/tmp/runs",
            "run",
            "db-failover",
            "--dry-run",
            "--note",
            "game day",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.runs_dir, PathBuf::from("/tmp/runs"));
        assert!(config.metrics.endpoint.is_some());
        match cli.command {
            Commands::Run { id, dry_run, note } => {
                assert_eq!(id, "db-failover");
                assert!(dry_run);
                assert_eq!(note.as_deref(), Some("game day"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["drillctl", "explode"]).is_err());
    }
}

//! ---
//! drill_section: "01-core-functionality"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Shared primitives and utilities for the core runtime."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_scenarios_dir() -> PathBuf {
    PathBuf::from("chaos/scenarios")
}

fn default_runs_dir() -> PathBuf {
    PathBuf::from("chaos/runs")
}

fn default_query_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_shell() -> String {
    "sh".to_owned()
}

fn default_shell_flag() -> String {
    "-c".to_owned()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for Drill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillConfig {
    #[serde(default = "default_scenarios_dir")]
    pub scenarios_dir: PathBuf,
    #[serde(default = "default_runs_dir")]
    pub runs_dir: PathBuf,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Metadata describing where a [`DrillConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: DrillConfig,
    /// `None` when no file was found and defaults are in effect.
    pub source: Option<PathBuf>,
}

impl DrillConfig {
    pub const ENV_CONFIG_PATH: &'static str = "DRILL_CONFIG";

    /// Load configuration from disk.
    ///
    /// Precedence: `explicit`, then the `DRILL_CONFIG` environment variable,
    /// then the first existing `candidates` entry. Explicit and environment
    /// paths must exist; when no candidate exists the defaults are used.
    pub fn load<P: AsRef<Path>>(explicit: Option<&Path>, candidates: &[P]) -> Result<LoadedConfig> {
        if let Some(path) = explicit {
            return Self::loaded_from(path.to_path_buf());
        }

        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                return Self::loaded_from(PathBuf::from(env_path));
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                return Self::loaded_from(candidate.as_ref().to_path_buf());
            }
        }

        debug!("no configuration file found, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(LoadedConfig {
            config,
            source: None,
        })
    }

    fn loaded_from(path: PathBuf) -> Result<LoadedConfig> {
        let config = Self::from_path(&path)?;
        Ok(LoadedConfig {
            config,
            source: Some(path),
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<Self>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.runs_dir.as_os_str().is_empty() {
            return Err(anyhow!("runs_dir must not be empty"));
        }
        if self.scenarios_dir.as_os_str().is_empty() {
            return Err(anyhow!("scenarios_dir must not be empty"));
        }
        self.metrics.validate()?;
        self.execution.validate()?;
        Ok(())
    }
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            scenarios_dir: default_scenarios_dir(),
            runs_dir: default_runs_dir(),
            metrics: MetricsConfig::default(),
            execution: ExecutionConfig::default(),
            logging: LoggingConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl std::str::FromStr for DrillConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: DrillConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Metric backend used by `check-metric` steps.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Query endpoint; absent means monitoring is not wired up.
    #[serde(default)]
    pub endpoint: Option<Url>,
    #[serde(default = "default_query_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub query_timeout: Duration,
    /// Treat a failing (reachable but erroring) backend as a fatal step error
    /// instead of degrading to `skipped`.
    #[serde(default)]
    pub strict: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            query_timeout: default_query_timeout(),
            strict: false,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.query_timeout.is_zero() {
            return Err(anyhow!("metrics.query_timeout must be greater than zero"));
        }
        if let Some(endpoint) = &self.endpoint {
            if !matches!(endpoint.scheme(), "http" | "https") {
                return Err(anyhow!(
                    "metrics.endpoint must be an http(s) URL, got {}",
                    endpoint
                ));
            }
        }
        Ok(())
    }
}

/// How shell steps are executed.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default = "default_shell_flag")]
    pub shell_flag: String,
    /// Deadline applied to every step; absent means no deadline.
    #[serde(default)]
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub step_timeout: Option<Duration>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            shell_flag: default_shell_flag(),
            step_timeout: None,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shell.trim().is_empty() {
            return Err(anyhow!("execution.shell must not be empty"));
        }
        if self.step_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(anyhow!("execution.step_timeout must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the rolling JSON log; absent disables the file layer.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelemetryConfig {
    /// Prometheus textfile written after each run.
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

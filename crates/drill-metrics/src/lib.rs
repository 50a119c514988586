//! ---
//! drill_section: "05-observability"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Metrics collection and export utilities."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;

/// Shared registry type used across crates.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Render the registry in Prometheus text exposition format.
pub fn render_text(registry: &Registry) -> Result<String> {
    let families = registry.gather();
    TextEncoder::new()
        .encode_to_string(&families)
        .context("failed to encode metrics")
}

/// Write the registry to `path` for the node-exporter textfile collector.
///
/// The file is written next to its destination and renamed into place so the
/// collector never scrapes a half-written file.
pub fn write_textfile(registry: &Registry, path: &Path) -> Result<()> {
    let body = render_text(registry)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("unable to create {}", parent.display()))?;
        }
    }
    let staging = path.with_extension("prom.tmp");
    fs::write(&staging, body)
        .with_context(|| format!("unable to write metrics to {}", staging.display()))?;
    fs::rename(&staging, path)
        .with_context(|| format!("unable to move metrics into {}", path.display()))?;
    info!(path = %path.display(), "metrics textfile written");
    Ok(())
}

/// Metrics published by the scenario runner.
#[derive(Clone)]
pub struct DrillMetrics {
    runs_total: IntCounterVec,
    steps_total: IntCounterVec,
    slo_evaluations_total: IntCounterVec,
    step_duration_seconds: HistogramVec,
}

impl DrillMetrics {
    /// Register the run metric family against the provided registry.
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let runs_total = IntCounterVec::new(
            Opts::new(
                "drill_runs_total",
                "Scenario runs by terminal outcome (finalized or aborted)",
            ),
            &["scenario", "outcome"],
        )?;
        registry.register(Box::new(runs_total.clone()))?;

        let steps_total = IntCounterVec::new(
            Opts::new("drill_steps_total", "Executed scenario steps by action and status"),
            &["action", "status"],
        )?;
        registry.register(Box::new(steps_total.clone()))?;

        let slo_evaluations_total = IntCounterVec::new(
            Opts::new(
                "drill_slo_evaluations_total",
                "SLO guard evaluations by result (met, violated, pending)",
            ),
            &["slo", "status"],
        )?;
        registry.register(Box::new(slo_evaluations_total.clone()))?;

        let buckets = prometheus::exponential_buckets(0.005, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let step_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "drill_step_duration_seconds",
                "Wall-clock duration of step execution",
            )
            .buckets(buckets),
            &["action"],
        )?;
        registry.register(Box::new(step_duration_seconds.clone()))?;

        Ok(Self {
            runs_total,
            steps_total,
            slo_evaluations_total,
            step_duration_seconds,
        })
    }

    /// Count a sealed run.
    pub fn record_run(&self, scenario: &str, outcome: &str) {
        self.runs_total.with_label_values(&[scenario, outcome]).inc();
    }

    /// Count an executed step and observe how long it took.
    pub fn record_step(&self, action: &str, status: &str, elapsed: Duration) {
        self.steps_total.with_label_values(&[action, status]).inc();
        self.step_duration_seconds
            .with_label_values(&[action])
            .observe(elapsed.as_secs_f64());
    }

    /// Count an SLO evaluation.
    pub fn record_slo(&self, slo: &str, status: &str) {
        self.slo_evaluations_total
            .with_label_values(&[slo, status])
            .inc();
    }
}

impl std::fmt::Debug for DrillMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrillMetrics").finish_non_exhaustive()
    }
}

pub use prometheus;

//! ---
//! drill_section: "01-core-functionality"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Shared primitives and utilities for the core runtime."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
//! Shared primitives for the Drill workspace: configuration loading, tracing
//! setup and time helpers consumed by the engine and the CLI.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    DrillConfig, ExecutionConfig, LoadedConfig, LoggingConfig, MetricsConfig, TelemetryConfig,
};
pub use logging::{init_tracing, LogFormat};

//! ---
//! drill_section: "05-observability"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Structured logging adapters and sinks."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;

pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Scenario identifier.
    pub scenario: Option<&'a str>,
    /// Step identifier.
    pub step: Option<&'a str>,
    /// Run identity (artifact stem).
    pub run: Option<&'a str>,
    /// Whether the run suppresses side effects.
    pub dry_run: bool,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a scenario identifier.
    pub fn with_scenario(mut self, scenario: &'a str) -> Self {
        self.scenario = Some(scenario);
        self
    }

    /// Attach a step identifier.
    pub fn with_step(mut self, step: &'a str) -> Self {
        self.step = Some(step);
        self
    }

    /// Attach a run identity.
    pub fn with_run(mut self, run: &'a str) -> Self {
        self.run = Some(run);
        self
    }

    /// Mark the context as a dry run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// High-level outcome used when emitting run lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEventOutcome {
    /// The run or step progressed normally.
    Success,
    /// The run was aborted.
    Fault,
}

impl RunEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            RunEventOutcome::Success => "success",
            RunEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized run lifecycle event (`run.started`, `run.aborted`, ...).
pub fn log_run_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: RunEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    // `tracing::event!` needs a const level, so branch instead of passing one in.
    match outcome {
        RunEventOutcome::Success => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            scenario = ctx.scenario.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            dry_run = ctx.dry_run,
            message = %message
        ),
        RunEventOutcome::Fault => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome.as_str(),
            scenario = ctx.scenario.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            dry_run = ctx.dry_run,
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        let ctx = LogContext::new()
            .with_scenario("node-loss")
            .with_step("stop");
        drill_info!(context = ctx.clone(), "step started");
        drill_warn!("metric backend unconfigured");
        drill_error!(context = ctx, "exit code: {}", 42);
    }

    #[test]
    fn run_event_helper_emits() {
        let ctx = LogContext::new().with_scenario("node-loss").with_dry_run(true);
        log_run_event(Some(&ctx), "run.started", "run started", RunEventOutcome::Success);
        log_run_event(None, "run.aborted", "run aborted", RunEventOutcome::Fault);
    }
}

//! ---
//! drill_section: "05-observability"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Structured logging adapters and sinks."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
/// Emit an informational log enriched with scenario/step/run context.
#[macro_export]
macro_rules! drill_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            scenario = ctx.scenario.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            dry_run = ctx.dry_run,
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::drill_info!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a warning log enriched with scenario/step/run context.
#[macro_export]
macro_rules! drill_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            scenario = ctx.scenario.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            dry_run = ctx.dry_run,
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::drill_warn!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit an error log enriched with scenario/step/run context.
#[macro_export]
macro_rules! drill_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            scenario = ctx.scenario.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            dry_run = ctx.dry_run,
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::drill_error!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

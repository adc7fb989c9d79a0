//! ---
//! lvp_section: "01-logging"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Structured logging adapters and sinks."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

/// Initialize a baseline tracing subscriber suitable for development.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context attached to calculation events.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Project name associated with the log event.
    pub project: Option<&'a str>,
    /// Scenario label associated with the log event.
    pub scenario: Option<&'a str>,
    /// Processing stage (topology, flow, simulation, export).
    pub stage: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a project name.
    pub fn with_project(mut self, project: &'a str) -> Self {
        self.project = Some(project);
        self
    }

    /// Attach a scenario label.
    pub fn with_scenario(mut self, scenario: &'a str) -> Self {
        self.scenario = Some(scenario);
        self
    }

    /// Attach a processing stage.
    pub fn with_stage(mut self, stage: &'a str) -> Self {
        self.stage = Some(stage);
        self
    }
}

/// High-level outcome used when emitting calculation log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcEventOutcome {
    /// The calculation completed successfully.
    Success,
    /// The calculation failed or was aborted.
    Fault,
}

impl CalcEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            CalcEventOutcome::Success => "success",
            CalcEventOutcome::Fault => "fault",
        }
    }

    fn level(&self) -> Level {
        match self {
            CalcEventOutcome::Success => Level::INFO,
            CalcEventOutcome::Fault => Level::ERROR,
        }
    }
}

/// Emit a standardized calculation event with a success/fault outcome.
pub fn log_calc_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: CalcEventOutcome,
) {
    let default_ctx = LogContext::default();
    let ctx = context.unwrap_or(&default_ctx);
    match outcome.level() {
        Level::ERROR => tracing::error!(
            event,
            outcome = outcome.as_str(),
            project = ctx.project.unwrap_or(""),
            scenario = ctx.scenario.unwrap_or(""),
            stage = ctx.stage.unwrap_or(""),
            message = %message
        ),
        _ => tracing::info!(
            event,
            outcome = outcome.as_str(),
            project = ctx.project.unwrap_or(""),
            scenario = ctx.scenario.unwrap_or(""),
            stage = ctx.stage.unwrap_or(""),
            message = %message
        ),
    }
}

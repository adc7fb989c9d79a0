//! ---
//! lvp_section: "03-tooling"
//! lvp_subsection: "binary"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Command-line front end for LV-Plan network studies."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use lvplan_engine::{
    calculate_scenario, calculate_with_simulation, evaluate_project_with_options,
    io::{load_equipment_from_file, load_project_from_file},
    model::Scenario,
};
use lvplan_logging::{self as logging, log_calc_event, CalcEventOutcome, LogContext};

#[derive(Debug, Parser)]
#[command(author, version, about = "LV-Plan network study utility", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScenarioArg {
    Consumption,
    Mixed,
    Production,
    Forced,
}

impl From<ScenarioArg> for Scenario {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::Consumption => Scenario::Consumption,
            ScenarioArg::Mixed => Scenario::Mixed,
            ScenarioArg::Production => Scenario::Production,
            ScenarioArg::Forced => Scenario::Forced,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Evaluate one scenario and print the result as JSON.
    Calc {
        /// Project file (JSON or YAML).
        project: PathBuf,
        #[arg(long, value_enum, default_value = "mixed")]
        scenario: ScenarioArg,
    },
    /// Evaluate one scenario with an equipment file applied on top.
    Simulate {
        /// Project file (JSON or YAML).
        project: PathBuf,
        /// Equipment file (JSON or YAML) describing regulator/compensator.
        equipment: PathBuf,
        #[arg(long, value_enum, default_value = "mixed")]
        scenario: ScenarioArg,
    },
    /// Run the three standard scenarios and export reports.
    Study {
        /// Project file (JSON or YAML).
        project: PathBuf,
        /// Report output directory, `reports/` when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Calc { project, scenario } => {
            let project = load_project_from_file(&project)
                .with_context(|| format!("loading project {}", project.display()))?;
            let scenario: Scenario = scenario.into();
            let ctx = LogContext::new()
                .with_project(&project.name)
                .with_scenario(scenario.label())
                .with_stage("flow");
            let result = match calculate_scenario(&project, scenario) {
                Ok(result) => result,
                Err(error) => {
                    log_calc_event(
                        Some(&ctx),
                        "calc.scenario",
                        &format!("scenario evaluation failed: {error}"),
                        CalcEventOutcome::Fault,
                    );
                    return Err(error.into());
                }
            };
            log_calc_event(
                Some(&ctx),
                "calc.scenario",
                "scenario evaluated",
                CalcEventOutcome::Success,
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Simulate {
            project,
            equipment,
            scenario,
        } => {
            let project = load_project_from_file(&project)
                .with_context(|| format!("loading project {}", project.display()))?;
            let equipment = load_equipment_from_file(&equipment)
                .with_context(|| format!("loading equipment {}", equipment.display()))?;
            let scenario: Scenario = scenario.into();
            let ctx = LogContext::new()
                .with_project(&project.name)
                .with_scenario(scenario.label())
                .with_stage("simulation");
            let result = match calculate_with_simulation(&project, scenario, &equipment) {
                Ok(result) => result,
                Err(error) => {
                    log_calc_event(
                        Some(&ctx),
                        "calc.simulation",
                        &format!("equipment simulation failed: {error}"),
                        CalcEventOutcome::Fault,
                    );
                    return Err(error.into());
                }
            };
            log_calc_event(
                Some(&ctx),
                "calc.simulation",
                "equipment simulation evaluated",
                CalcEventOutcome::Success,
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Study { project, output } => {
            let project = load_project_from_file(&project)
                .with_context(|| format!("loading project {}", project.display()))?;
            let ctx = LogContext::new()
                .with_project(&project.name)
                .with_stage("export");
            let study = match evaluate_project_with_options(&project, output.as_deref()) {
                Ok(study) => study,
                Err(error) => {
                    log_calc_event(
                        Some(&ctx),
                        "calc.study",
                        &format!("study failed: {error}"),
                        CalcEventOutcome::Fault,
                    );
                    return Err(error.into());
                }
            };
            log_calc_event(
                Some(&ctx),
                "calc.study",
                &format!("{} scenarios exported", study.scenarios.len()),
                CalcEventOutcome::Success,
            );
            info!(
                project = %study.project,
                scenarios = study.scenarios.len(),
                "study complete"
            );
        }
    }
    Ok(())
}

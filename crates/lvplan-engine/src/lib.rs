//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Steady-state calculation engine for LV radial distribution networks."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
pub mod api;
pub mod busbar;
pub mod compensator;
pub mod errors;
pub mod flow;
pub mod io;
pub mod model;
pub mod phases;
pub mod regulator;
pub mod reports;
pub mod results;
pub mod simulation;
pub mod topology;

#[cfg(test)]
pub(crate) mod testutil;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    model::{LoadModel, Project, Scenario},
    reports::ReportExporter,
    results::CalculationResult,
    simulation::{EquipmentSet, SimulationResult},
    topology::RadialIndex,
};

pub use errors::{EngineError, Result};

/// One scenario evaluated as a pure function of the project value.
/// Identical inputs yield identical output, there is no hidden state.
pub fn calculate_scenario(project: &Project, scenario: Scenario) -> Result<CalculationResult> {
    let index = RadialIndex::build(project)?;
    solve_with_index(project, &index, scenario)
}

/// One scenario evaluated with the equipment layer on top; the returned
/// result embeds the untouched baseline for comparison.
pub fn calculate_with_simulation(
    project: &Project,
    scenario: Scenario,
    equipment: &EquipmentSet,
) -> Result<SimulationResult> {
    let index = RadialIndex::build(project)?;
    let baseline = solve_with_index(project, &index, scenario)?;
    simulation::simulate(project, &index, scenario, baseline, equipment)
}

fn solve_with_index(
    project: &Project,
    index: &RadialIndex,
    scenario: Scenario,
) -> Result<CalculationResult> {
    match project.load_model {
        LoadModel::Balanced => flow::solve_balanced(project, index, scenario),
        LoadModel::PhaseDistributed => phases::solve_unbalanced(project, index, scenario),
    }
}

/// All standard scenarios of a project, plus the export metadata.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProjectStudy {
    pub timestamp: DateTime<Utc>,
    pub project: String,
    pub scenarios: Vec<CalculationResult>,
}

impl ProjectStudy {
    pub fn exporter(&self) -> ReportExporter<'_> {
        ReportExporter::new(self)
    }

    pub fn scenario(&self, scenario: Scenario) -> Option<&CalculationResult> {
        self.scenarios.iter().find(|r| r.scenario == scenario)
    }
}

/// Runs the three standard scenarios and writes reports to the default
/// `reports/` directory.
///
/// For fallible usage, prefer [`evaluate_project_with_options`].
pub fn evaluate_project(project: &Project) -> ProjectStudy {
    evaluate_project_with_options(project, None)
        .expect("project evaluation should succeed")
}

/// Runs the three standard scenarios with a configurable export
/// directory. When `output_dir` is `None`, `reports/` at the workspace
/// root is used.
pub fn evaluate_project_with_options(
    project: &Project,
    output_dir: Option<&std::path::Path>,
) -> Result<ProjectStudy> {
    let index = RadialIndex::build(project)?;

    let mut scenarios = Vec::with_capacity(Scenario::STANDARD.len());
    for scenario in Scenario::STANDARD {
        info!(scenario = scenario.label(), "evaluating scenario");
        scenarios.push(solve_with_index(project, &index, scenario)?);
    }

    let study = ProjectStudy {
        timestamp: Utc::now(),
        project: project.name.clone(),
        scenarios,
    };

    let default_dir = std::path::Path::new("reports");
    let output_dir = output_dir.unwrap_or(default_dir);
    study.exporter().export_all(output_dir)?;

    Ok(study)
}

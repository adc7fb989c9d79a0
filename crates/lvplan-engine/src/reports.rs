//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Steady-state calculation engine for LV radial distribution networks."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use std::{fs, path::Path};

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{errors::Result, ProjectStudy};

#[derive(Debug)]
pub struct ReportExporter<'a> {
    study: &'a ProjectStudy,
}

impl<'a> ReportExporter<'a> {
    pub fn new(study: &'a ProjectStudy) -> Self {
        Self { study }
    }

    /// One `<scenario>.json` per evaluated scenario plus a `study.json`
    /// index, all wrapped in the common envelope.
    pub fn export_all(&self, output_dir: &Path) -> Result<()> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let timestamp = self.study.timestamp.to_rfc3339();

        for result in &self.study.scenarios {
            let report = ReportEnvelope::new(
                &timestamp,
                &self.study.project,
                scenario_result_schema(),
                result,
            );
            write_json(output_dir.join(format!("{}.json", result.scenario.label())), &report)?;
        }

        let index = StudyIndex {
            project: &self.study.project,
            scenarios: self
                .study
                .scenarios
                .iter()
                .map(|r| ScenarioDigest {
                    scenario: r.scenario.label(),
                    max_drop_percent: r.global.max_drop_percent,
                    total_losses_kw: r.global.total_losses_kw,
                    worst_compliance: format!("{:?}", r.global.compliance),
                })
                .collect(),
        };
        let index_report =
            ReportEnvelope::new(&timestamp, &self.study.project, study_index_schema(), &index);
        write_json(output_dir.join("study.json"), &index_report)?;

        info!("Reports exported to {}", output_dir.display());
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: &'a str,
    project: &'a str,
    schema: serde_json::Value,
    data: &'a T,
}

impl<'a, T: Serialize> ReportEnvelope<'a, T> {
    fn new(timestamp: &'a str, project: &'a str, schema: serde_json::Value, data: &'a T) -> Self {
        Self {
            timestamp,
            project,
            schema,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
struct StudyIndex<'a> {
    project: &'a str,
    scenarios: Vec<ScenarioDigest>,
}

#[derive(Debug, Serialize)]
struct ScenarioDigest {
    scenario: &'static str,
    max_drop_percent: f64,
    total_losses_kw: f64,
    worst_compliance: String,
}

fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn scenario_result_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "ScenarioResult",
        "type": "object",
        "properties": {
            "scenario": {"type": "string"},
            "cables": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "cable_id": {"type": "string", "format": "uuid"},
                        "name": {"type": "string"},
                        "carried_kva": {"type": "number"},
                        "current_a": {"type": "number"},
                        "drop_v": {"type": "number"},
                        "drop_percent": {"type": "number"},
                        "losses_kw": {"type": "number"}
                    },
                    "required": ["cable_id", "carried_kva", "current_a", "drop_v", "losses_kw"]
                }
            },
            "nodes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "node_id": {"type": "string", "format": "uuid"},
                        "name": {"type": "string"},
                        "voltage_v": {"type": "number"},
                        "deviation_percent": {"type": "number"},
                        "compliance": {"type": "string"}
                    },
                    "required": ["node_id", "voltage_v", "deviation_percent", "compliance"]
                }
            },
            "global": {"type": "object"},
            "virtual_busbar": {"type": ["object", "null"]}
        },
        "required": ["scenario", "cables", "nodes", "global"]
    })
}

fn study_index_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "StudyIndex",
        "type": "object",
        "properties": {
            "project": {"type": "string"},
            "scenarios": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "scenario": {"type": "string"},
                        "max_drop_percent": {"type": "number"},
                        "total_losses_kw": {"type": "number"},
                        "worst_compliance": {"type": "string"}
                    },
                    "required": ["scenario", "max_drop_percent", "total_losses_kw"]
                }
            }
        },
        "required": ["project", "scenarios"]
    })
}

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

use crate::{
    errors::{EngineError, Result},
    model::Project,
    simulation::EquipmentSet,
};

pub fn load_project_from_file(path: impl AsRef<Path>) -> Result<Project> {
    let data = fs::read_to_string(path)?;
    let project = if data.trim_start().starts_with('{') {
        serde_json::from_str(&data)?
    } else {
        serde_yaml::from_str(&data).map_err(EngineError::YamlSerializationFailed)?
    };
    Ok(project)
}

pub fn load_equipment_from_file(path: impl AsRef<Path>) -> Result<EquipmentSet> {
    let data = fs::read_to_string(path)?;
    let equipment = if data.trim_start().starts_with('{') {
        serde_json::from_str(&data)?
    } else {
        serde_yaml::from_str(&data).map_err(EngineError::YamlSerializationFailed)?
    };
    Ok(equipment)
}

/// Writes a project as YAML when the extension is `.yaml`/`.yml`, as
/// pretty-printed JSON otherwise.
pub fn save_project_to_file(project: &Project, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let data = if is_yaml {
        serde_yaml::to_string(project).map_err(EngineError::YamlSerializationFailed)?
    } else {
        serde_json::to_string_pretty(project)?
    };
    fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConnectionKind;
    use crate::testutil::{cable_type, two_node_line};

    #[test]
    fn json_round_trip_through_a_file() {
        let project = two_node_line(
            ConnectionKind::Tetra400,
            100.0,
            12.0,
            0.0,
            cable_type(0.32, 0.08),
        )
        .project;
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("project.json");
        save_project_to_file(&project, &path).unwrap();
        let loaded = load_project_from_file(&path).unwrap();
        assert_eq!(loaded.nodes.len(), project.nodes.len());
        assert_eq!(loaded.cables.len(), project.cables.len());
        assert_eq!(loaded.name, project.name);
    }

    #[test]
    fn yaml_is_detected_by_content() {
        let project = two_node_line(
            ConnectionKind::Tri230,
            80.0,
            6.0,
            0.0,
            cable_type(0.6, 0.09),
        )
        .project;
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("project.yaml");
        save_project_to_file(&project, &path).unwrap();
        let loaded = load_project_from_file(&path).unwrap();
        assert_eq!(loaded.nodes.len(), project.nodes.len());
    }

    #[test]
    fn malformed_input_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load_project_from_file(&path).is_err());
    }
}

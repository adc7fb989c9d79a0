//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Calculation result aggregates produced by the solvers."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Scenario;

/// EN 50160 compliance class of a node deviation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComplianceClass {
    Normal,
    Warning,
    Critical,
}

impl ComplianceClass {
    pub const NORMAL_LIMIT_PERCENT: f64 = 8.0;
    pub const WARNING_LIMIT_PERCENT: f64 = 10.0;

    pub fn classify(deviation_percent: f64) -> Self {
        let magnitude = deviation_percent.abs();
        if magnitude <= Self::NORMAL_LIMIT_PERCENT {
            ComplianceClass::Normal
        } else if magnitude <= Self::WARNING_LIMIT_PERCENT {
            ComplianceClass::Warning
        } else {
            ComplianceClass::Critical
        }
    }
}

/// Per-cable outcome of a scenario run. Currents and drops are signed:
/// positive values mean power flowing away from the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CableResult {
    pub cable_id: Uuid,
    pub name: String,
    /// Net apparent power carried toward the downstream subtree.
    pub carried_kva: f64,
    pub current_a: f64,
    pub drop_v: f64,
    pub drop_percent: f64,
    pub losses_kw: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_currents_a: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neutral_current_a: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    pub node_id: Uuid,
    pub name: String,
    /// Line voltage in balanced mode; √3 × mean phase voltage otherwise.
    pub voltage_v: f64,
    /// Signed deviation from the nominal voltage of the connection kind.
    pub deviation_percent: f64,
    pub compliance: ComplianceClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_voltages_v: Option<[f64; 3]>,
}

/// Display-only share of the busbar offset attributed to one circuit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitContribution {
    pub cable_id: Uuid,
    pub net_kva: f64,
    pub share_percent: f64,
    pub offset_v: f64,
}

/// Common voltage offset at the transformer secondary and its breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualBusbarResult {
    /// Effective busbar voltage seen by every departing circuit.
    pub voltage_v: f64,
    /// Signed offset against nominal: negative on net consumption.
    pub offset_v: f64,
    pub net_kva: f64,
    pub current_a: f64,
    pub circuits: Vec<CircuitContribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSummary {
    pub total_loads_kva: f64,
    pub total_productions_kva: f64,
    pub total_losses_kw: f64,
    pub max_drop_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_drop_cable: Option<Uuid>,
    pub compliance: ComplianceClass,
}

/// Complete outcome of one scenario evaluation. Contains no clock or
/// random state so identical inputs serialize identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResult {
    pub scenario: Scenario,
    pub cables: Vec<CableResult>,
    pub nodes: Vec<NodeResult>,
    pub global: GlobalSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_busbar: Option<VirtualBusbarResult>,
}

impl CalculationResult {
    pub fn node(&self, id: Uuid) -> Option<&NodeResult> {
        self.nodes.iter().find(|n| n.node_id == id)
    }

    pub fn cable(&self, id: Uuid) -> Option<&CableResult> {
        self.cables.iter().find(|c| c.cable_id == id)
    }

    /// Recompute the worst-node compliance and worst-cable drop after a
    /// post-processing stage (equipment simulation) adjusted voltages.
    pub fn refresh_global(&mut self) {
        self.global.compliance = self
            .nodes
            .iter()
            .map(|n| n.compliance)
            .max()
            .unwrap_or(ComplianceClass::Normal);
        let worst = self
            .cables
            .iter()
            .max_by(|a, b| {
                a.drop_percent
                    .abs()
                    .total_cmp(&b.drop_percent.abs())
            })
            .map(|c| (c.cable_id, c.drop_percent));
        if let Some((id, drop)) = worst {
            self.global.max_drop_cable = Some(id);
            self.global.max_drop_percent = drop;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_thresholds() {
        assert_eq!(ComplianceClass::classify(0.0), ComplianceClass::Normal);
        assert_eq!(ComplianceClass::classify(-8.0), ComplianceClass::Normal);
        assert_eq!(ComplianceClass::classify(8.5), ComplianceClass::Warning);
        assert_eq!(ComplianceClass::classify(-10.0), ComplianceClass::Warning);
        assert_eq!(ComplianceClass::classify(10.1), ComplianceClass::Critical);
    }

    #[test]
    fn worst_node_wins() {
        assert!(ComplianceClass::Critical > ComplianceClass::Warning);
        assert!(ComplianceClass::Warning > ComplianceClass::Normal);
    }
}

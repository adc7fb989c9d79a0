//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Equipment simulation layered over the baseline radial solution."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use nalgebra::Complex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    compensator::{CompensatorConfig, CompensatorOutput},
    errors::Result,
    flow::sanitize_kva,
    model::{ConnectionKind, Project, Scenario, SQRT3},
    phases::{phase_shares, PHASE_ANGLES},
    regulator::{RegulatorOutput, Srg2Config, Srg2Kind},
    results::{CalculationResult, ComplianceClass},
    topology::RadialIndex,
};

/// Equipment attached to the network by node id. Configs persist across
/// recalculations; device state is derived output only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquipmentSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulator: Option<Srg2Config>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensator: Option<CompensatorConfig>,
}

impl EquipmentSet {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Outcome of a scenario evaluated with equipment, embedding the
/// untouched baseline for comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    #[serde(flatten)]
    pub result: CalculationResult,
    pub baseline: CalculationResult,
    pub is_simulation: bool,
    pub equipment: EquipmentSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulator: Option<RegulatorOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensator: Option<CompensatorOutput>,
}

/// Applies the configured equipment on top of a baseline result. The
/// regulator runs first and shifts the boundary voltage of its subtree;
/// the compensator then sees the regulator-adjusted voltages.
pub fn simulate(
    project: &Project,
    index: &RadialIndex,
    scenario: Scenario,
    baseline: CalculationResult,
    equipment: &EquipmentSet,
) -> Result<SimulationResult> {
    let mut result = baseline.clone();
    let mut regulator_output = None;
    let mut compensator_output = None;

    if let Some(config) = &equipment.regulator {
        if config.enabled {
            regulator_output = apply_regulator(project, index, config, &mut result);
        }
    }

    if let Some(config) = &equipment.compensator {
        if config.enabled {
            compensator_output =
                apply_compensator(project, index, scenario, config, &mut result)?;
        }
    }

    result.refresh_global();

    info!(
        scenario = scenario.label(),
        regulator_active = regulator_output.is_some(),
        compensator_active = compensator_output.is_some(),
        "equipment simulation completed"
    );

    Ok(SimulationResult {
        result,
        baseline,
        is_simulation: true,
        equipment: equipment.clone(),
        regulator: regulator_output,
        compensator: compensator_output,
    })
}

/// Measured entry voltages for the device, in the device's own scale
/// (phase-neutral for the 400 V variant, phase-phase for the 230 V one).
fn regulator_entry_voltages(
    result: &CalculationResult,
    node: Uuid,
    kind: Srg2Kind,
) -> Option<[f64; 3]> {
    let node_result = result.node(node)?;
    if let Some(phases) = node_result.phase_voltages_v {
        let scale = match kind {
            Srg2Kind::PhaseNeutral400 => 1.0,
            Srg2Kind::PhasePhase230 => SQRT3,
        };
        return Some(phases.map(|v| v * scale));
    }
    let scalar = node_result.voltage_v;
    let entry = match kind {
        Srg2Kind::PhaseNeutral400 => scalar / SQRT3,
        Srg2Kind::PhasePhase230 => scalar,
    };
    Some([entry; 3])
}

fn apply_regulator(
    project: &Project,
    index: &RadialIndex,
    config: &Srg2Config,
    result: &mut CalculationResult,
) -> Option<RegulatorOutput> {
    if project.find_node(config.node).is_none() {
        warn!(node = %config.node, "regulator references an unknown node, skipped");
        return None;
    }
    if config.node == index.source {
        warn!(node = %config.node, "regulator on the source node is ignored");
        return None;
    }

    let entries = regulator_entry_voltages(result, config.node, config.kind)?;

    // Aggregate power through the device: the carried power of the cable
    // feeding its node.
    let downstream_net_kva = index
        .parent_of(config.node)
        .and_then(|(cable, _)| result.cable(cable))
        .map(|c| c.carried_kva)
        .unwrap_or(0.0);

    let power_limited = downstream_net_kva > config.consumption_limit_kva
        || -downstream_net_kva > config.injection_limit_kva;

    let mut decisions = entries.map(|entry| config.regulate_phase(entry, None));
    if power_limited {
        for decision in &mut decisions {
            let tap = decision.tap.saturated();
            let coefficient_percent = config.coefficient_percent(tap);
            decision.tap = tap;
            decision.coefficient_percent = coefficient_percent;
            decision.output_voltage_v =
                decision.entry_voltage_v * (1.0 + coefficient_percent / 100.0);
        }
    }

    // Voltage shift in phase-neutral scale, then propagated to the whole
    // downstream subtree as the new boundary condition.
    let entry_scale = match config.kind {
        Srg2Kind::PhaseNeutral400 => 1.0,
        Srg2Kind::PhasePhase230 => SQRT3,
    };
    let delta_phase =
        decisions.map(|d| (d.output_voltage_v - d.entry_voltage_v) / entry_scale);
    let mean_delta_phase = delta_phase.iter().sum::<f64>() / 3.0;

    let node_kinds: std::collections::HashMap<Uuid, ConnectionKind> =
        project.nodes.iter().map(|n| (n.id, n.kind)).collect();
    for subtree_node in index.subtree_nodes(config.node) {
        let kind = node_kinds[&subtree_node];
        if let Some(entry) = result
            .nodes
            .iter_mut()
            .find(|n| n.node_id == subtree_node)
        {
            // Stored phase voltages sit at base/sqrt3_factor, the scalar
            // at the nominal base; both scale off the phase-neutral delta
            // by their ratio to it.
            let phase_scale = kind.phase_voltage_ratio() / kind.sqrt3_factor();
            if let Some(phases) = entry.phase_voltages_v.as_mut() {
                for (voltage, delta) in phases.iter_mut().zip(delta_phase) {
                    *voltage += delta * phase_scale;
                }
            }
            entry.voltage_v += mean_delta_phase * kind.phase_voltage_ratio();
            let nominal = kind.base_voltage();
            entry.deviation_percent = (entry.voltage_v - nominal) / nominal * 100.0;
            entry.compliance = ComplianceClass::classify(entry.deviation_percent);
        }
    }

    Some(RegulatorOutput {
        node: config.node,
        kind: config.kind,
        phases: decisions.to_vec(),
        downstream_net_kva,
        power_limited,
        dwell_s: config.dwell_s,
    })
}

/// Phasor currents feeding the subtree rooted at `node`, rebuilt from
/// the scenario phase assignment.
fn subtree_phase_currents(
    project: &Project,
    index: &RadialIndex,
    scenario: Scenario,
    node: Uuid,
) -> Result<[Complex<f64>; 3]> {
    let shares = phase_shares(project)?;
    let (load_factor, production_factor) = scenario.family_factors(
        project.diversity_loads_percent,
        project.diversity_productions_percent,
    );
    let node_map = project.node_map();

    let mut phase_kva = [0.0; 3];
    for member in index.subtree_nodes(node) {
        let member = node_map[&member];
        let loads = sanitize_kva(member.total_client_kva()) * load_factor;
        let productions =
            sanitize_kva(member.total_production_kva()) * production_factor;
        for phase in 0..3 {
            phase_kva[phase] +=
                loads * shares.loads[phase] - productions * shares.productions[phase];
        }
    }

    let kind = node_map[&node].kind;
    let phase_nominal = kind.base_voltage() / kind.sqrt3_factor();
    let phi = project.cos_phi.clamp(-1.0, 1.0).acos();
    let mut currents = [Complex::new(0.0, 0.0); 3];
    for phase in 0..3 {
        if phase_kva[phase].abs() > f64::EPSILON {
            currents[phase] = Complex::from_polar(
                phase_kva[phase] * 1000.0 / phase_nominal,
                PHASE_ANGLES[phase] - phi,
            );
        }
    }
    Ok(currents)
}

fn apply_compensator(
    project: &Project,
    index: &RadialIndex,
    scenario: Scenario,
    config: &CompensatorConfig,
    result: &mut CalculationResult,
) -> Result<Option<CompensatorOutput>> {
    let Some(node) = project.find_node(config.node) else {
        warn!(node = %config.node, "compensator references an unknown node, skipped");
        return Ok(None);
    };

    let currents = subtree_phase_currents(project, index, scenario, config.node)?;
    let phase_voltages = result
        .node(config.node)
        .map(|n| {
            n.phase_voltages_v.unwrap_or_else(|| {
                let phase = n.voltage_v / node.kind.sqrt3_factor();
                [phase; 3]
            })
        })
        .unwrap_or([node.kind.base_voltage() / node.kind.sqrt3_factor(); 3]);

    let output = config.evaluate(currents, phase_voltages);

    if output.applied_a > 0.0 && output.neutral_before_a > 0.0 {
        let ratio = output.neutral_after_a / output.neutral_before_a;
        // Pull the subtree phase voltages toward their mean in proportion
        // to the compensated share of the neutral current.
        for subtree_node in index.subtree_nodes(config.node) {
            if let Some(entry) = result
                .nodes
                .iter_mut()
                .find(|n| n.node_id == subtree_node)
            {
                if let Some(phases) = entry.phase_voltages_v.as_mut() {
                    let mean = phases.iter().sum::<f64>() / 3.0;
                    for voltage in phases.iter_mut() {
                        *voltage = mean + (*voltage - mean) * ratio;
                    }
                }
            }
        }
        if let Some((cable, _)) = index.parent_of(config.node) {
            if let Some(entry) = result.cables.iter_mut().find(|c| c.cable_id == cable) {
                if entry.neutral_current_a.is_some() {
                    entry.neutral_current_a = Some(output.neutral_after_a);
                }
            }
        }
    }

    Ok(Some(output))
}

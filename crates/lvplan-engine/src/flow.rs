//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Balanced radial power-flow and voltage-drop solver."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use crate::{
    busbar::compute_busbar_effect,
    errors::Result,
    model::{Node, Project, Scenario},
    results::{
        CableResult, CalculationResult, ComplianceClass, GlobalSummary, NodeResult,
        VirtualBusbarResult,
    },
    topology::RadialIndex,
};

/// NaN/Infinity powers degrade to zero current instead of propagating.
pub(crate) fn sanitize_kva(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Signed net apparent power of a node for a scenario, in kVA.
/// Positive means net consumption.
pub(crate) fn node_net_kva(node: &Node, project: &Project, scenario: Scenario) -> f64 {
    let (load_factor, production_factor) = scenario.family_factors(
        project.diversity_loads_percent,
        project.diversity_productions_percent,
    );
    sanitize_kva(node.total_client_kva()) * load_factor
        - sanitize_kva(node.total_production_kva()) * production_factor
}

/// Exact per-node subtree sums computed bottom-up over the reverse BFS
/// order. `sums[node]` includes the node's own net power.
pub(crate) fn subtree_kva(
    index: &RadialIndex,
    net: &HashMap<Uuid, f64>,
) -> HashMap<Uuid, f64> {
    let mut sums: HashMap<Uuid, f64> = HashMap::new();
    for node in index.order.iter().rev() {
        let mut total = net.get(node).copied().unwrap_or(0.0);
        for (_, child) in index.children_of(*node) {
            total += sums.get(child).copied().unwrap_or(0.0);
        }
        sums.insert(*node, total);
    }
    sums
}

/// Source boundary voltage: the node's target voltage when valid,
/// otherwise the nominal voltage of its connection kind.
pub(crate) fn source_base_voltage(source: &Node) -> f64 {
    match source.target_voltage {
        Some(v) if v > 0.0 && v.is_finite() => v,
        _ => source.kind.base_voltage(),
    }
}

/// Busbar coupling for the project transformer, from the subtree powers
/// of the circuits departing the source.
pub(crate) fn busbar_for_project(
    project: &Project,
    index: &RadialIndex,
    sums: &HashMap<Uuid, f64>,
) -> Option<VirtualBusbarResult> {
    let transformer = project.transformer.as_ref()?;
    let circuits: Vec<(Uuid, f64)> = index
        .source_circuits()
        .iter()
        .map(|(cable, head)| (*cable, sums.get(head).copied().unwrap_or(0.0)))
        .collect();
    Some(compute_busbar_effect(
        transformer,
        &circuits,
        transformer.cos_phi,
    ))
}

/// Single forward/backward sweep over the radial tree in balanced mode.
pub fn solve_balanced(
    project: &Project,
    index: &RadialIndex,
    scenario: Scenario,
) -> Result<CalculationResult> {
    let node_map = project.node_map();
    let type_map = project.cable_type_map();

    let net: HashMap<Uuid, f64> = project
        .nodes
        .iter()
        .map(|node| (node.id, node_net_kva(node, project, scenario)))
        .collect();
    let sums = subtree_kva(index, &net);
    let virtual_busbar = busbar_for_project(project, index, &sums);

    let source = node_map[&index.source];
    let base_v = source_base_voltage(source);
    let offset_v = virtual_busbar.as_ref().map(|b| b.offset_v).unwrap_or(0.0);

    // Cumulative per-node drop as a fraction of nominal, so circuits of
    // different connection kinds chain consistently.
    let mut drop_fraction: HashMap<Uuid, f64> = HashMap::new();
    let source_nominal = source.kind.base_voltage();
    drop_fraction.insert(
        index.source,
        (source_nominal - (base_v + offset_v)) / source_nominal,
    );

    let mut cable_rows: HashMap<Uuid, CableResult> = HashMap::new();
    let mut total_losses_kw = 0.0;

    for node_id in &index.order {
        let parent_fraction = drop_fraction[node_id];
        for (cable_id, child_id) in index.children_of(*node_id) {
            let cable = project
                .cables
                .iter()
                .find(|c| c.id == *cable_id)
                .expect("indexed cable exists");
            let cable_type = type_map[&cable.cable_type];
            let child = node_map[child_id];
            let kind = child.kind;

            let carried_kva = sums.get(child_id).copied().unwrap_or(0.0);
            let nominal_v = kind.base_voltage();
            let length_km = index.cable_length_m(*cable_id) / 1000.0;

            let current_a = if carried_kva.abs() > f64::EPSILON {
                carried_kva * 1000.0 / (kind.sqrt3_factor() * nominal_v)
            } else {
                0.0
            };

            let sin_phi = (1.0 - project.cos_phi.powi(2)).max(0.0).sqrt();
            let unit_drop = cable_type.r12_ohm_per_km * project.cos_phi
                + cable_type.x12_ohm_per_km * sin_phi;
            let drop_v = kind.sqrt3_factor() * current_a * unit_drop * length_km;
            let drop_percent = drop_v / nominal_v * 100.0;

            let losses_kw = kind.loss_conductors()
                * current_a.powi(2)
                * cable_type.r12_ohm_per_km
                * length_km
                / 1000.0;
            total_losses_kw += losses_kw;

            drop_fraction.insert(*child_id, parent_fraction + drop_v / nominal_v);

            cable_rows.insert(
                *cable_id,
                CableResult {
                    cable_id: *cable_id,
                    name: cable.name.clone(),
                    carried_kva,
                    current_a,
                    drop_v,
                    drop_percent,
                    losses_kw,
                    phase_currents_a: None,
                    neutral_current_a: None,
                },
            );
        }
    }

    let cables: Vec<CableResult> = project
        .cables
        .iter()
        .filter_map(|c| cable_rows.remove(&c.id))
        .collect();

    let nodes: Vec<NodeResult> = project
        .nodes
        .iter()
        .map(|node| {
            let fraction = drop_fraction.get(&node.id).copied().unwrap_or(0.0);
            let nominal = node.kind.base_voltage();
            let voltage_v = nominal * (1.0 - fraction);
            let deviation_percent = -fraction * 100.0;
            NodeResult {
                node_id: node.id,
                name: node.name.clone(),
                voltage_v,
                deviation_percent,
                compliance: ComplianceClass::classify(deviation_percent),
                phase_voltages_v: None,
            }
        })
        .collect();

    let (load_factor, production_factor) = scenario.family_factors(
        project.diversity_loads_percent,
        project.diversity_productions_percent,
    );
    let total_loads_kva: f64 = project
        .nodes
        .iter()
        .map(|n| sanitize_kva(n.total_client_kva()) * load_factor)
        .sum();
    let total_productions_kva: f64 = project
        .nodes
        .iter()
        .map(|n| sanitize_kva(n.total_production_kva()) * production_factor)
        .sum();

    let mut result = CalculationResult {
        scenario,
        cables,
        nodes,
        global: GlobalSummary {
            total_loads_kva,
            total_productions_kva,
            total_losses_kw,
            max_drop_percent: 0.0,
            max_drop_cable: None,
            compliance: ComplianceClass::Normal,
        },
        virtual_busbar,
    };
    result.refresh_global();

    info!(
        scenario = scenario.label(),
        losses_kw = total_losses_kw,
        max_drop_percent = result.global.max_drop_percent,
        "balanced radial sweep completed"
    );

    Ok(result)
}

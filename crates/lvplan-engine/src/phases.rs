//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Per-phase unbalanced radial solver with neutral-return modelling."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::f64::consts::PI;

use nalgebra::Complex;
use tracing::info;
use uuid::Uuid;

use crate::{
    errors::{EngineError, Result},
    flow::{busbar_for_project, sanitize_kva, source_base_voltage},
    model::{Project, Scenario},
    results::{
        CableResult, CalculationResult, ComplianceClass, GlobalSummary, NodeResult,
    },
    topology::RadialIndex,
};

/// Voltage reference angles of phases A, B, C (120° spaced).
pub(crate) const PHASE_ANGLES: [f64; 3] = [0.0, -2.0 * PI / 3.0, 2.0 * PI / 3.0];

const DISTRIBUTION_SUM_TOLERANCE: f64 = 0.01;

/// Per-family fraction of power assigned to each phase.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PhaseShares {
    pub loads: [f64; 3],
    pub productions: [f64; 3],
}

/// Resolve the phase assignment: manual percentages when configured,
/// otherwise the deterministic imbalance formula where phase A takes
/// `(1 + 2i)/3` of the power and B/C split the remainder equally.
pub(crate) fn phase_shares(project: &Project) -> Result<PhaseShares> {
    if let Some(manual) = &project.manual_distribution {
        let (load_sum, production_sum) = manual.sums();
        if (load_sum - 100.0).abs() > DISTRIBUTION_SUM_TOLERANCE {
            return Err(EngineError::InvalidPhaseDistribution {
                family: "loads",
                sum: load_sum,
            });
        }
        if (production_sum - 100.0).abs() > DISTRIBUTION_SUM_TOLERANCE {
            return Err(EngineError::InvalidPhaseDistribution {
                family: "productions",
                sum: production_sum,
            });
        }
        return Ok(PhaseShares {
            loads: manual.loads_percent.map(|p| p / 100.0),
            productions: manual.productions_percent.map(|p| p / 100.0),
        });
    }

    let imbalance = (project.imbalance_percent.clamp(0.0, 100.0)) / 100.0;
    let a = (1.0 + 2.0 * imbalance) / 3.0;
    let rest = (1.0 - a) / 2.0;
    let shares = [a, rest, rest];
    Ok(PhaseShares {
        loads: shares,
        productions: shares,
    })
}

/// Phase-to-neutral voltage base for a connection kind.
fn phase_base_voltage(line_voltage: f64, sqrt3_factor: f64) -> f64 {
    line_voltage / sqrt3_factor
}

/// Single sweep in phase-distributed mode. Currents are 120°-spaced
/// phasors; the neutral current is the negative vector sum of the three
/// phase currents, and its return path through the zero-sequence loop
/// (`r0`/`x0`) shows up as an additional per-phase drop.
pub fn solve_unbalanced(
    project: &Project,
    index: &RadialIndex,
    scenario: Scenario,
) -> Result<CalculationResult> {
    let node_map = project.node_map();
    let type_map = project.cable_type_map();
    let shares = phase_shares(project)?;

    let (load_factor, production_factor) = scenario.family_factors(
        project.diversity_loads_percent,
        project.diversity_productions_percent,
    );

    // Signed per-phase net power per node, in kVA.
    let mut phase_net: HashMap<Uuid, [f64; 3]> = HashMap::new();
    for node in &project.nodes {
        let loads = sanitize_kva(node.total_client_kva()) * load_factor;
        let productions = sanitize_kva(node.total_production_kva()) * production_factor;
        let mut net = [0.0; 3];
        for phase in 0..3 {
            net[phase] = loads * shares.loads[phase] - productions * shares.productions[phase];
        }
        phase_net.insert(node.id, net);
    }

    // Bottom-up subtree per-phase power sums.
    let mut subtree: HashMap<Uuid, [f64; 3]> = HashMap::new();
    for node in index.order.iter().rev() {
        let mut total = phase_net.get(node).copied().unwrap_or([0.0; 3]);
        for (_, child) in index.children_of(*node) {
            let child_total = subtree.get(child).copied().unwrap_or([0.0; 3]);
            for phase in 0..3 {
                total[phase] += child_total[phase];
            }
        }
        subtree.insert(*node, total);
    }

    let aggregate: HashMap<Uuid, f64> = subtree
        .iter()
        .map(|(id, phases)| (*id, phases.iter().sum()))
        .collect();
    let virtual_busbar = busbar_for_project(project, index, &aggregate);

    let source = node_map[&index.source];
    let base_v = source_base_voltage(source);
    let offset_v = virtual_busbar.as_ref().map(|b| b.offset_v).unwrap_or(0.0);
    let source_nominal = source.kind.base_voltage();

    let phi = project.cos_phi.clamp(-1.0, 1.0).acos();
    let units: [Complex<f64>; 3] =
        PHASE_ANGLES.map(|angle| Complex::from_polar(1.0, angle));

    // Per-phase cumulative drop as a fraction of the phase nominal.
    let mut drop_fraction: HashMap<Uuid, [f64; 3]> = HashMap::new();
    let source_fraction = (source_nominal - (base_v + offset_v)) / source_nominal;
    drop_fraction.insert(index.source, [source_fraction; 3]);

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

            let nominal_line = kind.base_voltage();
            let phase_nominal = phase_base_voltage(nominal_line, kind.sqrt3_factor());
            let length_km = index.cable_length_m(*cable_id) / 1000.0;
            let phase_kva = subtree.get(child_id).copied().unwrap_or([0.0; 3]);

            let mut currents = [Complex::new(0.0, 0.0); 3];
            for phase in 0..3 {
                let s_kva = phase_kva[phase];
                if s_kva.abs() > f64::EPSILON {
                    let magnitude = s_kva * 1000.0 / phase_nominal;
                    currents[phase] =
                        Complex::from_polar(magnitude, PHASE_ANGLES[phase] - phi);
                }
            }
            let phase_sum = currents[0] + currents[1] + currents[2];
            let neutral: Complex<f64> = -phase_sum;

            let z12 = Complex::new(cable_type.r12_ohm_per_km, cable_type.x12_ohm_per_km);
            let z0 = Complex::new(cable_type.r0_ohm_per_km, cable_type.x0_ohm_per_km);

            let mut phase_drops = [0.0; 3];
            let mut fraction = parent_fraction;
            for phase in 0..3 {
                let self_term = (z12 * currents[phase] * units[phase].conj()).re;
                // The return current through the zero-sequence loop shifts
                // the neutral point; projected onto this phase it adds to
                // the phase-to-neutral drop.
                let neutral_term = (z0 * phase_sum * units[phase].conj()).re;
                phase_drops[phase] = (self_term + neutral_term) * length_km;
                fraction[phase] += phase_drops[phase] / phase_nominal;
            }
            drop_fraction.insert(*child_id, fraction);

            let mut losses_kw = 0.0;
            for current in &currents {
                losses_kw += current.norm().powi(2) * cable_type.r12_ohm_per_km * length_km;
            }
            losses_kw += neutral.norm().powi(2) * cable_type.r0_ohm_per_km * length_km;
            losses_kw /= 1000.0;
            total_losses_kw += losses_kw;

            let carried_kva: f64 = phase_kva.iter().sum();
            let mean_drop = phase_drops.iter().sum::<f64>() / 3.0;
            let drop_v = kind.sqrt3_factor() * mean_drop;
            let signed_magnitudes = [0, 1, 2]
                .map(|p| currents[p].norm() * phase_kva[p].signum());
            let current_a = signed_magnitudes.iter().sum::<f64>() / 3.0;

            cable_rows.insert(
                *cable_id,
                CableResult {
                    cable_id: *cable_id,
                    name: cable.name.clone(),
                    carried_kva,
                    current_a,
                    drop_v,
                    drop_percent: drop_v / nominal_line * 100.0,
                    losses_kw,
                    phase_currents_a: Some([
                        currents[0].norm(),
                        currents[1].norm(),
                        currents[2].norm(),
                    ]),
                    neutral_current_a: Some(neutral.norm()),
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
            let fraction = drop_fraction.get(&node.id).copied().unwrap_or([0.0; 3]);
            let nominal_line = node.kind.base_voltage();
            let phase_nominal = phase_base_voltage(nominal_line, node.kind.sqrt3_factor());
            let phase_voltages =
                [0, 1, 2].map(|p| phase_nominal * (1.0 - fraction[p]));
            let mean_fraction = fraction.iter().sum::<f64>() / 3.0;
            let deviation_percent = -mean_fraction * 100.0;
            NodeResult {
                node_id: node.id,
                name: node.name.clone(),
                voltage_v: nominal_line * (1.0 - mean_fraction),
                deviation_percent,
                compliance: ComplianceClass::classify(deviation_percent),
                phase_voltages_v: Some(phase_voltages),
            }
        })
        .collect();

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
        "phase-distributed radial sweep completed"
    );

    Ok(result)
}

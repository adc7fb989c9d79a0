//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Topology and project value model for the LV calculation engine."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const SQRT3: f64 = 1.732_050_807_568_877_2;

/// Planar coordinate used for node placement and cable routing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Electrical connection variant of a node, closed over the
/// {230 V, 400 V} × {single-phase, poly-phase} matrix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    /// 400 V three-phase + neutral (tetrapolar).
    Tetra400,
    /// 230 V three-phase, no neutral (tripolar).
    Tri230,
    /// 230 V single-phase, phase-to-neutral on a 400 V system.
    Mono230PhaseNeutral,
    /// 230 V single-phase, phase-to-phase on a 230 V system.
    Mono230PhasePhase,
}

impl ConnectionKind {
    /// Nominal line voltage for this connection variant.
    pub fn base_voltage(&self) -> f64 {
        match self {
            ConnectionKind::Tetra400 => 400.0,
            ConnectionKind::Tri230
            | ConnectionKind::Mono230PhaseNeutral
            | ConnectionKind::Mono230PhasePhase => 230.0,
        }
    }

    /// Whether the variant carries three phases.
    pub fn is_poly_phase(&self) -> bool {
        matches!(self, ConnectionKind::Tetra400 | ConnectionKind::Tri230)
    }

    /// √3 for poly-phase variants, 1 otherwise. Applied both to the
    /// current division and to the phase-to-line drop conversion.
    pub fn sqrt3_factor(&self) -> f64 {
        if self.is_poly_phase() {
            SQRT3
        } else {
            1.0
        }
    }

    /// Ratio of the nominal voltage to the phase-neutral voltage of the
    /// underlying system: 1 for the phase-neutral single-phase tap, √3
    /// for every phase-phase referenced variant. Line voltages and the
    /// phase-phase mono tap both move by √3 times a phase-neutral shift.
    pub fn phase_voltage_ratio(&self) -> f64 {
        match self {
            ConnectionKind::Mono230PhaseNeutral => 1.0,
            ConnectionKind::Tetra400
            | ConnectionKind::Tri230
            | ConnectionKind::Mono230PhasePhase => SQRT3,
        }
    }

    /// Conductor count entering the Joule-loss term.
    pub fn loss_conductors(&self) -> f64 {
        if self.is_poly_phase() {
            3.0
        } else {
            1.0
        }
    }
}

/// A consumer connection point attached to a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub s_kva: f64,
}

/// A generation unit attached to a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Production {
    pub id: Uuid,
    pub name: String,
    pub s_kva: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub name: String,
    pub position: Position,
    pub kind: ConnectionKind,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub productions: Vec<Production>,
    #[serde(default)]
    pub is_source: bool,
    /// Overrides the nominal voltage at the source node when valid (> 0).
    #[serde(default)]
    pub target_voltage: Option<f64>,
}

impl Node {
    pub fn total_client_kva(&self) -> f64 {
        self.clients.iter().map(|c| c.s_kva).sum()
    }

    pub fn total_production_kva(&self) -> f64 {
        self.productions.iter().map(|p| p.s_kva).sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CableMaterial {
    Copper,
    Aluminium,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InstallationMethod {
    Buried,
    Duct,
    Overhead,
    Facade,
}

/// Immutable cable reference data. `r12`/`x12` describe the direct
/// (positive-sequence) loop, `r0`/`x0` the zero-sequence neutral-return
/// loop used only by the unbalanced solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CableType {
    pub id: Uuid,
    pub name: String,
    pub r12_ohm_per_km: f64,
    pub x12_ohm_per_km: f64,
    pub r0_ohm_per_km: f64,
    pub x0_ohm_per_km: f64,
    pub material: CableMaterial,
    #[serde(default)]
    pub installation_methods: Vec<InstallationMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cable {
    pub id: Uuid,
    pub name: String,
    pub node_a: Uuid,
    pub node_b: Uuid,
    pub cable_type: Uuid,
    /// Routed polyline; geometric length is derived from it. When empty
    /// the straight line between the endpoints is used instead.
    #[serde(default)]
    pub route: Vec<Position>,
}

impl Cable {
    /// Length of the routed polyline in metres, `None` when the cable
    /// has fewer than two route points.
    pub fn route_length_m(&self) -> Option<f64> {
        if self.route.len() < 2 {
            return None;
        }
        Some(
            self.route
                .windows(2)
                .map(|pair| pair[0].distance_to(&pair[1]))
                .sum(),
        )
    }
}

/// Series impedance expressed in ohms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Impedance {
    pub resistance_ohm: f64,
    pub reactance_ohm: f64,
}

impl Impedance {
    pub fn magnitude(&self) -> f64 {
        (self.resistance_ohm.powi(2) + self.reactance_ohm.powi(2)).sqrt()
    }

    /// In-phase component `R·cosφ + X·sinφ` for a given power factor.
    pub fn in_phase_drop(&self, cos_phi: f64) -> f64 {
        let sin_phi = (1.0 - cos_phi.powi(2)).max(0.0).sqrt();
        self.resistance_ohm * cos_phi + self.reactance_ohm * sin_phi
    }
}

/// HV/LV transformer descriptor feeding the busbar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformer {
    pub rated_kva: f64,
    pub rated_voltage: f64,
    pub ucc_percent: f64,
    pub cos_phi: f64,
    /// X/R ratio of the short-circuit impedance; 3.0 assumed when absent.
    #[serde(default)]
    pub xr_ratio: Option<f64>,
}

impl Transformer {
    pub const DEFAULT_XR_RATIO: f64 = 3.0;

    /// Short-circuit series impedance seen from the LV side, derived
    /// from the rating plate: `Z = (ucc/100)·U²/S`.
    pub fn impedance(&self) -> Impedance {
        if self.rated_kva <= 0.0 || self.rated_voltage <= 0.0 || self.ucc_percent <= 0.0 {
            return Impedance {
                resistance_ohm: 0.0,
                reactance_ohm: 0.0,
            };
        }
        let z = (self.ucc_percent / 100.0) * self.rated_voltage.powi(2)
            / (self.rated_kva * 1000.0);
        let ratio = self.xr_ratio.unwrap_or(Self::DEFAULT_XR_RATIO).max(0.0);
        let resistance = z / (1.0 + ratio.powi(2)).sqrt();
        Impedance {
            resistance_ohm: resistance,
            reactance_ohm: resistance * ratio,
        }
    }
}

/// Load model selector for a calculation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LoadModel {
    #[default]
    Balanced,
    PhaseDistributed,
}

/// Manual per-phase split of loads and productions; each triplet is a
/// percentage distribution over phases A/B/C and must sum to 100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhaseDistribution {
    pub loads_percent: [f64; 3],
    pub productions_percent: [f64; 3],
}

impl PhaseDistribution {
    pub fn sums(&self) -> (f64, f64) {
        (
            self.loads_percent.iter().sum(),
            self.productions_percent.iter().sum(),
        )
    }
}

/// Load scenario evaluated by the solver. `Forced` activates both
/// families at their full nominal power, bypassing diversity factors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Scenario {
    Consumption,
    Mixed,
    Production,
    Forced,
}

impl Scenario {
    pub const STANDARD: [Scenario; 3] =
        [Scenario::Consumption, Scenario::Mixed, Scenario::Production];

    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Consumption => "consumption",
            Scenario::Mixed => "mixed",
            Scenario::Production => "production",
            Scenario::Forced => "forced",
        }
    }

    /// Effective (load, production) multipliers for this scenario given
    /// the project diversity factors in percent.
    pub fn family_factors(&self, diversity_loads: f64, diversity_productions: f64) -> (f64, f64) {
        match self {
            Scenario::Consumption => (diversity_loads / 100.0, 0.0),
            Scenario::Mixed => (diversity_loads / 100.0, diversity_productions / 100.0),
            Scenario::Production => (0.0, diversity_productions / 100.0),
            Scenario::Forced => (1.0, 1.0),
        }
    }
}

fn default_cos_phi() -> f64 {
    0.95
}

fn default_diversity_percent() -> f64 {
    100.0
}

/// Complete project handed to the engine by the editing layer. The
/// engine never mutates it; each calculation returns a fresh result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub nodes: Vec<Node>,
    pub cables: Vec<Cable>,
    pub cable_types: Vec<CableType>,
    #[serde(default = "default_cos_phi")]
    pub cos_phi: f64,
    #[serde(default = "default_diversity_percent")]
    pub diversity_loads_percent: f64,
    #[serde(default = "default_diversity_percent")]
    pub diversity_productions_percent: f64,
    #[serde(default)]
    pub load_model: LoadModel,
    #[serde(default)]
    pub imbalance_percent: f64,
    #[serde(default)]
    pub manual_distribution: Option<PhaseDistribution>,
    #[serde(default)]
    pub transformer: Option<Transformer>,
}

impl Project {
    pub fn node_map(&self) -> HashMap<Uuid, &Node> {
        self.nodes.iter().map(|n| (n.id, n)).collect()
    }

    pub fn cable_type_map(&self) -> HashMap<Uuid, &CableType> {
        self.cable_types.iter().map(|t| (t.id, t)).collect()
    }

    pub fn find_node(&self, id: Uuid) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn source_nodes(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.is_source).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_kind_voltages() {
        assert_eq!(ConnectionKind::Tetra400.base_voltage(), 400.0);
        assert_eq!(ConnectionKind::Tri230.base_voltage(), 230.0);
        assert!(ConnectionKind::Tetra400.is_poly_phase());
        assert!(!ConnectionKind::Mono230PhaseNeutral.is_poly_phase());
        assert!((ConnectionKind::Mono230PhasePhase.sqrt3_factor() - 1.0).abs() < 1e-12);
        // The phase-phase mono tap still rides on a phase-phase base.
        assert!((ConnectionKind::Mono230PhasePhase.phase_voltage_ratio() - SQRT3).abs() < 1e-12);
        assert!((ConnectionKind::Mono230PhaseNeutral.phase_voltage_ratio() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn route_length_follows_polyline() {
        let cable = Cable {
            id: Uuid::new_v4(),
            name: "C1".into(),
            node_a: Uuid::new_v4(),
            node_b: Uuid::new_v4(),
            cable_type: Uuid::new_v4(),
            route: vec![
                Position { x: 0.0, y: 0.0 },
                Position { x: 30.0, y: 0.0 },
                Position { x: 30.0, y: 40.0 },
            ],
        };
        assert!((cable.route_length_m().unwrap() - 70.0).abs() < 1e-9);

        let straight = Cable {
            route: Vec::new(),
            ..cable
        };
        assert!(straight.route_length_m().is_none());
    }

    #[test]
    fn transformer_impedance_from_rating_plate() {
        let transformer = Transformer {
            rated_kva: 100.0,
            rated_voltage: 400.0,
            ucc_percent: 4.0,
            cos_phi: 0.95,
            xr_ratio: None,
        };
        let z = transformer.impedance();
        // Z = 0.04 * 400^2 / 100_000 = 0.064 ohm
        assert!((z.magnitude() - 0.064).abs() < 1e-6);
        assert!((z.reactance_ohm / z.resistance_ohm - Transformer::DEFAULT_XR_RATIO).abs() < 1e-9);
    }

    #[test]
    fn scenario_factors_gate_families() {
        let (l, p) = Scenario::Consumption.family_factors(80.0, 90.0);
        assert!((l - 0.8).abs() < 1e-12 && p == 0.0);
        let (l, p) = Scenario::Production.family_factors(80.0, 90.0);
        assert!(l == 0.0 && (p - 0.9).abs() < 1e-12);
        let (l, p) = Scenario::Forced.family_factors(80.0, 90.0);
        assert!((l - 1.0).abs() < 1e-12 && (p - 1.0).abs() < 1e-12);
    }
}

//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Shared builders for solver unit tests."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use uuid::Uuid;

use crate::model::{
    Cable, CableMaterial, CableType, Client, ConnectionKind, LoadModel, Node, Position,
    Production, Project,
};

pub(crate) fn cable_type(r12: f64, x12: f64) -> CableType {
    CableType {
        id: Uuid::new_v4(),
        name: "test type".into(),
        r12_ohm_per_km: r12,
        x12_ohm_per_km: x12,
        r0_ohm_per_km: r12 * 4.0,
        x0_ohm_per_km: x12 * 4.0,
        material: CableMaterial::Aluminium,
        installation_methods: Vec::new(),
    }
}

pub(crate) struct LineBuilder {
    pub project: Project,
}

/// Source plus a single downstream node at `length_m`, with one load and
/// optionally one production attached to the leaf.
pub(crate) fn two_node_line(
    kind: ConnectionKind,
    length_m: f64,
    load_kva: f64,
    production_kva: f64,
    ty: CableType,
) -> LineBuilder {
    let source = Node {
        id: Uuid::new_v4(),
        name: "source".into(),
        position: Position { x: 0.0, y: 0.0 },
        kind,
        clients: Vec::new(),
        productions: Vec::new(),
        is_source: true,
        target_voltage: None,
    };
    let mut leaf = Node {
        id: Uuid::new_v4(),
        name: "leaf".into(),
        position: Position {
            x: length_m,
            y: 0.0,
        },
        kind,
        clients: Vec::new(),
        productions: Vec::new(),
        is_source: false,
        target_voltage: None,
    };
    if load_kva != 0.0 {
        leaf.clients.push(Client {
            id: Uuid::new_v4(),
            name: "load".into(),
            s_kva: load_kva,
        });
    }
    if production_kva != 0.0 {
        leaf.productions.push(Production {
            id: Uuid::new_v4(),
            name: "pv".into(),
            s_kva: production_kva,
        });
    }
    let cable = Cable {
        id: Uuid::new_v4(),
        name: "main".into(),
        node_a: source.id,
        node_b: leaf.id,
        cable_type: ty.id,
        route: Vec::new(),
    };
    LineBuilder {
        project: Project {
            name: "test-line".into(),
            nodes: vec![source, leaf],
            cables: vec![cable],
            cable_types: vec![ty],
            cos_phi: 1.0,
            diversity_loads_percent: 100.0,
            diversity_productions_percent: 100.0,
            load_model: LoadModel::Balanced,
            imbalance_percent: 0.0,
            manual_distribution: None,
            transformer: None,
        },
    }
}

/// Chain of `depth` nodes below the source, each carrying `load_kva`.
pub(crate) fn feeder_chain(
    kind: ConnectionKind,
    depth: usize,
    segment_m: f64,
    load_kva: f64,
    ty: CableType,
) -> Project {
    let mut nodes = vec![Node {
        id: Uuid::new_v4(),
        name: "source".into(),
        position: Position { x: 0.0, y: 0.0 },
        kind,
        clients: Vec::new(),
        productions: Vec::new(),
        is_source: true,
        target_voltage: None,
    }];
    let mut cables = Vec::new();
    for step in 1..=depth {
        let node = Node {
            id: Uuid::new_v4(),
            name: format!("n{step}"),
            position: Position {
                x: segment_m * step as f64,
                y: 0.0,
            },
            kind,
            clients: vec![Client {
                id: Uuid::new_v4(),
                name: format!("load{step}"),
                s_kva: load_kva,
            }],
            productions: Vec::new(),
            is_source: false,
            target_voltage: None,
        };
        cables.push(Cable {
            id: Uuid::new_v4(),
            name: format!("c{step}"),
            node_a: nodes.last().unwrap().id,
            node_b: node.id,
            cable_type: ty.id,
            route: Vec::new(),
        });
        nodes.push(node);
    }
    Project {
        name: "test-feeder".into(),
        nodes,
        cables,
        cable_types: vec![ty],
        cos_phi: 1.0,
        diversity_loads_percent: 100.0,
        diversity_productions_percent: 100.0,
        load_model: LoadModel::Balanced,
        imbalance_percent: 0.0,
        manual_distribution: None,
        transformer: None,
    }
}

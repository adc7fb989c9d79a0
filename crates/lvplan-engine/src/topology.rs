//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Radial topology validation and traversal index."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::{
    graph::{NodeIndex, UnGraph},
    visit::EdgeRef,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    errors::{EngineError, Result},
    model::Project,
};

/// Validated traversal index over a radial project. Construction fails
/// on any `InvalidTopology`-class defect before a calculation starts.
#[derive(Debug, Clone)]
pub struct RadialIndex {
    pub source: Uuid,
    /// Nodes in BFS order from the source; the source comes first.
    pub order: Vec<Uuid>,
    parent: HashMap<Uuid, (Uuid, Uuid)>,
    children: HashMap<Uuid, Vec<(Uuid, Uuid)>>,
    cable_length_m: HashMap<Uuid, f64>,
}

impl RadialIndex {
    pub fn build(project: &Project) -> Result<Self> {
        let sources = project.source_nodes();
        let source = match sources.len() {
            0 => return Err(EngineError::NoSourceNode),
            1 => sources[0].id,
            n => return Err(EngineError::MultipleSourceNodes(n)),
        };

        let node_map = project.node_map();
        let type_map = project.cable_type_map();

        let mut graph = UnGraph::<Uuid, Uuid>::default();
        let mut indices: HashMap<Uuid, NodeIndex> = HashMap::new();
        for node in &project.nodes {
            let index = graph.add_node(node.id);
            indices.insert(node.id, index);
        }

        let mut cable_length_m = HashMap::new();
        for cable in &project.cables {
            for endpoint in [cable.node_a, cable.node_b] {
                if !node_map.contains_key(&endpoint) {
                    return Err(EngineError::UnknownNode {
                        cable: cable.id,
                        node: endpoint,
                    });
                }
            }
            if !type_map.contains_key(&cable.cable_type) {
                return Err(EngineError::UnknownCableType {
                    cable: cable.id,
                    cable_type: cable.cable_type,
                });
            }
            if cable.node_a == cable.node_b {
                return Err(EngineError::CycleDetected { cable: cable.id });
            }
            let length = cable.route_length_m().unwrap_or_else(|| {
                let a = &node_map[&cable.node_a].position;
                let b = &node_map[&cable.node_b].position;
                a.distance_to(b)
            });
            cable_length_m.insert(cable.id, length);
            graph.add_edge(indices[&cable.node_a], indices[&cable.node_b], cable.id);
        }

        let mut order = Vec::with_capacity(project.nodes.len());
        let mut parent: HashMap<Uuid, (Uuid, Uuid)> = HashMap::new();
        let mut children: HashMap<Uuid, Vec<(Uuid, Uuid)>> = HashMap::new();
        let mut visited: HashSet<Uuid> = HashSet::new();

        let mut queue = VecDeque::new();
        queue.push_back(source);
        visited.insert(source);
        while let Some(current) = queue.pop_front() {
            order.push(current);
            let current_idx = indices[&current];
            let parent_cable = parent.get(&current).map(|(cable, _)| *cable);
            for edge in graph.edges(current_idx) {
                let cable_id = *edge.weight();
                if Some(cable_id) == parent_cable {
                    continue;
                }
                let neighbor = graph[edge.target()];
                let neighbor = if neighbor == current {
                    graph[edge.source()]
                } else {
                    neighbor
                };
                if visited.contains(&neighbor) {
                    return Err(EngineError::CycleDetected { cable: cable_id });
                }
                visited.insert(neighbor);
                parent.insert(neighbor, (cable_id, current));
                children
                    .entry(current)
                    .or_default()
                    .push((cable_id, neighbor));
                queue.push_back(neighbor);
            }
        }

        if let Some(node) = project.nodes.iter().find(|n| !visited.contains(&n.id)) {
            return Err(EngineError::UnreachableNode(node.id));
        }

        debug!(
            nodes = order.len(),
            cables = cable_length_m.len(),
            "radial index built"
        );

        Ok(Self {
            source,
            order,
            parent,
            children,
            cable_length_m,
        })
    }

    /// Cable and node immediately upstream of `node`; `None` for the source.
    pub fn parent_of(&self, node: Uuid) -> Option<(Uuid, Uuid)> {
        self.parent.get(&node).copied()
    }

    pub fn children_of(&self, node: Uuid) -> &[(Uuid, Uuid)] {
        self.children.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cable_length_m(&self, cable: Uuid) -> f64 {
        self.cable_length_m.get(&cable).copied().unwrap_or(0.0)
    }

    /// The circuits departing from the source busbar, as (cable, head node).
    pub fn source_circuits(&self) -> &[(Uuid, Uuid)] {
        self.children_of(self.source)
    }

    /// All nodes of the subtree rooted at `root`, including `root`.
    pub fn subtree_nodes(&self, root: Uuid) -> Vec<Uuid> {
        let mut nodes = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            nodes.push(current);
            for (_, child) in self.children_of(current) {
                stack.push(*child);
            }
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Cable, CableMaterial, CableType, ConnectionKind, Node, Position, Project,
    };

    fn node(name: &str, x: f64, is_source: bool) -> Node {
        Node {
            id: Uuid::new_v4(),
            name: name.into(),
            position: Position { x, y: 0.0 },
            kind: ConnectionKind::Tetra400,
            clients: Vec::new(),
            productions: Vec::new(),
            is_source,
            target_voltage: None,
        }
    }

    fn cable_type() -> CableType {
        CableType {
            id: Uuid::new_v4(),
            name: "150 Al".into(),
            r12_ohm_per_km: 0.2,
            x12_ohm_per_km: 0.08,
            r0_ohm_per_km: 0.8,
            x0_ohm_per_km: 0.32,
            material: CableMaterial::Aluminium,
            installation_methods: Vec::new(),
        }
    }

    fn link(a: &Node, b: &Node, ty: &CableType) -> Cable {
        Cable {
            id: Uuid::new_v4(),
            name: format!("{}-{}", a.name, b.name),
            node_a: a.id,
            node_b: b.id,
            cable_type: ty.id,
            route: Vec::new(),
        }
    }

    fn project(nodes: Vec<Node>, cables: Vec<Cable>, ty: CableType) -> Project {
        Project {
            name: "topology-test".into(),
            nodes,
            cables,
            cable_types: vec![ty],
            cos_phi: 1.0,
            diversity_loads_percent: 100.0,
            diversity_productions_percent: 100.0,
            load_model: Default::default(),
            imbalance_percent: 0.0,
            manual_distribution: None,
            transformer: None,
        }
    }

    #[test]
    fn builds_bfs_order_from_source() {
        let ty = cable_type();
        let source = node("S", 0.0, true);
        let a = node("A", 100.0, false);
        let b = node("B", 200.0, false);
        let cables = vec![link(&source, &a, &ty), link(&a, &b, &ty)];
        let project = project(vec![source.clone(), a.clone(), b.clone()], cables, ty);

        let index = RadialIndex::build(&project).unwrap();
        assert_eq!(index.source, source.id);
        assert_eq!(index.order[0], source.id);
        assert_eq!(index.order.len(), 3);
        assert_eq!(index.parent_of(b.id).unwrap().1, a.id);
        assert_eq!(index.subtree_nodes(a.id).len(), 2);
        // Straight-line fallback length between node positions.
        let (cable_sa, _) = index.source_circuits()[0];
        assert!((index.cable_length_m(cable_sa) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_missing_and_duplicate_sources() {
        let ty = cable_type();
        let a = node("A", 0.0, false);
        let b = node("B", 50.0, false);
        let cables = vec![link(&a, &b, &ty)];
        let p = project(vec![a.clone(), b.clone()], cables.clone(), ty.clone());
        assert!(matches!(
            RadialIndex::build(&p),
            Err(EngineError::NoSourceNode)
        ));

        let mut a2 = a;
        let mut b2 = b;
        a2.is_source = true;
        b2.is_source = true;
        let p = project(vec![a2, b2], cables, ty);
        assert!(matches!(
            RadialIndex::build(&p),
            Err(EngineError::MultipleSourceNodes(2))
        ));
    }

    #[test]
    fn rejects_loops() {
        let ty = cable_type();
        let source = node("S", 0.0, true);
        let a = node("A", 100.0, false);
        let b = node("B", 200.0, false);
        let cables = vec![
            link(&source, &a, &ty),
            link(&a, &b, &ty),
            link(&b, &source, &ty),
        ];
        let p = project(vec![source, a, b], cables, ty);
        assert!(matches!(
            RadialIndex::build(&p),
            Err(EngineError::CycleDetected { .. })
        ));
    }

    #[test]
    fn rejects_dangling_references_and_islands() {
        let ty = cable_type();
        let source = node("S", 0.0, true);
        let a = node("A", 100.0, false);
        let island = node("X", 500.0, false);
        let mut bad = link(&source, &a, &ty);
        bad.node_b = Uuid::new_v4();
        let p = project(
            vec![source.clone(), a.clone()],
            vec![bad],
            ty.clone(),
        );
        assert!(matches!(
            RadialIndex::build(&p),
            Err(EngineError::UnknownNode { .. })
        ));

        let p = project(
            vec![source.clone(), a.clone(), island.clone()],
            vec![link(&source, &a, &ty)],
            ty,
        );
        match RadialIndex::build(&p) {
            Err(EngineError::UnreachableNode(id)) => assert_eq!(id, island.id),
            other => panic!("expected unreachable node, got {other:?}"),
        }
    }
}

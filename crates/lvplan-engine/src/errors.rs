//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Error taxonomy for the LV calculation engine."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("project has no source node")]
    NoSourceNode,
    #[error("project has {0} source nodes, expected exactly one")]
    MultipleSourceNodes(usize),
    #[error("cable {cable} references unknown node {node}")]
    UnknownNode { cable: Uuid, node: Uuid },
    #[error("cable {cable} references unknown cable type {cable_type}")]
    UnknownCableType { cable: Uuid, cable_type: Uuid },
    #[error("cable {cable} closes a loop; the network must stay radial")]
    CycleDetected { cable: Uuid },
    #[error("node {0} is not reachable from the source")]
    UnreachableNode(Uuid),
    #[error("manual phase distribution for {family} sums to {sum:.1}%, expected 100%")]
    InvalidPhaseDistribution { family: &'static str, sum: f64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    YamlSerializationFailed(#[from] serde_yaml::Error),
}

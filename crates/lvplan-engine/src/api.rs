//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Steady-state calculation engine for LV radial distribution networks."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use crate::{
    model::{Project, Scenario},
    simulation::EquipmentSet,
};

#[cfg(feature = "rest-api")]
pub use rest::router;

#[cfg(feature = "rest-api")]
mod rest {
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use std::sync::Arc;

    use crate::{calculate_scenario, calculate_with_simulation, errors::EngineError};

    use super::{ScenarioRequest, SimulationRequest};

    #[derive(Clone, Default)]
    pub struct EngineState;

    pub fn router() -> Router {
        Router::new()
            .route("/api/lv/scenario", post(scenario))
            .route("/api/lv/simulation", post(simulation))
            .with_state(Arc::new(EngineState))
    }

    async fn scenario(
        State(_): State<Arc<EngineState>>,
        Json(payload): Json<ScenarioRequest>,
    ) -> Result<Json<crate::results::CalculationResult>, StatusCode> {
        calculate_scenario(&payload.project, payload.scenario)
            .map(Json)
            .map_err(map_err)
    }

    async fn simulation(
        State(_): State<Arc<EngineState>>,
        Json(payload): Json<SimulationRequest>,
    ) -> Result<Json<crate::simulation::SimulationResult>, StatusCode> {
        calculate_with_simulation(&payload.project, payload.scenario, &payload.equipment)
            .map(Json)
            .map_err(map_err)
    }

    fn map_err(err: EngineError) -> StatusCode {
        match err {
            EngineError::NoSourceNode
            | EngineError::MultipleSourceNodes(_)
            | EngineError::UnknownNode { .. }
            | EngineError::UnknownCableType { .. }
            | EngineError::CycleDetected { .. }
            | EngineError::UnreachableNode(_)
            | EngineError::InvalidPhaseDistribution { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScenarioRequest {
    pub project: Project,
    pub scenario: Scenario,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SimulationRequest {
    pub project: Project,
    pub scenario: Scenario,
    #[serde(default)]
    pub equipment: EquipmentSet,
}

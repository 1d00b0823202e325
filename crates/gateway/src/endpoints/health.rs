//! # GET /health

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use verus_request_types::HealthResponse;

use crate::config::GatewayState;

/// GET /health: 稼働確認と、署名に使うシステムの情報。
pub async fn handle_health(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        system_id: state.system_id.to_string(),
        testnet: state.testnet,
    })
}

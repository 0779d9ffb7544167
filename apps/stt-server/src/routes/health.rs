use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub version: String,
	pub queue_worker_enabled: bool,
	pub max_concurrency: usize,
}

/// Liveness check. The process refuses to boot when Redis is unreachable, so
/// a responding server is a connected one.
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "healthy",
		version: state.config.api_version.clone(),
		queue_worker_enabled: state.config.queue_worker_enabled,
		max_concurrency: state.gate.capacity(),
	})
}

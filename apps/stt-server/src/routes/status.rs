use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use stt_queue::IntakeError;

#[derive(Debug, Serialize)]
pub struct QueueStatus {
	pub max_concurrency: usize,
	pub available_slots: usize,
	pub requests_in_queue: usize,
	pub active_requests: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueSize {
	pub requests_in_queue: usize,
}

/// Gate and pending-counter snapshot. Reads nothing under the gate.
pub async fn queue_status(State(state): State<SharedState>) -> Json<QueueStatus> {
	Json(QueueStatus {
		max_concurrency: state.gate.capacity(),
		available_slots: state.gate.available_slots(),
		requests_in_queue: state.pending.current(),
		active_requests: state.gate.active(),
	})
}

pub async fn queue_size(State(state): State<SharedState>) -> Json<QueueSize> {
	Json(QueueSize {
		requests_in_queue: state.pending.current(),
	})
}

/// Prometheus text exposition of the intake counters.
pub async fn metrics(State(state): State<SharedState>) -> Result<String, IntakeError> {
	let encoder = TextEncoder::new();
	let mut buffer = Vec::new();
	encoder
		.encode(&state.metrics.registry.gather(), &mut buffer)
		.map_err(|e| IntakeError::InternalError(format!("Failed to encode metrics: {e}")))?;
	String::from_utf8(buffer).map_err(|e| IntakeError::InternalError(format!("Metrics buffer was not UTF-8: {e}")))
}

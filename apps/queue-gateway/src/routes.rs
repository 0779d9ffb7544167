use crate::config::Config;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use stt_queue::job::{QueueEnvelope, TranscriptionRequest};
use stt_queue::queue::{QueueTransport, RedisJobQueue};
use stt_queue::IntakeError;
use tracing::info;
use uuid::Uuid;

pub struct GatewayState {
	pub config: Config,
	pub queue: RedisJobQueue,
}

pub type SharedState = Arc<GatewayState>;

/// Response returned after enqueuing a transcription job.
#[derive(Debug, Serialize)]
pub struct JobSubmissionResponse {
	pub job_id: String,
	pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub autoscaler_enabled: bool,
	pub queue_idle_timeout: u64,
}

#[derive(Debug, Serialize)]
pub struct QueueSizeResponse {
	pub queue_size: usize,
}

pub fn router(state: SharedState) -> Router {
	Router::new()
		.route("/jobs", post(submit_job))
		.route("/health", get(health))
		.route("/queue_size", get(queue_size))
		.with_state(state)
}

/// Accept a transcription request and push it onto the durable queue.
pub async fn submit_job(State(state): State<SharedState>, Json(body): Json<TranscriptionRequest>) -> Result<Json<JobSubmissionResponse>, IntakeError> {
	body.validate()?;

	let job_id = Uuid::new_v4().to_string();
	let envelope = QueueEnvelope {
		job_id: job_id.clone(),
		request: body,
	};
	state.queue.push(serde_json::to_string(&envelope)?).await.map_err(|e| {
		tracing::error!(job_id, error = %e, "Failed to enqueue job");
		IntakeError::QueueError("Failed to enqueue job".to_string())
	})?;

	info!(job_id, "Queued job");
	Ok(Json(JobSubmissionResponse { job_id, status: "queued" }))
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok",
		autoscaler_enabled: state.config.autoscaler_enabled,
		queue_idle_timeout: state.config.queue_idle_timeout_secs,
	})
}

pub async fn queue_size(State(state): State<SharedState>) -> Result<Json<QueueSizeResponse>, IntakeError> {
	let queue_size = state.queue.len().await?;
	Ok(Json(QueueSizeResponse { queue_size }))
}

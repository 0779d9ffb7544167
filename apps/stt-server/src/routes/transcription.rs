use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use stt_queue::job::{QueueEnvelope, TranscriptionRequest, TranscriptionResponse};
use stt_queue::queue::QueueTransport;
use stt_queue::IntakeError;
use tracing::info;
use uuid::Uuid;

/// Acknowledgement for an asynchronous submission.
#[derive(Debug, Serialize)]
pub struct JobAccepted {
	pub status: &'static str,
	pub job_id: String,
	pub queue_position: usize,
}

/// Synchronous transcription. Waits for a gate slot, then runs the full
/// pipeline inline. Shares the compute budget with the batch path.
pub async fn transcribe(State(state): State<SharedState>, Json(body): Json<TranscriptionRequest>) -> Result<Json<TranscriptionResponse>, IntakeError> {
	body.validate()?;

	let pending_slot = state.pending.guard();
	let _permit = state.gate.acquire().await?;
	drop(pending_slot);

	match state.service.process(&body).await {
		Ok(response) => {
			state.metrics.jobs_processed.inc();
			Ok(Json(response))
		}
		Err(e) => {
			state.metrics.job_errors.inc();
			Err(e)
		}
	}
}

/// Asynchronous submission: push onto the durable queue and acknowledge
/// immediately. The result, if anything, arrives via the dispatcher.
pub async fn transcribe_async(State(state): State<SharedState>, Json(body): Json<TranscriptionRequest>) -> Result<Json<JobAccepted>, IntakeError> {
	body.validate()?;

	let job_id = Uuid::new_v4().to_string();
	let envelope = QueueEnvelope {
		job_id: job_id.clone(),
		request: body,
	};
	state.queue.push(serde_json::to_string(&envelope)?).await?;

	let queue_position = state.pending.increment();
	info!(job_id, queue_position, "Queued job");

	Ok(Json(JobAccepted {
		status: "accepted",
		job_id,
		queue_position,
	}))
}

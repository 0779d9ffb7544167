pub mod health;
pub mod languages;
pub mod status;
pub mod transcription;

use crate::state::SharedState;
use axum::routing::{get, post};
use axum::Router;

pub fn router(state: SharedState) -> Router {
	Router::new()
		.route("/", get(health::health))
		.route("/health", get(health::health))
		.route("/ping", get(health::health))
		.route("/api/v1/transcribe", post(transcription::transcribe))
		.route("/api/v1/transcribe_async", post(transcription::transcribe_async))
		.route("/api/v1/languages", get(languages::list))
		.route("/queue_status", get(status::queue_status))
		.route("/queue_size", get(status::queue_size))
		.route("/metrics", get(status::metrics))
		.with_state(state)
}

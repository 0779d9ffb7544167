use crate::error::IntakeError;
use crate::job::TranscriptionResponse;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

/// Delivers finished results to a job's dispatcher endpoint.
///
/// Delivery is best-effort: failure is logged and the job outcome stands.
/// There is no retry and no second chance to poll for the result.
pub struct ResultDispatcher {
	http: reqwest::Client,
}

impl ResultDispatcher {
	/// # Errors
	/// Returns an error when the HTTP client cannot be constructed.
	pub fn new(timeout: Duration) -> Result<Self, IntakeError> {
		let http = reqwest::Client::builder().timeout(timeout).build()?;
		Ok(Self { http })
	}

	/// POST the result, wrapped as `{"data": <result>}`, to the dispatcher.
	pub async fn deliver(&self, endpoint: &str, response: &TranscriptionResponse) {
		let url = format!("{}/transcribtion/data", endpoint.trim_end_matches('/'));
		info!(url, "Sending results to dispatcher");

		match self.http.post(&url).json(&json!({ "data": response })).send().await {
			Ok(reply) if reply.status().is_success() => {
				info!("Results sent to dispatcher successfully");
			}
			Ok(reply) => {
				error!(status = %reply.status(), url, "Dispatcher rejected result delivery");
			}
			Err(e) => {
				error!(error = %e, url, "Failed to send results to dispatcher");
			}
		}
	}
}

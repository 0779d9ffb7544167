use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use stt_queue::autoscale::PodController;
use stt_queue::IntakeError;
use tracing::info;

const POD_STOP_MUTATION: &str = "mutation podStop($podId: String!) {\n  podStop(podId: $podId) {\n    id\n    status\n    message\n  }\n}\n";
const POD_RESUME_MUTATION: &str = "mutation podResume($podId: String!) {\n  podResume(podId: $podId) {\n    id\n    status\n    message\n  }\n}\n";

/// RunPod control-plane client: starts and stops one pod over GraphQL.
pub struct RunPodClient {
	http: reqwest::Client,
	api_url: String,
	api_key: String,
	pod_id: String,
}

impl RunPodClient {
	/// # Errors
	/// Returns an error when the HTTP client cannot be constructed.
	pub fn new(api_url: &str, api_key: &str, pod_id: &str, timeout: Duration) -> Result<Self, IntakeError> {
		let http = reqwest::Client::builder().timeout(timeout).build()?;
		Ok(Self {
			http,
			api_url: api_url.to_string(),
			api_key: api_key.to_string(),
			pod_id: pod_id.to_string(),
		})
	}

	async fn mutate(&self, mutation: &str) -> Result<Value, IntakeError> {
		let payload = json!({
			"query": mutation,
			"variables": { "podId": self.pod_id },
		});

		let body: Value = self
			.http
			.post(&self.api_url)
			.bearer_auth(&self.api_key)
			.json(&payload)
			.send()
			.await
			.and_then(reqwest::Response::error_for_status)
			.map_err(|e| IntakeError::BackendError(format!("RunPod control call failed: {e}")))?
			.json()
			.await?;

		if let Some(errors) = body.get("errors").and_then(Value::as_array) {
			if !errors.is_empty() {
				return Err(IntakeError::BackendError(format!("RunPod control call rejected: {errors:?}")));
			}
		}
		Ok(body)
	}
}

#[async_trait]
impl PodController for RunPodClient {
	async fn start(&self) -> Result<(), IntakeError> {
		let body = self.mutate(POD_RESUME_MUTATION).await?;
		info!(pod_id = %self.pod_id, response = %body, "RunPod start response");
		Ok(())
	}

	async fn stop(&self) -> Result<(), IntakeError> {
		let body = self.mutate(POD_STOP_MUTATION).await?;
		info!(pod_id = %self.pod_id, response = %body, "RunPod shutdown response");
		Ok(())
	}
}

use crate::error::IntakeError;
use crate::job::{Job, TranscriptionRequest};
use crate::queue::QueueTransport;
use serde_json::Value;
use std::time::Duration;
use tracing::error;

/// Drains the durable queue, validating payloads at the boundary.
///
/// A malformed payload is logged and discarded; it never halts consumption of
/// the items behind it. Connectivity failures are surfaced to the caller:
/// the transport retries, the consumer does not.
pub struct JobConsumer<T: QueueTransport> {
	transport: T,
}

impl<T: QueueTransport> JobConsumer<T> {
	pub const fn new(transport: T) -> Self {
		Self { transport }
	}

	pub const fn transport(&self) -> &T {
		&self.transport
	}

	/// Wait up to `timeout` for the next valid job; `None` on timeout.
	///
	/// # Errors
	/// Returns an error when the queue transport is unreachable.
	pub async fn next_job(&self, timeout: Duration) -> Result<Option<Job>, IntakeError> {
		loop {
			let Some(payload) = self.transport.pop_blocking(timeout).await? else {
				return Ok(None);
			};
			match decode_payload(&payload) {
				Ok(job) => return Ok(Some(job)),
				Err(e) => {
					error!(error = %e, "Invalid job payload received from queue; discarding");
				}
			}
		}
	}

	/// Pop the next valid job without waiting; `None` when the queue is empty.
	///
	/// # Errors
	/// Returns an error when the queue transport is unreachable.
	pub async fn poll_job(&self) -> Result<Option<Job>, IntakeError> {
		loop {
			let Some(payload) = self.transport.pop_now().await? else {
				return Ok(None);
			};
			match decode_payload(&payload) {
				Ok(job) => return Ok(Some(job)),
				Err(e) => {
					error!(error = %e, "Invalid job payload received from queue; discarding");
				}
			}
		}
	}
}

/// Decode one queue entry into a validated [`Job`].
///
/// Accepts the standard `{"job_id", "request"}` envelope; a bare request
/// object is tolerated and assigned an unknown id, matching what producers
/// historically pushed.
///
/// # Errors
/// Returns [`IntakeError`] on malformed JSON or schema violations.
pub fn decode_payload(payload: &str) -> Result<Job, IntakeError> {
	let value: Value = serde_json::from_str(payload)?;

	let job_id = value.get("job_id").and_then(Value::as_str).unwrap_or("<unknown>").to_string();
	let request_value = value.get("request").cloned().unwrap_or(value);

	let request: TranscriptionRequest = serde_json::from_value(request_value)?;
	request.validate()?;

	Ok(Job::new(job_id, request))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::queue::test_support::InMemoryQueue;

	fn envelope(job_id: &str) -> String {
		format!(r#"{{"job_id": "{job_id}", "request": {{"audio_url": "https://example.com/{job_id}.mp3"}}}}"#)
	}

	#[tokio::test]
	async fn test_decodes_standard_envelope() {
		let job = decode_payload(&envelope("j-1")).unwrap();
		assert_eq!(job.id, "j-1");
		assert_eq!(job.request.audio_url.as_deref(), Some("https://example.com/j-1.mp3"));
	}

	#[tokio::test]
	async fn test_bare_request_gets_unknown_id() {
		let job = decode_payload(r#"{"audio_url": "https://example.com/a.mp3"}"#).unwrap();
		assert_eq!(job.id, "<unknown>");
	}

	#[tokio::test]
	async fn test_schema_violation_rejected() {
		// No audio source at all.
		assert!(decode_payload(r#"{"job_id": "j-1", "request": {"language": "en"}}"#).is_err());
	}

	#[tokio::test]
	async fn test_malformed_payload_does_not_block_next_valid_one() {
		let queue = InMemoryQueue::new();
		queue.preload(["{not json".to_string(), envelope("j-2")]).await;

		let consumer = JobConsumer::new(queue);
		let job = consumer.next_job(Duration::from_secs(1)).await.unwrap();
		assert_eq!(job.unwrap().id, "j-2");
	}

	#[tokio::test(start_paused = true)]
	async fn test_empty_queue_times_out_with_none() {
		let consumer = JobConsumer::new(InMemoryQueue::new());
		let job = consumer.next_job(Duration::from_secs(5)).await.unwrap();
		assert!(job.is_none());
	}

	#[tokio::test]
	async fn test_poll_skips_malformed_and_returns_valid() {
		let queue = InMemoryQueue::new();
		queue.preload(["42".to_string(), envelope("j-3")]).await;

		let consumer = JobConsumer::new(queue);
		let job = consumer.poll_job().await.unwrap();
		assert_eq!(job.unwrap().id, "j-3");
		assert!(consumer.poll_job().await.unwrap().is_none());
	}
}

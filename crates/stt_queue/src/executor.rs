use crate::backend::SpeechBackend;
use crate::error::IntakeError;
use crate::fetch::{MediaPreparer, PreparedMedia};
use crate::gate::AdmissionGate;
use crate::job::{Job, TranscriptionResponse};
use crate::pending::PendingCounter;
use crate::service::TranscriptionService;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// Result slot for one job of a batch, in assembly order.
pub struct JobOutcome {
	pub job_id: String,
	pub result: Result<TranscriptionResponse, IntakeError>,
}

/// Two-phase batch execution: parallel I/O preparation, then sequential
/// compute behind a single gate slot held for the whole batch.
///
/// One slot per batch keeps the compute backend running back-to-back with no
/// idle gaps between jobs. Preparation is bounded by its own small worker
/// pool; it is network-bound, not compute-bound, so it does not draw from
/// the gate budget.
pub struct BatchExecutor<P: MediaPreparer, B: SpeechBackend> {
	service: Arc<TranscriptionService<P, B>>,
	gate: AdmissionGate,
	pending: Arc<PendingCounter>,
	prep_workers: usize,
}

impl<P: MediaPreparer + 'static, B: SpeechBackend + 'static> BatchExecutor<P, B> {
	pub fn new(service: Arc<TranscriptionService<P, B>>, gate: AdmissionGate, pending: Arc<PendingCounter>, prep_workers: usize) -> Self {
		Self {
			service,
			gate,
			pending,
			prep_workers: prep_workers.max(1),
		}
	}

	/// Run one batch to completion. Per-job failures stay in their own
	/// outcome slot; outcomes come back in assembly order.
	pub async fn run_batch(&self, batch: Vec<Job>) -> Vec<JobOutcome> {
		if batch.is_empty() {
			return Vec::new();
		}

		let batch_size = batch.len();
		let batch_started = Instant::now();
		info!(batch_size, "Micro-batch start");

		let prepared = self.prepare_all(&batch).await;
		let prep_elapsed = batch_started.elapsed();
		info!(batch_size, prep_ms = prep_elapsed.as_millis() as u64, "Micro-batch prep done");

		// The whole batch computes behind one slot; jobs stop being
		// "pending" the moment the slot is ours.
		let permit = match self.gate.acquire().await {
			Ok(permit) => permit,
			Err(_) => {
				self.pending.decrement_by(batch_size);
				return batch
					.into_iter()
					.map(|job| JobOutcome {
						job_id: job.id,
						result: Err(IntakeError::NotReady),
					})
					.collect();
			}
		};
		self.pending.decrement_by(batch_size);

		let mut outcomes = Vec::with_capacity(batch_size);
		for (job, prep) in batch.into_iter().zip(prepared) {
			let result = match prep {
				Ok(media) => self.service.process_prepared(&job.request, &media).await,
				Err(e) => Err(e),
			};
			match &result {
				Ok(_) => info!(job_id = %job.id, queue_latency_ms = job.queue_latency().as_millis() as u64, "Job completed"),
				Err(e) => error!(job_id = %job.id, error = %e, "Job failed"),
			}
			outcomes.push(JobOutcome { job_id: job.id, result });
		}
		drop(permit);

		let ok_count = outcomes.iter().filter(|o| o.result.is_ok()).count();
		info!(
			ok = ok_count,
			batch_size,
			total_ms = batch_started.elapsed().as_millis() as u64,
			prep_ms = prep_elapsed.as_millis() as u64,
			"Micro-batch done"
		);
		outcomes
	}

	/// Phase 1: fan out preparation, bounded, failures captured per job.
	async fn prepare_all(&self, batch: &[Job]) -> Vec<Result<PreparedMedia, IntakeError>> {
		let slots = Arc::new(Semaphore::new(self.prep_workers));
		let futures = batch.iter().map(|job| {
			let slots = Arc::clone(&slots);
			let service = Arc::clone(&self.service);
			let request = job.request.clone();
			async move {
				let _slot = slots
					.acquire_owned()
					.await
					.map_err(|_| IntakeError::InternalError("Preparation pool closed".to_string()))?;
				service.prepare(&request).await
			}
		});
		join_all(futures).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::align::SpeakerTurn;
	use crate::backend::{RawTranscript, TranscribeOptions};
	use crate::dispatch::ResultDispatcher;
	use crate::job::TranscriptionRequest;
	use crate::service::ServiceConfig;
	use async_trait::async_trait;
	use std::time::Duration;

	struct NamedPreparer;

	#[async_trait]
	impl MediaPreparer for NamedPreparer {
		async fn prepare(&self, request: &TranscriptionRequest) -> Result<PreparedMedia, IntakeError> {
			let url = request.audio_url.clone().unwrap_or_default();
			if url.contains("bad") {
				return Err(IntakeError::PrepareError(format!("Failed to download audio: {url}")));
			}
			Ok(PreparedMedia::in_memory(Vec::new(), url))
		}
	}

	/// Echoes the prepared file name back as transcript text so tests can
	/// check result ordering.
	struct EchoBackend;

	#[async_trait]
	impl SpeechBackend for EchoBackend {
		async fn transcribe(&self, media: &PreparedMedia, _options: &TranscribeOptions) -> Result<RawTranscript, IntakeError> {
			Ok(RawTranscript {
				text: media.file_name().to_string(),
				..RawTranscript::default()
			})
		}

		async fn diarize(&self, _media: &PreparedMedia, _num_speakers: u32) -> Result<Vec<SpeakerTurn>, IntakeError> {
			Ok(Vec::new())
		}
	}

	fn executor(gate: AdmissionGate, pending: Arc<PendingCounter>) -> BatchExecutor<NamedPreparer, EchoBackend> {
		let service = Arc::new(TranscriptionService::new(
			NamedPreparer,
			EchoBackend,
			ResultDispatcher::new(Duration::from_secs(1)).unwrap(),
			ServiceConfig::default(),
		));
		BatchExecutor::new(service, gate, pending, 4)
	}

	fn job(n: usize, url: &str) -> Job {
		let request = serde_json::from_value(serde_json::json!({"audio_url": url, "enable_diarization": false})).unwrap();
		Job::new(format!("j-{n}"), request)
	}

	#[tokio::test]
	async fn test_prep_failure_isolated_and_order_preserved() {
		let gate = AdmissionGate::new(1);
		let pending = PendingCounter::new();
		let executor = executor(gate.clone(), Arc::clone(&pending));

		let batch = vec![
			job(0, "https://example.com/0.mp3"),
			job(1, "https://example.com/1.mp3"),
			job(2, "https://example.com/bad.mp3"),
			job(3, "https://example.com/3.mp3"),
			job(4, "https://example.com/4.mp3"),
		];
		let outcomes = executor.run_batch(batch).await;

		assert_eq!(outcomes.len(), 5);
		let ids: Vec<&str> = outcomes.iter().map(|o| o.job_id.as_str()).collect();
		assert_eq!(ids, vec!["j-0", "j-1", "j-2", "j-3", "j-4"]);

		assert!(matches!(outcomes[2].result, Err(IntakeError::PrepareError(_))));
		for index in [0usize, 1, 3, 4] {
			let response = outcomes[index].result.as_ref().unwrap();
			assert_eq!(response.text, format!("https://example.com/{index}.mp3"));
		}
	}

	#[tokio::test]
	async fn test_gate_released_after_batch_despite_failures() {
		let gate = AdmissionGate::new(1);
		let pending = PendingCounter::new();
		let executor = executor(gate.clone(), Arc::clone(&pending));

		let outcomes = executor.run_batch(vec![job(0, "https://example.com/bad.mp3")]).await;
		assert!(outcomes[0].result.is_err());

		assert_eq!(gate.available_slots(), 1);
		let permit = gate.acquire().await.unwrap();
		drop(permit);
	}

	#[tokio::test]
	async fn test_pending_drained_at_gate_acquisition() {
		let gate = AdmissionGate::new(1);
		let pending = PendingCounter::new();
		for _ in 0..3 {
			pending.increment();
		}
		let executor = executor(gate, Arc::clone(&pending));

		let batch = (0..3).map(|n| job(n, "https://example.com/a.mp3")).collect();
		executor.run_batch(batch).await;
		assert_eq!(pending.current(), 0);
	}

	#[tokio::test]
	async fn test_closed_gate_fails_whole_batch_without_panicking() {
		let gate = AdmissionGate::new(1);
		gate.close();
		let executor = executor(gate, PendingCounter::new());

		let outcomes = executor.run_batch(vec![job(0, "https://example.com/a.mp3")]).await;
		assert!(matches!(outcomes[0].result, Err(IntakeError::NotReady)));
	}

	#[tokio::test]
	async fn test_empty_batch_is_a_no_op() {
		let executor = executor(AdmissionGate::new(1), PendingCounter::new());
		assert!(executor.run_batch(Vec::new()).await.is_empty());
	}
}

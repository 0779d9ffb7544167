use crate::consumer::JobConsumer;
use crate::error::IntakeError;
use crate::job::Job;
use crate::queue::QueueTransport;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::warn;

/// Budgets for one batch-assembly cycle.
#[derive(Debug, Clone)]
pub struct BatchConfig {
	/// Hard cap on jobs per batch.
	pub max_size: usize,
	/// How long the blocking wait for the first job may last.
	pub wait_timeout: Duration,
	/// Wall-clock budget for topping up the batch once the first job arrived.
	pub batch_timeout: Duration,
	/// Sleep between queue polls during the trickle phase.
	pub poll_interval: Duration,
}

impl Default for BatchConfig {
	fn default() -> Self {
		Self {
			max_size: 6,
			wait_timeout: Duration::from_secs(5),
			batch_timeout: Duration::from_millis(70),
			poll_interval: Duration::from_millis(10),
		}
	}
}

/// Groups ready jobs into bounded micro-batches under a time budget.
///
/// Per cycle: block for the first job (phase A), drain whatever burst is
/// already queued (phase B), then trickle-poll until the batch fills or the
/// budget runs out (phase C). No job waits longer than
/// `wait_timeout + batch_timeout`, and a batch of one is returned rather than
/// holding out for more.
pub struct BatchAssembler<T: QueueTransport> {
	consumer: JobConsumer<T>,
	config: BatchConfig,
}

impl<T: QueueTransport> BatchAssembler<T> {
	pub const fn new(consumer: JobConsumer<T>, config: BatchConfig) -> Self {
		Self { consumer, config }
	}

	pub const fn consumer(&self) -> &JobConsumer<T> {
		&self.consumer
	}

	/// Assemble the next batch. Empty when no job arrived within the wait
	/// timeout; the caller just cycles again.
	///
	/// # Errors
	/// Returns an error when the queue transport is unreachable before any
	/// job was claimed. Once jobs are held, transport failures end the cycle
	/// early and the partial batch is returned instead.
	pub async fn assemble(&self) -> Result<Vec<Job>, IntakeError> {
		// Phase A: blocking wait for the first job.
		let Some(first) = self.consumer.next_job(self.config.wait_timeout).await? else {
			return Ok(Vec::new());
		};

		let deadline = Instant::now() + self.config.batch_timeout;
		let mut batch = vec![first];

		// Phase B: claim the burst that arrived alongside the first job.
		if !self.drain_ready(&mut batch).await {
			return Ok(batch);
		}

		// Phase C: timed trickle until full or out of budget.
		while batch.len() < self.config.max_size {
			let now = Instant::now();
			if now >= deadline {
				break;
			}
			sleep(self.config.poll_interval.min(deadline - now)).await;
			if !self.drain_ready(&mut batch).await {
				break;
			}
		}

		Ok(batch)
	}

	/// Non-blocking top-up. Returns false when the transport failed and the
	/// cycle should end with what is already claimed.
	async fn drain_ready(&self, batch: &mut Vec<Job>) -> bool {
		while batch.len() < self.config.max_size {
			match self.consumer.poll_job().await {
				Ok(Some(job)) => batch.push(job),
				Ok(None) => break,
				Err(e) => {
					warn!(error = %e, claimed = batch.len(), "Queue poll failed mid-assembly; closing batch early");
					return false;
				}
			}
		}
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::queue::test_support::InMemoryQueue;

	fn envelope(n: usize) -> String {
		format!(r#"{{"job_id": "j-{n}", "request": {{"audio_url": "https://example.com/{n}.mp3"}}}}"#)
	}

	fn assembler(queue: InMemoryQueue, config: BatchConfig) -> BatchAssembler<InMemoryQueue> {
		BatchAssembler::new(JobConsumer::new(queue), config)
	}

	#[tokio::test(start_paused = true)]
	async fn test_empty_queue_yields_empty_batch_after_wait_timeout() {
		let assembler = assembler(InMemoryQueue::new(), BatchConfig::default());
		let batch = assembler.assemble().await.unwrap();
		assert!(batch.is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_burst_never_exceeds_max_size() {
		let queue = InMemoryQueue::new();
		queue.preload((0..20).map(envelope)).await;

		let assembler = assembler(queue, BatchConfig { max_size: 6, ..BatchConfig::default() });
		let batch = assembler.assemble().await.unwrap();
		assert_eq!(batch.len(), 6);
	}

	#[tokio::test(start_paused = true)]
	async fn test_single_job_returns_batch_of_one_within_budget() {
		let queue = InMemoryQueue::new();
		queue.preload([envelope(1)]).await;

		let config = BatchConfig::default();
		let budget = config.wait_timeout + config.batch_timeout + Duration::from_millis(50);
		let assembler = assembler(queue, config);

		let started = Instant::now();
		let batch = assembler.assemble().await.unwrap();
		assert_eq!(batch.len(), 1);
		assert!(started.elapsed() <= budget);
	}

	#[tokio::test(start_paused = true)]
	async fn test_batch_preserves_arrival_order() {
		let queue = InMemoryQueue::new();
		queue.preload((0..4).map(envelope)).await;

		let assembler = assembler(queue, BatchConfig::default());
		let batch = assembler.assemble().await.unwrap();
		let ids: Vec<&str> = batch.iter().map(|job| job.id.as_str()).collect();
		assert_eq!(ids, vec!["j-0", "j-1", "j-2", "j-3"]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_trickle_picks_up_late_arrivals() {
		let queue = std::sync::Arc::new(InMemoryQueue::new());
		queue.preload([envelope(0)]).await;

		let producer = std::sync::Arc::clone(&queue);
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;
			producer.push(envelope(1)).await.unwrap();
		});

		let assembler = BatchAssembler::new(
			JobConsumer::new(ArcQueue(queue)),
			BatchConfig {
				batch_timeout: Duration::from_millis(100),
				..BatchConfig::default()
			},
		);
		let batch = assembler.assemble().await.unwrap();
		assert_eq!(batch.len(), 2);
	}

	/// Delegating wrapper so a shared queue can feed both producer and
	/// assembler sides of a test.
	struct ArcQueue(std::sync::Arc<InMemoryQueue>);

	#[async_trait::async_trait]
	impl QueueTransport for ArcQueue {
		async fn push(&self, payload: String) -> Result<(), IntakeError> {
			self.0.push(payload).await
		}

		async fn pop_blocking(&self, timeout: Duration) -> Result<Option<String>, IntakeError> {
			self.0.pop_blocking(timeout).await
		}

		async fn pop_now(&self) -> Result<Option<String>, IntakeError> {
			self.0.pop_now().await
		}

		async fn len(&self) -> Result<usize, IntakeError> {
			self.0.len().await
		}
	}
}

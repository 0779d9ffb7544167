use crate::config::Config;
use prometheus::{Counter, Gauge, Registry};
use std::sync::Arc;
use stt_queue::backend::RemoteBackend;
use stt_queue::fetch::AudioFetcher;
use stt_queue::queue::RedisJobQueue;
use stt_queue::service::TranscriptionService;
use stt_queue::{AdmissionGate, PendingCounter};

/// Explicitly constructed application context, built once at startup and
/// shared by the HTTP layer and the queue worker.
pub struct AppState {
	pub config: Config,
	pub gate: AdmissionGate,
	pub pending: Arc<PendingCounter>,
	pub queue: RedisJobQueue,
	pub service: Arc<TranscriptionService<AudioFetcher, RemoteBackend>>,
	pub metrics: Metrics,
}

pub type SharedState = Arc<AppState>;

/// Intake counters, exported in Prometheus text format.
pub struct Metrics {
	pub registry: Registry,
	pub jobs_processed: Counter,
	pub job_errors: Counter,
	pub batches_processed: Counter,
	pub queue_depth: Gauge,
}

impl Metrics {
	pub fn new() -> Result<Self, prometheus::Error> {
		let registry = Registry::new();
		let jobs_processed = Counter::new("intake_jobs_processed", "Total jobs processed")?;
		let job_errors = Counter::new("intake_job_errors", "Total job failures")?;
		let batches_processed = Counter::new("intake_batches_processed", "Total micro-batches executed")?;
		let queue_depth = Gauge::new("intake_queue_depth", "Durable queue depth at last sample")?;

		registry.register(Box::new(jobs_processed.clone()))?;
		registry.register(Box::new(job_errors.clone()))?;
		registry.register(Box::new(batches_processed.clone()))?;
		registry.register(Box::new(queue_depth.clone()))?;

		Ok(Self {
			registry,
			jobs_processed,
			job_errors,
			batches_processed,
			queue_depth,
		})
	}
}

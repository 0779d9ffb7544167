use crate::state::SharedState;
use std::sync::Arc;
use std::time::Duration;
use stt_queue::batch::{BatchAssembler, BatchConfig};
use stt_queue::consumer::JobConsumer;
use stt_queue::executor::BatchExecutor;
use stt_queue::queue::QueueTransport;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const QUEUE_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Drain loop: assemble micro-batches from the durable queue and execute
/// them. Cancellation is honored between cycles, so an in-flight batch always
/// finishes before the loop exits.
pub async fn run_queue_worker(state: SharedState, cancel: CancellationToken) {
	let assembler = BatchAssembler::new(
		JobConsumer::new(state.queue.clone()),
		BatchConfig {
			max_size: state.config.max_batch_size,
			wait_timeout: Duration::from_secs(state.config.queue_brpop_timeout_secs),
			batch_timeout: Duration::from_millis(state.config.batch_timeout_ms),
			poll_interval: Duration::from_millis(state.config.batch_poll_interval_ms),
		},
	);
	let executor = BatchExecutor::new(Arc::clone(&state.service), state.gate.clone(), Arc::clone(&state.pending), state.config.prep_workers);

	info!(queue = state.queue.queue_key(), "Redis queue worker started");

	loop {
		let assembled = tokio::select! {
			() = cancel.cancelled() => {
				info!("Queue worker cancelled; shutting down consumer loop");
				break;
			}
			result = assembler.assemble() => result,
		};

		match assembled {
			Ok(batch) if batch.is_empty() => {}
			Ok(batch) => {
				let outcomes = executor.run_batch(batch).await;
				state.metrics.batches_processed.inc();
				for outcome in &outcomes {
					if outcome.result.is_ok() {
						state.metrics.jobs_processed.inc();
					} else {
						state.metrics.job_errors.inc();
					}
				}
			}
			Err(e) => {
				error!(error = %e, "Failed to read from queue; backing off");
				tokio::time::sleep(QUEUE_RETRY_BACKOFF).await;
			}
		}

		if let Ok(depth) = state.queue.len().await {
			state.metrics.queue_depth.set(depth as f64);
		}
	}
}

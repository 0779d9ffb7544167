mod config;
mod routes;
mod state;
mod worker;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use stt_queue::backend::RemoteBackend;
use stt_queue::dispatch::ResultDispatcher;
use stt_queue::fetch::AudioFetcher;
use stt_queue::queue::RedisJobQueue;
use stt_queue::service::{ServiceConfig, TranscriptionService};
use stt_queue::{AdmissionGate, PendingCounter};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use config::Config;
use state::{AppState, Metrics};

#[tokio::main]
async fn main() -> Result<()> {
	// Load environment variables
	dotenvy::dotenv().ok();

	// Parse CLI arguments
	let config = Config::parse();
	config.validate().map_err(anyhow::Error::msg)?;

	init_tracing();

	info!(
		version = %config.api_version,
		max_concurrency = config.max_concurrency,
		max_batch_size = config.max_batch_size,
		inference_url = %config.inference_url,
		"🎯 Starting transcription intake service"
	);

	// Queue backend unreachable at boot is fatal.
	let queue = RedisJobQueue::connect(
		&config.redis_url,
		config.redis_username.as_deref(),
		config.redis_password.as_deref(),
		&config.queue_name,
	)
	.await?;

	let fetcher = AudioFetcher::new(Duration::from_secs(config.audio_fetch_timeout_secs))?;
	let backend = RemoteBackend::new(&config.inference_url, Duration::from_secs(config.inference_timeout_secs))?;
	let dispatcher = ResultDispatcher::new(Duration::from_secs(config.dispatcher_timeout_secs))?;
	let service = Arc::new(TranscriptionService::new(
		fetcher,
		backend,
		dispatcher,
		ServiceConfig {
			default_num_speakers: config.default_num_speakers,
			compute_rate_per_second: config.compute_rate_per_second,
		},
	));

	let state = Arc::new(AppState {
		gate: AdmissionGate::new(config.max_concurrency),
		pending: PendingCounter::new(),
		queue,
		service,
		metrics: Metrics::new()?,
		config: config.clone(),
	});

	// Cancellation token for cooperative shutdown
	let cancel = CancellationToken::new();

	let worker_handle = if config.queue_worker_enabled {
		Some(tokio::spawn(worker::run_queue_worker(Arc::clone(&state), cancel.clone())))
	} else {
		warn!("Queue worker disabled; only direct HTTP submissions will be processed");
		None
	};

	let app = routes::router(Arc::clone(&state));
	let listener = tokio::net::TcpListener::bind((config.api_host.as_str(), config.api_port)).await?;
	info!(host = %config.api_host, port = config.api_port, "✅ API listening");

	let shutdown_cancel = cancel.clone();
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			wait_for_shutdown_signal().await;
			info!("🛑 Shutdown signal received (SIGTERM/SIGINT)");
			shutdown_cancel.cancel();
		})
		.await?;

	// The worker honors cancellation between cycles; an in-flight batch
	// finishes before this returns.
	if let Some(handle) = worker_handle {
		if let Err(e) = handle.await {
			error!(error = %e, "Queue worker task panicked during shutdown");
		}
	}
	state.gate.close();

	info!("✅ Shutdown complete");
	Ok(())
}

fn init_tracing() {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn wait_for_shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install SIGTERM handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}
}

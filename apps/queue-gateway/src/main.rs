mod config;
mod pod;
mod routes;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use stt_queue::autoscale::{AutoscaleMonitor, IdleTracker};
use stt_queue::queue::RedisJobQueue;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use config::Config;
use pod::RunPodClient;
use routes::GatewayState;

#[tokio::main]
async fn main() -> Result<()> {
	// Load environment variables
	dotenvy::dotenv().ok();

	// Parse CLI arguments
	let config = Config::parse();
	config.validate().map_err(anyhow::Error::msg)?;

	init_tracing();

	info!(
		queue = %config.queue_name,
		autoscaler_enabled = config.autoscaler_enabled,
		idle_timeout_secs = config.queue_idle_timeout_secs,
		"🎯 Starting queue gateway"
	);

	// Redis unreachable at boot is fatal for the control plane too.
	let queue = RedisJobQueue::connect(
		&config.redis_url,
		config.redis_username.as_deref(),
		config.redis_password.as_deref(),
		&config.queue_name,
	)
	.await?;

	let cancel = CancellationToken::new();
	let monitor_handle = spawn_autoscaler(&config, queue.clone(), cancel.clone())?;

	let state = Arc::new(GatewayState {
		config: config.clone(),
		queue,
	});
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

	if let Some(handle) = monitor_handle {
		if let Err(e) = handle.await {
			error!(error = %e, "Autoscale monitor task panicked during shutdown");
		}
	}

	info!("✅ Shutdown complete");
	Ok(())
}

/// Start the autoscale monitor when it is enabled and fully configured.
fn spawn_autoscaler(config: &Config, queue: RedisJobQueue, cancel: CancellationToken) -> Result<Option<tokio::task::JoinHandle<()>>> {
	if !config.autoscaler_enabled {
		info!("Autoscaler disabled by configuration");
		return Ok(None);
	}

	let Some((api_key, pod_id)) = config.autoscaler_credentials() else {
		warn!("Autoscaler enabled but RUNPOD_API_KEY or RUNPOD_POD_ID not configured; disabling autoscaler");
		return Ok(None);
	};

	let controller = RunPodClient::new(&config.runpod_api_url, api_key, pod_id, Duration::from_secs(config.runpod_timeout_secs))?;
	let tracker = IdleTracker::new(Duration::from_secs(config.queue_idle_timeout_secs));
	let monitor = AutoscaleMonitor::new(queue, controller, tracker, Duration::from_secs(config.queue_poll_interval_secs));

	info!(
		idle_timeout_secs = config.queue_idle_timeout_secs,
		poll_interval_secs = config.queue_poll_interval_secs,
		"Starting autoscaler loop"
	);
	Ok(Some(tokio::spawn(monitor.run(cancel))))
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

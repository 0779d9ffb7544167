use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "queue-gateway")]
#[command(about = "Control plane: enqueues transcription jobs and manages autoscaling", long_about = None)]
pub struct Config {
	/// Redis connection URL
	#[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379/0")]
	pub redis_url: String,

	/// Redis username, applied on top of the URL
	#[arg(long, env = "REDIS_USERNAME")]
	pub redis_username: Option<String>,

	/// Redis password, applied on top of the URL
	#[arg(long, env = "REDIS_PASSWORD")]
	pub redis_password: Option<String>,

	/// Name of the durable job queue
	#[arg(long, env = "QUEUE_NAME", default_value = "transcription_queue")]
	pub queue_name: String,

	/// Whether the autoscaler loop runs at all
	#[arg(long, env = "RUNPOD_AUTOSCALER_ENABLED", default_value_t = true, action = ArgAction::Set)]
	pub autoscaler_enabled: bool,

	/// Seconds the queue must stay empty before the pod is stopped
	#[arg(long, env = "QUEUE_IDLE_TIMEOUT", default_value = "30")]
	pub queue_idle_timeout_secs: u64,

	/// Seconds between queue-depth samples
	#[arg(long, env = "QUEUE_POLL_INTERVAL", default_value = "10")]
	pub queue_poll_interval_secs: u64,

	/// RunPod control-plane GraphQL endpoint
	#[arg(long, env = "RUNPOD_API_URL", default_value = "https://api.runpod.io/graphql")]
	pub runpod_api_url: String,

	/// RunPod API key; autoscaling is disabled without it
	#[arg(long, env = "RUNPOD_API_KEY")]
	pub runpod_api_key: Option<String>,

	/// Pod to start and stop; autoscaling is disabled without it
	#[arg(long, env = "RUNPOD_POD_ID")]
	pub runpod_pod_id: Option<String>,

	/// Timeout for pod control calls in seconds
	#[arg(long, env = "RUNPOD_TIMEOUT_SECS", default_value = "30")]
	pub runpod_timeout_secs: u64,

	#[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
	pub api_host: String,

	#[arg(long, env = "API_PORT", default_value = "8002")]
	pub api_port: u16,
}

impl Config {
	/// Validate configuration values
	pub fn validate(&self) -> Result<(), String> {
		if self.queue_idle_timeout_secs == 0 {
			return Err("queue_idle_timeout_secs must be greater than 0".to_string());
		}

		if self.queue_poll_interval_secs == 0 {
			return Err("queue_poll_interval_secs must be greater than 0".to_string());
		}

		Ok(())
	}

	/// Autoscaling needs both credentials; anything less means log-and-skip.
	pub fn autoscaler_credentials(&self) -> Option<(&str, &str)> {
		match (&self.runpod_api_key, &self.runpod_pod_id) {
			(Some(key), Some(pod)) if !key.is_empty() && !pod.is_empty() => Some((key, pod)),
			_ => None,
		}
	}
}

use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "stt-server")]
#[command(about = "GPU-bounded transcription intake service", long_about = None)]
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

	/// Whether to drain the durable queue in this process
	#[arg(long, env = "QUEUE_WORKER_ENABLED", default_value_t = true, action = ArgAction::Set)]
	pub queue_worker_enabled: bool,

	/// Blocking-pop timeout against the queue in seconds
	#[arg(long, env = "QUEUE_BRPOP_TIMEOUT", default_value = "5")]
	pub queue_brpop_timeout_secs: u64,

	/// Maximum concurrent compute operations (gate capacity)
	#[arg(long, env = "MAX_CONCURRENCY", default_value = "5")]
	pub max_concurrency: usize,

	/// Maximum jobs per micro-batch
	#[arg(long, env = "MAX_BATCH_SIZE", default_value = "6")]
	pub max_batch_size: usize,

	/// Batch top-up budget in milliseconds once the first job arrived
	#[arg(long, env = "BATCH_TIMEOUT_MS", default_value = "70")]
	pub batch_timeout_ms: u64,

	/// Sleep between queue polls during batch top-up, in milliseconds
	#[arg(long, env = "BATCH_POLL_INTERVAL_MS", default_value = "10")]
	pub batch_poll_interval_ms: u64,

	/// Parallel workers for the audio preparation phase
	#[arg(long, env = "PREP_WORKERS", default_value = "4")]
	pub prep_workers: usize,

	/// Base URL of the GPU inference runtime
	#[arg(long, env = "INFERENCE_URL", default_value = "http://127.0.0.1:9000")]
	pub inference_url: String,

	/// Per-call timeout against the inference runtime in seconds
	#[arg(long, env = "INFERENCE_TIMEOUT_SECS", default_value = "600")]
	pub inference_timeout_secs: u64,

	/// Timeout for downloading source audio in seconds
	#[arg(long, env = "AUDIO_FETCH_TIMEOUT_SECS", default_value = "60")]
	pub audio_fetch_timeout_secs: u64,

	/// Timeout for dispatcher result delivery in seconds
	#[arg(long, env = "DISPATCHER_TIMEOUT_SECS", default_value = "30")]
	pub dispatcher_timeout_secs: u64,

	/// Speaker count assumed when a job does not specify one
	#[arg(long, env = "DEFAULT_NUM_SPEAKERS", default_value = "2")]
	pub default_num_speakers: u32,

	/// Billing rate per whole second of processing
	#[arg(long, env = "COMPUTE_RATE_PER_SECOND", default_value = "0.0007")]
	pub compute_rate_per_second: f64,

	#[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
	pub api_host: String,

	#[arg(long, env = "API_PORT", default_value = "8000")]
	pub api_port: u16,

	#[arg(long, env = "API_VERSION", default_value = "1.0.0")]
	pub api_version: String,
}

impl Config {
	/// Validate configuration values
	pub fn validate(&self) -> Result<(), String> {
		if self.max_concurrency < 1 {
			return Err("max_concurrency must be at least 1".to_string());
		}

		if self.max_batch_size < 1 {
			return Err("max_batch_size must be at least 1".to_string());
		}

		if self.prep_workers < 1 {
			return Err("prep_workers must be at least 1".to_string());
		}

		if self.queue_brpop_timeout_secs == 0 {
			return Err("queue_brpop_timeout_secs must be greater than 0".to_string());
		}

		if self.default_num_speakers < 1 {
			return Err("default_num_speakers must be at least 1".to_string());
		}

		if self.compute_rate_per_second < 0.0 {
			return Err("compute_rate_per_second must not be negative".to_string());
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_are_valid() {
		let config = Config::try_parse_from(["stt-server"]).unwrap();
		assert!(config.validate().is_ok());
		assert_eq!(config.max_concurrency, 5);
		assert_eq!(config.max_batch_size, 6);
		assert_eq!(config.queue_name, "transcription_queue");
		assert!(config.queue_worker_enabled);
	}

	#[test]
	fn test_flags_override_defaults() {
		let config = Config::try_parse_from([
			"stt-server",
			"--max-concurrency",
			"2",
			"--max-batch-size",
			"12",
			"--queue-worker-enabled",
			"false",
		])
		.unwrap();
		assert_eq!(config.max_concurrency, 2);
		assert_eq!(config.max_batch_size, 12);
		assert!(!config.queue_worker_enabled);
	}

	#[test]
	fn test_zero_concurrency_rejected() {
		let config = Config::try_parse_from(["stt-server", "--max-concurrency", "0"]).unwrap();
		assert!(config.validate().is_err());
	}
}

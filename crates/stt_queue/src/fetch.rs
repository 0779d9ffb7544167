use crate::error::IntakeError;
use crate::job::TranscriptionRequest;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::info;

/// Audio ready for the compute backend.
///
/// Downloads are spooled to a temp file that is deleted when the media is
/// dropped; tests hand the backend in-memory bytes directly.
pub struct PreparedMedia {
	buffer: MediaBuffer,
	file_name: String,
}

enum MediaBuffer {
	Spooled(NamedTempFile),
	Memory(Vec<u8>),
}

impl PreparedMedia {
	#[must_use]
	pub fn from_temp_file(file: NamedTempFile, file_name: String) -> Self {
		Self {
			buffer: MediaBuffer::Spooled(file),
			file_name,
		}
	}

	#[must_use]
	pub fn in_memory(bytes: Vec<u8>, file_name: String) -> Self {
		Self {
			buffer: MediaBuffer::Memory(bytes),
			file_name,
		}
	}

	#[must_use]
	pub fn file_name(&self) -> &str {
		&self.file_name
	}

	#[must_use]
	pub fn path(&self) -> Option<&Path> {
		match &self.buffer {
			MediaBuffer::Spooled(file) => Some(file.path()),
			MediaBuffer::Memory(_) => None,
		}
	}

	/// Full audio bytes, for upload to the compute backend.
	///
	/// # Errors
	/// Returns an I/O error when the spooled file cannot be read back.
	pub async fn read(&self) -> Result<Vec<u8>, IntakeError> {
		match &self.buffer {
			MediaBuffer::Spooled(file) => Ok(tokio::fs::read(file.path()).await?),
			MediaBuffer::Memory(bytes) => Ok(bytes.clone()),
		}
	}
}

/// The opaque "prepare" collaborator: turn a job's source descriptor into
/// audio the backend can consume. I/O-bound, never compute-bound.
#[async_trait]
pub trait MediaPreparer: Send + Sync {
	/// # Errors
	/// Returns [`IntakeError::PrepareError`] (or a decode error for inline
	/// payloads) when the source cannot be materialized.
	async fn prepare(&self, request: &TranscriptionRequest) -> Result<PreparedMedia, IntakeError>;
}

/// Production preparer: downloads `audio_url` to a temp file, or decodes the
/// inline base64 `audio_file` payload.
pub struct AudioFetcher {
	http: reqwest::Client,
}

impl AudioFetcher {
	/// # Errors
	/// Returns an error when the HTTP client cannot be constructed.
	pub fn new(timeout: Duration) -> Result<Self, IntakeError> {
		let http = reqwest::Client::builder().timeout(timeout).build()?;
		Ok(Self { http })
	}

	async fn download(&self, url: &str) -> Result<PreparedMedia, IntakeError> {
		let response = self
			.http
			.get(url)
			.send()
			.await
			.and_then(reqwest::Response::error_for_status)
			.map_err(|e| IntakeError::PrepareError(format!("Failed to download audio: {e}")))?;
		let bytes = response.bytes().await?;

		let mut file = NamedTempFile::new()?;
		file.write_all(&bytes)?;
		file.flush()?;

		let file_name = url.rsplit('/').next().filter(|tail| !tail.is_empty()).unwrap_or("audio").to_string();
		info!(url, bytes = bytes.len(), "Audio downloaded");
		Ok(PreparedMedia::from_temp_file(file, file_name))
	}

	fn decode_inline(payload: &str) -> Result<PreparedMedia, IntakeError> {
		let bytes = BASE64.decode(payload)?;

		let mut file = NamedTempFile::new()?;
		file.write_all(&bytes)?;
		file.flush()?;

		info!(bytes = bytes.len(), "Inline audio decoded");
		Ok(PreparedMedia::from_temp_file(file, "audio".to_string()))
	}
}

#[async_trait]
impl MediaPreparer for AudioFetcher {
	async fn prepare(&self, request: &TranscriptionRequest) -> Result<PreparedMedia, IntakeError> {
		if let Some(url) = &request.audio_url {
			return self.download(url).await;
		}
		if let Some(payload) = &request.audio_file {
			return Self::decode_inline(payload);
		}
		Err(IntakeError::InvalidJob("Either 'audio_url' or 'audio_file' must be provided".to_string()))
	}
}

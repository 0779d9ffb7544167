use crate::error::IntakeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Instant;

/// What the recognizer should do with the audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
	#[default]
	Transcribe,
	Translate,
}

impl TaskKind {
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Transcribe => "transcribe",
			Self::Translate => "translate",
		}
	}
}

/// Job description accepted at the HTTP and queue boundaries.
///
/// Exactly one of `audio_url` / `audio_file` must be present; everything else
/// is optional with service-level defaults. `extra_data` is carried verbatim
/// into the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionRequest {
	pub audio_url: Option<String>,
	/// Base64 encoded audio payload, alternative to `audio_url`.
	pub audio_file: Option<String>,
	/// ISO 639-1/639-2 language code; auto-detected when absent.
	pub language: Option<String>,
	#[serde(default)]
	pub task: TaskKind,
	#[serde(default = "default_enable_diarization")]
	pub enable_diarization: bool,
	pub num_speakers: Option<u32>,
	#[serde(default)]
	pub translate_to_english: bool,
	#[serde(default)]
	pub extra_data: Map<String, Value>,
	/// Where to POST the finished result, if anywhere.
	pub dispatcher_endpoint: Option<String>,
}

const fn default_enable_diarization() -> bool {
	true
}

impl TranscriptionRequest {
	/// Validate the request once, at the boundary.
	///
	/// # Errors
	/// Returns [`IntakeError::InvalidJob`] when the source descriptor is
	/// missing or doubled, or when an option is out of range.
	pub fn validate(&self) -> Result<(), IntakeError> {
		match (&self.audio_url, &self.audio_file) {
			(None, None) => {
				return Err(IntakeError::InvalidJob("Either 'audio_url' or 'audio_file' must be provided".to_string()));
			}
			(Some(_), Some(_)) => {
				return Err(IntakeError::InvalidJob("Provide exactly one of 'audio_url' and 'audio_file'".to_string()));
			}
			_ => {}
		}

		if let Some(language) = &self.language {
			let len = language.len();
			if !(2..=3).contains(&len) || !language.chars().all(|c| c.is_ascii_alphabetic()) {
				return Err(IntakeError::InvalidJob(format!("Invalid language code '{language}': expected 2 or 3 letters")));
			}
		}

		if self.num_speakers == Some(0) {
			return Err(IntakeError::InvalidJob("num_speakers must be at least 1".to_string()));
		}

		Ok(())
	}

	/// The language code lowercased, the way the recognizer expects it.
	#[must_use]
	pub fn normalized_language(&self) -> Option<String> {
		self.language.as_ref().map(|l| l.to_lowercase())
	}
}

/// Wire format of one durable queue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEnvelope {
	pub job_id: String,
	pub request: TranscriptionRequest,
}

/// A validated job owned by the intake pipeline until its result exists.
#[derive(Debug)]
pub struct Job {
	pub id: String,
	pub request: TranscriptionRequest,
	pub accepted_at: Instant,
}

impl Job {
	#[must_use]
	pub fn new(id: String, request: TranscriptionRequest) -> Self {
		Self {
			id,
			request,
			accepted_at: Instant::now(),
		}
	}

	/// How long this job has waited since it was accepted.
	#[must_use]
	pub fn queue_latency(&self) -> std::time::Duration {
		self.accepted_at.elapsed()
	}
}

/// One recognized span in the result payload. Ids are zero-based here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentPayload {
	pub id: i64,
	pub start: f64,
	pub end: f64,
	pub text: String,
}

/// One speaker-attributed span in the result payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiarizedSegmentPayload {
	pub start: f64,
	pub end: f64,
	pub speaker: String,
	pub text: String,
}

/// Finished result for one job, returned inline or POSTed to a dispatcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptionResponse {
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub diarized_text: String,
	pub translation: Option<String>,
	pub diarized_translation: Option<String>,
	pub language: Option<String>,
	pub duration: Option<f64>,
	pub segments: Option<Vec<SegmentPayload>>,
	pub diarized_segments: Option<Vec<DiarizedSegmentPayload>>,
	pub num_speakers: Option<u32>,
	pub processing_time: Option<f64>,
	pub cost: Option<f64>,
	#[serde(default)]
	pub extra_data: Map<String, Value>,
}

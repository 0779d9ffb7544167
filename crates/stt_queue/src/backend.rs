use crate::align::{canonical_speaker_label, round2, SpeakerTurn, TranscriptSegment};
use crate::error::IntakeError;
use crate::fetch::PreparedMedia;
use crate::job::TaskKind;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

/// Raw recognizer output for one media item, before alignment.
#[derive(Debug, Clone, Default)]
pub struct RawTranscript {
	pub text: String,
	/// 1-based sequence ids, as the recognizer numbers them.
	pub segments: Vec<TranscriptSegment>,
	pub language: Option<String>,
	pub duration: Option<f64>,
}

/// Options forwarded to the recognition step.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
	pub language: Option<String>,
	pub task: TaskKind,
}

/// The scarce compute collaborator.
///
/// One transcribe or diarize call at a time is the contract the admission
/// gate enforces; implementations do not need their own limiting. Model
/// internals are out of scope; this seam is all the rest of the crate sees.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
	/// # Errors
	/// Returns [`IntakeError::BackendError`] when inference fails.
	async fn transcribe(&self, media: &PreparedMedia, options: &TranscribeOptions) -> Result<RawTranscript, IntakeError>;

	/// # Errors
	/// Returns [`IntakeError::BackendError`] when inference fails.
	async fn diarize(&self, media: &PreparedMedia, num_speakers: u32) -> Result<Vec<SpeakerTurn>, IntakeError>;
}

/// Backend reached over HTTP, the way the GPU runtime is actually deployed:
/// a pod the autoscaler starts and stops, fronted by an OpenAI-style API.
pub struct RemoteBackend {
	http: reqwest::Client,
	transcribe_url: String,
	diarize_url: String,
}

#[derive(Debug, Deserialize)]
struct RemoteSegment {
	id: i64,
	start: f64,
	end: f64,
	text: String,
}

#[derive(Debug, Deserialize)]
struct RemoteTranscription {
	#[serde(default)]
	text: String,
	#[serde(default)]
	segments: Vec<RemoteSegment>,
	language: Option<String>,
	duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RemoteTurn {
	start: f64,
	end: f64,
	speaker: String,
}

#[derive(Debug, Deserialize)]
struct RemoteDiarization {
	#[serde(default)]
	turns: Vec<RemoteTurn>,
}

impl RemoteBackend {
	/// # Errors
	/// Returns an error when the HTTP client cannot be constructed.
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self, IntakeError> {
		let http = reqwest::Client::builder().timeout(timeout).build()?;
		let base = base_url.trim_end_matches('/');
		Ok(Self {
			http,
			transcribe_url: format!("{base}/v1/audio/transcriptions"),
			diarize_url: format!("{base}/v1/audio/diarization"),
		})
	}

	async fn upload(&self, url: &str, media: &PreparedMedia, fields: Vec<(&'static str, String)>) -> Result<reqwest::Response, IntakeError> {
		let bytes = media.read().await?;
		let part = reqwest::multipart::Part::bytes(bytes).file_name(media.file_name().to_string());
		let mut form = reqwest::multipart::Form::new().part("file", part);
		for (name, value) in fields {
			form = form.text(name, value);
		}

		self.http
			.post(url)
			.multipart(form)
			.send()
			.await
			.and_then(reqwest::Response::error_for_status)
			.map_err(|e| IntakeError::BackendError(e.to_string()))
	}
}

#[async_trait]
impl SpeechBackend for RemoteBackend {
	async fn transcribe(&self, media: &PreparedMedia, options: &TranscribeOptions) -> Result<RawTranscript, IntakeError> {
		let mut fields = vec![("task", options.task.as_str().to_string())];
		if let Some(language) = &options.language {
			fields.push(("language", language.clone()));
		}

		let body: RemoteTranscription = self.upload(&self.transcribe_url, media, fields).await?.json().await?;
		info!(task = options.task.as_str(), segments = body.segments.len(), language = body.language.as_deref().unwrap_or("auto"), "Transcription completed");

		Ok(RawTranscript {
			text: body.text,
			segments: body
				.segments
				.into_iter()
				.map(|s| TranscriptSegment {
					id: s.id,
					start: round2(s.start),
					end: round2(s.end),
					text: s.text,
				})
				.collect(),
			language: body.language,
			duration: body.duration,
		})
	}

	async fn diarize(&self, media: &PreparedMedia, num_speakers: u32) -> Result<Vec<SpeakerTurn>, IntakeError> {
		let fields = vec![("num_speakers", num_speakers.to_string())];

		let body: RemoteDiarization = self.upload(&self.diarize_url, media, fields).await?.json().await?;
		info!(turns = body.turns.len(), num_speakers, "Diarization completed");

		Ok(body
			.turns
			.into_iter()
			.map(|t| SpeakerTurn {
				start: round2(t.start),
				end: round2(t.end),
				speaker: canonical_speaker_label(&t.speaker),
			})
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_endpoint_urls_built_from_base() {
		let backend = RemoteBackend::new("http://gpu-pod:9000/", Duration::from_secs(5)).unwrap();
		assert_eq!(backend.transcribe_url, "http://gpu-pod:9000/v1/audio/transcriptions");
		assert_eq!(backend.diarize_url, "http://gpu-pod:9000/v1/audio/diarization");
	}

	#[test]
	fn test_remote_transcription_deserializes_with_defaults() {
		let body: RemoteTranscription = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
		assert_eq!(body.text, "hi");
		assert!(body.segments.is_empty());
		assert!(body.language.is_none());
	}
}

use crate::align::{self, round2};
use crate::backend::{SpeechBackend, TranscribeOptions};
use crate::dispatch::ResultDispatcher;
use crate::error::IntakeError;
use crate::fetch::{MediaPreparer, PreparedMedia};
use crate::job::{DiarizedSegmentPayload, SegmentPayload, TaskKind, TranscriptionRequest, TranscriptionResponse};
use serde_json::json;
use std::time::Instant;
use tracing::info;

/// Service-level defaults applied per job.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
	pub default_num_speakers: u32,
	/// Billing rate per whole second of processing.
	pub compute_rate_per_second: f64,
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			default_num_speakers: 2,
			compute_rate_per_second: 0.000_7,
		}
	}
}

/// The per-job pipeline: prepare → diarize → transcribe → align → deliver.
///
/// Holds no gate state of its own; callers decide when a job may touch the
/// compute backend. The batch executor and the synchronous HTTP path both
/// run through here.
pub struct TranscriptionService<P: MediaPreparer, B: SpeechBackend> {
	preparer: P,
	backend: B,
	dispatcher: ResultDispatcher,
	config: ServiceConfig,
}

impl<P: MediaPreparer, B: SpeechBackend> TranscriptionService<P, B> {
	pub const fn new(preparer: P, backend: B, dispatcher: ResultDispatcher, config: ServiceConfig) -> Self {
		Self {
			preparer,
			backend,
			dispatcher,
			config,
		}
	}

	/// Materialize a job's audio. I/O-bound; safe to fan out.
	///
	/// # Errors
	/// Returns a prepare/decode error when the source cannot be fetched.
	pub async fn prepare(&self, request: &TranscriptionRequest) -> Result<PreparedMedia, IntakeError> {
		self.preparer.prepare(request).await
	}

	/// Full single-job pipeline. The caller must already hold a gate slot.
	///
	/// # Errors
	/// Returns the first prepare or compute error; delivery failures are
	/// logged, not returned.
	pub async fn process(&self, request: &TranscriptionRequest) -> Result<TranscriptionResponse, IntakeError> {
		let media = self.prepare(request).await?;
		self.process_prepared(request, &media).await
	}

	/// Compute and alignment for already-prepared audio.
	///
	/// # Errors
	/// Returns a backend error when diarization or recognition fails.
	pub async fn process_prepared(&self, request: &TranscriptionRequest, media: &PreparedMedia) -> Result<TranscriptionResponse, IntakeError> {
		let started = Instant::now();

		let task = if request.translate_to_english { TaskKind::Translate } else { request.task };

		let mut num_speakers = None;
		let mut turns = Vec::new();
		if request.enable_diarization {
			let speakers = request.num_speakers.unwrap_or(self.config.default_num_speakers);
			num_speakers = Some(speakers);
			turns = self.backend.diarize(media, speakers).await?;
		}

		let options = TranscribeOptions {
			language: request.normalized_language(),
			task,
		};
		let transcript = self.backend.transcribe(media, &options).await?;

		let (diarized_text, aligned) = if turns.is_empty() {
			(transcript.text.clone(), Vec::new())
		} else {
			align::diarized_transcript(&transcript.segments, &turns, &transcript.text)
		};

		let mut translation = None;
		let mut diarized_translation = None;
		let needs_translation_pass = request.translate_to_english && transcript.language.as_deref().is_some_and(|l| !l.eq_ignore_ascii_case("en"));
		if needs_translation_pass {
			let translate_options = TranscribeOptions {
				language: transcript.language.clone(),
				task: TaskKind::Translate,
			};
			let translated = self.backend.transcribe(media, &translate_options).await?;
			if !turns.is_empty() {
				diarized_translation = Some(align::diarized_transcript(&translated.segments, &turns, &translated.text).0);
			}
			translation = Some(translated.text);
		}

		let processing_time = started.elapsed().as_secs_f64();
		let cost = processing_time.ceil() * self.config.compute_rate_per_second;

		let mut extra_data = request.extra_data.clone();
		extra_data.insert(
			"billing".to_string(),
			json!({
				"taskDuration": processing_time.ceil() as u64,
				"taskCost": round6(cost),
			}),
		);

		let segments: Vec<SegmentPayload> = transcript
			.segments
			.iter()
			.map(|s| SegmentPayload {
				id: s.id - 1,
				start: s.start,
				end: s.end,
				text: s.text.clone(),
			})
			.collect();
		let diarized_segments: Vec<DiarizedSegmentPayload> = aligned
			.iter()
			.map(|a| DiarizedSegmentPayload {
				start: a.start,
				end: a.end,
				speaker: a.speaker.clone(),
				text: a.text.clone(),
			})
			.collect();

		let response = TranscriptionResponse {
			text: transcript.text,
			diarized_text,
			translation,
			diarized_translation,
			language: transcript.language.as_ref().map(|l| l.to_uppercase()),
			duration: transcript.duration.map(round2),
			segments: if segments.is_empty() { None } else { Some(segments) },
			diarized_segments: if diarized_segments.is_empty() { None } else { Some(diarized_segments) },
			num_speakers,
			processing_time: Some(round2(processing_time)),
			cost: Some(round6(cost)),
			extra_data,
		};

		info!(
			language = response.language.as_deref().unwrap_or("unknown"),
			duration = response.duration.unwrap_or(0.0),
			processing_time = response.processing_time.unwrap_or(0.0),
			"Transcription completed"
		);

		if let Some(endpoint) = &request.dispatcher_endpoint {
			self.dispatcher.deliver(endpoint, &response).await;
		}

		Ok(response)
	}
}

fn round6(value: f64) -> f64 {
	(value * 1_000_000.0).round() / 1_000_000.0
}

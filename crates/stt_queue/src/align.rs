//! Speaker-attributed transcript construction.
//!
//! Pure functions over two independently-produced interval sets: recognition
//! segments and diarization turns. Each segment is assigned the turn it
//! overlaps most, then runs of consecutive same-speaker segments are merged.
//! Inputs are expected rounded to two decimal places; [`round2`] is the
//! canonical rounding used everywhere.

/// A recognized span of speech. Ids are the recognizer's 1-based sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
	pub id: i64,
	pub start: f64,
	pub end: f64,
	pub text: String,
}

/// A diarization-produced span with a canonical speaker label.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerTurn {
	pub start: f64,
	pub end: f64,
	pub speaker: String,
}

/// A merged, speaker-attributed span of the final transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSegment {
	pub start: f64,
	pub end: f64,
	pub speaker: String,
	pub text: String,
}

/// Round to two decimal places, the shared precision of both interval sets.
#[must_use]
pub fn round2(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}

fn overlaps(segment: &TranscriptSegment, turn: &SpeakerTurn) -> bool {
	// Any non-empty intersection counts, boundary touches included.
	!(segment.end < turn.start || segment.start > turn.end)
}

fn overlap_duration(segment: &TranscriptSegment, turn: &SpeakerTurn) -> f64 {
	segment.end.min(turn.end) - segment.start.max(turn.start)
}

/// Canonicalize a raw diarizer label to the 1-based `SPEAKER_n` scheme.
///
/// Diarization models number speakers from zero (`SPEAKER_00`); callers see
/// `SPEAKER_1`. Labels without a numeric suffix pass through unchanged.
#[must_use]
pub fn canonical_speaker_label(raw: &str) -> String {
	raw.strip_prefix("SPEAKER_")
		.and_then(|suffix| suffix.parse::<u32>().ok())
		.map_or_else(|| raw.to_string(), |n| format!("SPEAKER_{}", n + 1))
}

/// Assign each segment the turn it overlaps most, then merge consecutive
/// same-speaker runs.
///
/// Segments with no overlapping turn are dropped here; they stay visible in
/// the plain transcript. Ties go to the first turn in turn order. An empty
/// result means diarization covered nothing and the caller should fall back
/// to the plain transcript.
#[must_use]
pub fn align(segments: &[TranscriptSegment], turns: &[SpeakerTurn]) -> Vec<AlignedSegment> {
	let mut attributed: Vec<AlignedSegment> = Vec::with_capacity(segments.len());

	for segment in segments {
		let mut best: Option<(f64, &SpeakerTurn)> = None;
		for turn in turns {
			if !overlaps(segment, turn) {
				continue;
			}
			let duration = overlap_duration(segment, turn);
			if best.map_or(true, |(best_duration, _)| duration > best_duration) {
				best = Some((duration, turn));
			}
		}
		if let Some((_, turn)) = best {
			attributed.push(AlignedSegment {
				start: segment.start,
				end: segment.end,
				speaker: turn.speaker.clone(),
				text: segment.text.trim().to_string(),
			});
		}
	}

	attributed.sort_by(|a, b| a.start.total_cmp(&b.start));
	merge_consecutive(attributed)
}

/// Collapse runs of consecutive entries sharing a speaker into single spans.
///
/// Idempotent: re-running it on its own output changes nothing.
#[must_use]
pub fn merge_consecutive(entries: Vec<AlignedSegment>) -> Vec<AlignedSegment> {
	let mut merged: Vec<AlignedSegment> = Vec::with_capacity(entries.len());

	for entry in entries {
		match merged.last_mut() {
			Some(previous) if previous.speaker == entry.speaker => {
				previous.end = entry.end;
				previous.text.push(' ');
				previous.text.push_str(&entry.text);
			}
			_ => merged.push(entry),
		}
	}

	merged
}

/// Render aligned segments as the line format callers read:
/// `SPEAKER_1: [00:00:00 - 00:00:04]--hello there`, one line per segment.
#[must_use]
pub fn render_diarized_text(segments: &[AlignedSegment]) -> String {
	let mut output = String::new();
	for segment in segments {
		output.push_str(&format!(
			"{}: [{} - {}]--{}\n",
			segment.speaker,
			format_timestamp(segment.start),
			format_timestamp(segment.end),
			segment.text
		));
	}
	output
}

/// Align and render in one step, degrading to the plain transcript when
/// diarization covered none of the recognized speech.
#[must_use]
pub fn diarized_transcript(segments: &[TranscriptSegment], turns: &[SpeakerTurn], plain_text: &str) -> (String, Vec<AlignedSegment>) {
	let aligned = align(segments, turns);
	if aligned.is_empty() {
		(plain_text.to_string(), aligned)
	} else {
		(render_diarized_text(&aligned), aligned)
	}
}

/// Whole seconds rendered as `HH:MM:SS`; fractional input is rounded to the
/// shared two-decimal precision first, then truncated.
#[must_use]
pub fn format_timestamp(seconds: f64) -> String {
	let total = round2(seconds.max(0.0)).trunc() as u64;
	format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;

	fn seg(id: i64, start: f64, end: f64, text: &str) -> TranscriptSegment {
		TranscriptSegment {
			id,
			start,
			end,
			text: text.to_string(),
		}
	}

	fn turn(start: f64, end: f64, speaker: &str) -> SpeakerTurn {
		SpeakerTurn {
			start,
			end,
			speaker: speaker.to_string(),
		}
	}

	#[test]
	fn test_consecutive_same_speaker_segments_merge() {
		let segments = vec![seg(1, 0.0, 2.0, "a"), seg(2, 2.0, 4.0, "b")];
		let turns = vec![turn(0.0, 4.0, "SPEAKER_1")];

		let aligned = align(&segments, &turns);
		assert_eq!(aligned.len(), 1);
		assert_relative_eq!(aligned[0].start, 0.0);
		assert_relative_eq!(aligned[0].end, 4.0);
		assert_eq!(aligned[0].speaker, "SPEAKER_1");
		assert_eq!(aligned[0].text, "a b");
	}

	#[test]
	fn test_segment_takes_turn_with_maximum_overlap() {
		let segments = vec![seg(1, 0.0, 3.0, "hello")];
		let turns = vec![turn(0.0, 1.0, "SPEAKER_1"), turn(1.0, 3.0, "SPEAKER_2")];

		let aligned = align(&segments, &turns);
		assert_eq!(aligned.len(), 1);
		assert_eq!(aligned[0].speaker, "SPEAKER_2");
	}

	#[test]
	fn test_tie_breaks_to_first_turn_in_order() {
		let segments = vec![seg(1, 0.0, 4.0, "hello")];
		let turns = vec![turn(0.0, 2.0, "SPEAKER_2"), turn(2.0, 4.0, "SPEAKER_1")];

		let aligned = align(&segments, &turns);
		assert_eq!(aligned[0].speaker, "SPEAKER_2");
	}

	#[test]
	fn test_boundary_touch_counts_as_overlap() {
		let segments = vec![seg(1, 0.0, 2.0, "edge")];
		let turns = vec![turn(2.0, 4.0, "SPEAKER_1")];

		let aligned = align(&segments, &turns);
		assert_eq!(aligned.len(), 1);
		assert_eq!(aligned[0].speaker, "SPEAKER_1");
	}

	#[test]
	fn test_uncovered_segment_dropped_from_aligned_output() {
		let segments = vec![seg(1, 0.0, 2.0, "covered"), seg(2, 10.0, 12.0, "orphan")];
		let turns = vec![turn(0.0, 2.0, "SPEAKER_1")];

		let aligned = align(&segments, &turns);
		assert_eq!(aligned.len(), 1);
		assert_eq!(aligned[0].text, "covered");
	}

	#[test]
	fn test_no_coverage_degrades_to_plain_transcript() {
		let segments = vec![seg(1, 0.0, 2.0, "hello there")];
		let turns = vec![turn(50.0, 60.0, "SPEAKER_1")];

		let (text, aligned) = diarized_transcript(&segments, &turns, "hello there");
		assert!(aligned.is_empty());
		assert_eq!(text, "hello there");
	}

	#[test]
	fn test_merge_is_idempotent() {
		let segments = vec![seg(1, 0.0, 1.0, "a"), seg(2, 1.0, 2.0, "b"), seg(3, 2.0, 3.0, "c")];
		let turns = vec![turn(0.0, 2.0, "SPEAKER_1"), turn(2.0, 3.0, "SPEAKER_2")];

		let aligned = align(&segments, &turns);
		let remerged = merge_consecutive(aligned.clone());
		assert_eq!(aligned, remerged);
	}

	#[test]
	fn test_alternating_speakers_do_not_merge() {
		let segments = vec![seg(1, 0.0, 1.0, "hi"), seg(2, 1.0, 2.0, "yes"), seg(3, 2.0, 3.0, "bye")];
		let turns = vec![turn(0.0, 0.9, "SPEAKER_1"), turn(1.1, 1.9, "SPEAKER_2"), turn(2.1, 3.0, "SPEAKER_1")];

		let aligned = align(&segments, &turns);
		let speakers: Vec<&str> = aligned.iter().map(|a| a.speaker.as_str()).collect();
		assert_eq!(speakers, vec!["SPEAKER_1", "SPEAKER_2", "SPEAKER_1"]);
	}

	#[test]
	fn test_canonical_speaker_labels() {
		assert_eq!(canonical_speaker_label("SPEAKER_00"), "SPEAKER_1");
		assert_eq!(canonical_speaker_label("SPEAKER_01"), "SPEAKER_2");
		assert_eq!(canonical_speaker_label("SPEAKER_11"), "SPEAKER_12");
		assert_eq!(canonical_speaker_label("narrator"), "narrator");
	}

	#[test]
	fn test_timestamp_format() {
		assert_eq!(format_timestamp(0.0), "00:00:00");
		assert_eq!(format_timestamp(59.999), "00:01:00");
		assert_eq!(format_timestamp(3_723.4), "01:02:03");
	}

	#[test]
	fn test_rendered_line_format() {
		let aligned = vec![AlignedSegment {
			start: 0.0,
			end: 4.0,
			speaker: "SPEAKER_1".to_string(),
			text: "hello there".to_string(),
		}];
		assert_eq!(render_diarized_text(&aligned), "SPEAKER_1: [00:00:00 - 00:00:04]--hello there\n");
	}

	#[test]
	fn test_round2() {
		assert_relative_eq!(round2(1.006), 1.01);
		assert_relative_eq!(round2(2.344_9), 2.34);
	}
}

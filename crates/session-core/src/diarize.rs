use crate::sink::{StoredSpeakerHint, TranscriptSink};

/// A speaker-labelled time range produced by a diarization model, in seconds
/// relative to the start of the session's audio.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct DiarizationSegment {
    pub start_s: f64,
    pub end_s: f64,
    pub speaker_index: i32,
}

/// Attach speaker identity to a session's persisted words.
///
/// Each word is matched by its midpoint: the first diarization range covering
/// the midpoint wins. Transcript segments persisted at different wall-clock
/// times are aligned onto the session's audio clock through their `started_at`
/// offset from the earliest segment. Hints previously written by the same
/// provider are replaced; hints from other providers are kept. Returns the
/// number of words that received a hint.
pub fn diarize_session(
    sink: &dyn TranscriptSink,
    session_id: &str,
    diarization: &[DiarizationSegment],
    provider: &str,
) -> usize {
    let mut stored = sink.segments(session_id);
    stored.sort_by_key(|segment| segment.started_at);
    let Some(first) = stored.first() else {
        return 0;
    };
    let base = first.started_at;

    let mut hinted = 0;
    for segment in &stored {
        let offset_ms = segment.started_at - base;

        let staged: Vec<StoredSpeakerHint> = segment
            .words
            .iter()
            .filter_map(|word| {
                let mid_s = ((word.start_ms + word.end_ms) / 2 + offset_ms) as f64 / 1000.0;
                diarization
                    .iter()
                    .find(|range| range.start_s <= mid_s && mid_s < range.end_s)
                    .map(|range| StoredSpeakerHint {
                        word_id: word.id.clone(),
                        provider: provider.to_string(),
                        channel: word.channel,
                        speaker_index: range.speaker_index,
                    })
            })
            .collect();

        if staged.is_empty() {
            continue;
        }

        hinted += staged.len();
        let mut hints: Vec<StoredSpeakerHint> = segment
            .hints
            .iter()
            .filter(|hint| hint.provider != provider)
            .cloned()
            .collect();
        hints.extend(staged);
        sink.set_hints(&segment.id, hints);
    }

    tracing::debug!(words = hinted, "speaker_hints_applied");
    hinted
}

use confab_transcript::{SpeakerHint, TranscriptWord};

/// Speaker attribution as persisted. Unlike [`SpeakerHint`], it names the
/// provider that produced it, so one provider's diarization pass can replace
/// its own earlier hints without touching another's.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct StoredSpeakerHint {
    pub word_id: String,
    pub provider: String,
    pub channel: i32,
    pub speaker_index: i32,
}

/// One persisted run of words for a session.
///
/// `started_at` is wall-clock unix millis at the moment the run began
/// recording; diarization uses it to place each segment's words on a common
/// session timeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct TranscriptSegment {
    pub id: String,
    pub session_id: String,
    pub started_at: i64,
    pub words: Vec<TranscriptWord>,
    pub hints: Vec<StoredSpeakerHint>,
}

/// Persistence boundary between the engine and whatever stores transcripts.
///
/// Called from coordinator actors, so every method must return promptly:
/// `persist` is fire-and-forget, and implementations queue or write-behind
/// as they see fit.
pub trait TranscriptSink: Send + Sync {
    /// Append finalized words (with their speaker hints) for a session.
    fn persist(&self, session_id: &str, words: Vec<TranscriptWord>, hints: Vec<StoredSpeakerHint>);

    /// Every segment persisted for a session, in no particular order.
    fn segments(&self, session_id: &str) -> Vec<TranscriptSegment>;

    /// Replace the stored hints of one segment.
    fn set_hints(&self, segment_id: &str, hints: Vec<StoredSpeakerHint>);
}

/// Stamp freshly extracted speaker hints with the provider that produced
/// them.
pub fn attach_provider(hints: Vec<SpeakerHint>, provider: &str) -> Vec<StoredSpeakerHint> {
    hints
        .into_iter()
        .map(|h| StoredSpeakerHint {
            word_id: h.word_id,
            provider: provider.to_string(),
            channel: h.channel,
            speaker_index: h.speaker_index,
        })
        .collect()
}

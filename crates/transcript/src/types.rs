#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct TranscriptWord {
    pub id: String,
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub channel: i32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct PartialWord {
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub channel: i32,
}

/// Provider-reported speaker index for one finalized word.
///
/// This is a hint, not an assignment: persistence layers decide how (and
/// whether) to store it, and post-session diarization may overwrite it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct SpeakerHint {
    pub word_id: String,
    pub channel: i32,
    pub speaker_index: i32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct TranscriptUpdate {
    pub new_final_words: Vec<TranscriptWord>,
    pub speaker_hints: Vec<SpeakerHint>,
    /// Current partials across **all** channels, not a per-channel delta.
    /// When channel 0 finalizes, this field still includes channel 1's
    /// in-progress words.
    pub partial_words: Vec<PartialWord>,
}

// ── Internal pipeline type ───────────────────────────────────────────────────

/// Pre-finalization word data, the common currency of the merge pipeline.
///
/// Produced by [`crate::words::normalize`] from raw ASR tokens, buffered in
/// per-channel windows, and promoted to [`TranscriptWord`] when its window
/// finalizes or flushes. Public so callers can construct synthetic inputs
/// (tests, non-ASR sources).
#[derive(Debug, Clone, PartialEq)]
pub struct RawWord {
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub channel: i32,
    pub speaker: Option<i32>,
}

impl RawWord {
    pub fn to_final(self, id: String) -> (TranscriptWord, Option<SpeakerHint>) {
        let hint = self.speaker.map(|speaker_index| SpeakerHint {
            word_id: id.clone(),
            channel: self.channel,
            speaker_index,
        });
        let word = TranscriptWord {
            id,
            text: self.text,
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            channel: self.channel,
        };
        (word, hint)
    }

    pub fn to_partial(&self) -> PartialWord {
        PartialWord {
            text: self.text.clone(),
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            channel: self.channel,
        }
    }
}

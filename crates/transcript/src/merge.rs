use std::collections::BTreeMap;

use confab_stt_interface::{batch, stream::StreamResponse};

use super::id::{IdGenerator, UuidIdGen};
use super::types::{PartialWord, RawWord, SpeakerHint, TranscriptUpdate, TranscriptWord};
use super::window::PartialWindow;
use super::words::{finalize_words, is_chronological, normalize, normalize_batch};

/// Channel indices are small non-negative integers (0 and 1 for mic and
/// system audio). Anything outside this range is a corrupt frame.
const MAX_CHANNELS: i32 = 1000;

/// Stateful reconciler that turns interleaved partial/final `StreamResponse`s
/// into ordered, de-duplicated `TranscriptUpdate`s.
///
/// One merger per session. Each channel gets its own partial window that
/// buffers unconfirmed words; finals pass straight through and evict the
/// buffered words they supersede. `new_final_words` in the returned update is
/// exactly what the caller should persist, in order.
pub struct TranscriptMerger {
    channels: BTreeMap<i32, PartialWindow>,
    ids: Box<dyn IdGenerator>,
}

impl TranscriptMerger {
    pub fn new() -> Self {
        Self::with_ids(Box::new(UuidIdGen))
    }

    /// Construct with a custom ID source. Tests use [`crate::SequentialIdGen`]
    /// to get stable word IDs.
    pub fn with_ids(ids: Box<dyn IdGenerator>) -> Self {
        Self {
            channels: BTreeMap::new(),
            ids,
        }
    }

    /// Process one streaming response.
    ///
    /// Returns `None` for non-transcript frames, frames with no words, and
    /// frames that fail validation. Validation failures are logged and
    /// skipped; a corrupt frame never ends the session.
    pub fn process(&mut self, response: &StreamResponse) -> Option<TranscriptUpdate> {
        let (is_final, channel, channel_index) = match response {
            StreamResponse::TranscriptResponse {
                is_final,
                channel,
                channel_index,
                ..
            } => (*is_final, channel, channel_index),
            _ => return None,
        };

        let alt = channel.alternatives.first()?;
        if alt.words.is_empty() {
            return None;
        }

        let Some(&ch) = channel_index.first() else {
            tracing::warn!("transcript_frame_missing_channel_index");
            return None;
        };
        if !(0..MAX_CHANNELS).contains(&ch) {
            tracing::warn!(channel = ch, "transcript_frame_channel_out_of_range");
            return None;
        }

        let words = normalize(&alt.words, ch);
        if words.is_empty() {
            return None;
        }
        if !is_chronological(&words) {
            tracing::warn!(channel = ch, "transcript_frame_words_not_chronological");
            return None;
        }

        Some(if is_final {
            self.apply_final(ch, words)
        } else {
            self.apply_partial(ch, words)
        })
    }

    fn apply_final(&mut self, channel: i32, words: Vec<RawWord>) -> TranscriptUpdate {
        let window = self.channels.entry(channel).or_default();
        let payload = window.apply_final(words);
        let (new_final_words, speaker_hints) = finalize_words(payload, self.ids.as_mut());

        TranscriptUpdate {
            new_final_words,
            speaker_hints,
            partial_words: self.all_partials(),
        }
    }

    fn apply_partial(&mut self, channel: i32, words: Vec<RawWord>) -> TranscriptUpdate {
        self.channels
            .entry(channel)
            .or_default()
            .apply_partial(words);

        TranscriptUpdate {
            new_final_words: vec![],
            speaker_hints: vec![],
            partial_words: self.all_partials(),
        }
    }

    /// Promote everything still buffered to final and clear all windows.
    ///
    /// Called once at session end. Words the provider never confirmed are
    /// persisted as-is rather than dropped.
    pub fn flush(&mut self) -> TranscriptUpdate {
        let mut survivors = Vec::new();
        for window in self.channels.values_mut() {
            survivors.extend(window.drain());
        }
        self.channels.clear();

        let (new_final_words, speaker_hints) = finalize_words(survivors, self.ids.as_mut());

        TranscriptUpdate {
            new_final_words,
            speaker_hints,
            partial_words: vec![],
        }
    }

    /// Convert a complete batch response in one shot.
    ///
    /// Stateless apart from ID assignment: batch words are already final, so
    /// no window is involved. Channels are flattened and sorted by start time
    /// (channel index breaking ties) so a multi-channel recording persists as
    /// one chronological word list.
    pub fn process_batch(
        &mut self,
        response: &batch::Response,
    ) -> (Vec<TranscriptWord>, Vec<SpeakerHint>) {
        let mut raw = Vec::new();

        for (channel_idx, channel) in response.results.channels.iter().enumerate() {
            let Some(alt) = channel.alternatives.first() else {
                continue;
            };
            raw.extend(normalize_batch(&alt.words, channel_idx as i32));
        }

        raw.sort_by(|a, b| {
            a.start_ms
                .cmp(&b.start_ms)
                .then(a.channel.cmp(&b.channel))
        });

        finalize_words(raw, self.ids.as_mut())
    }

    /// Snapshot of buffered partials across all channels, in channel order.
    pub fn all_partials(&self) -> Vec<PartialWord> {
        self.channels
            .values()
            .flat_map(|w| w.words().iter().map(RawWord::to_partial))
            .collect()
    }
}

impl Default for TranscriptMerger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIdGen;
    use confab_stt_interface::stream::{self, Alternatives, Channel, Metadata};

    fn asr_word(text: &str, start: f64, end: f64, speaker: Option<i32>) -> stream::Word {
        stream::Word {
            word: text.trim().to_string(),
            start,
            end,
            confidence: 1.0,
            speaker,
            punctuated_word: Some(text.to_string()),
            language: None,
        }
    }

    fn response(
        words: &[(&str, f64, f64, Option<i32>)],
        is_final: bool,
        channel_index: Vec<i32>,
    ) -> StreamResponse {
        let transcript = words
            .iter()
            .map(|&(t, ..)| t.trim())
            .collect::<Vec<_>>()
            .join(" ");

        StreamResponse::TranscriptResponse {
            start: 0.0,
            duration: 0.0,
            is_final,
            speech_final: is_final,
            from_finalize: false,
            channel: Channel {
                alternatives: vec![Alternatives {
                    transcript,
                    words: words
                        .iter()
                        .map(|&(t, s, e, sp)| asr_word(t, s, e, sp))
                        .collect(),
                    confidence: 1.0,
                    languages: vec![],
                }],
            },
            metadata: Metadata::default(),
            channel_index,
        }
    }

    fn partial(words: &[(&str, f64, f64)]) -> StreamResponse {
        let ws: Vec<_> = words.iter().map(|&(t, s, e)| (t, s, e, None)).collect();
        response(&ws, false, vec![0])
    }

    fn finalized(words: &[(&str, f64, f64)]) -> StreamResponse {
        let ws: Vec<_> = words.iter().map(|&(t, s, e)| (t, s, e, None)).collect();
        response(&ws, true, vec![0])
    }

    fn merger() -> TranscriptMerger {
        TranscriptMerger::with_ids(Box::new(SequentialIdGen::new()))
    }

    fn final_texts(update: &TranscriptUpdate) -> Vec<&str> {
        update
            .new_final_words
            .iter()
            .map(|w| w.text.as_str())
            .collect()
    }

    fn partial_texts(update: &TranscriptUpdate) -> Vec<&str> {
        update
            .partial_words
            .iter()
            .map(|w| w.text.as_str())
            .collect()
    }

    // ── Partials ─────────────────────────────────────────────────────────

    #[test]
    fn partial_update_exposes_current_words() {
        let mut m = merger();

        let update = m
            .process(&partial(&[(" Hello", 0.1, 0.5), (" world", 0.6, 0.9)]))
            .unwrap();

        assert!(update.new_final_words.is_empty());
        assert_eq!(partial_texts(&update), [" Hello", " world"]);
    }

    #[test]
    fn partial_splices_into_existing_window() {
        let mut m = merger();
        m.process(&partial(&[
            (" A", 0.0, 0.1),
            (" B", 0.1, 0.2),
            (" C", 0.3, 0.4),
        ]));

        let update = m.process(&partial(&[(" X", 0.15, 0.25)])).unwrap();

        assert_eq!(partial_texts(&update), [" A", " X", " C"]);
    }

    #[test]
    fn channels_buffer_independently() {
        let mut m = merger();
        m.process(&response(&[(" mic", 0.0, 0.5, None)], false, vec![0]));
        m.process(&response(&[(" sys", 0.0, 0.5, None)], false, vec![1]));

        let update = m
            .process(&response(&[(" mic!", 0.0, 0.5, None)], true, vec![0]))
            .unwrap();

        assert_eq!(final_texts(&update), [" mic!"]);
        assert_eq!(partial_texts(&update), [" sys"]);
    }

    // ── Finals ───────────────────────────────────────────────────────────

    #[test]
    fn final_payload_is_persisted_verbatim() {
        let mut m = merger();
        m.process(&partial(&[(" hello", 0.0, 0.5), (" wor", 0.5, 0.8)]));

        let update = m
            .process(&finalized(&[(" hello", 0.0, 0.5), (" world.", 0.5, 0.9)]))
            .unwrap();

        assert_eq!(final_texts(&update), [" hello", " world."]);
        assert_eq!(update.new_final_words[0].id, "0");
        assert_eq!(update.new_final_words[1].id, "1");
        assert!(update.partial_words.is_empty());
    }

    #[test]
    fn final_keeps_partials_past_its_range() {
        let mut m = merger();
        m.process(&partial(&[
            (" a", 0.0, 0.5),
            (" b", 0.6, 1.0),
            (" c", 1.2, 1.5),
        ]));

        let update = m.process(&finalized(&[(" done", 0.0, 1.1)])).unwrap();

        assert_eq!(final_texts(&update), [" done"]);
        assert_eq!(partial_texts(&update), [" c"]);
    }

    #[test]
    fn final_extracts_speaker_hints() {
        let mut m = merger();

        let update = m
            .process(&response(&[(" hi", 0.0, 0.5, Some(2))], true, vec![0]))
            .unwrap();

        assert_eq!(update.speaker_hints.len(), 1);
        assert_eq!(update.speaker_hints[0].word_id, update.new_final_words[0].id);
        assert_eq!(update.speaker_hints[0].channel, 0);
        assert_eq!(update.speaker_hints[0].speaker_index, 2);
    }

    // ── Flush ────────────────────────────────────────────────────────────

    #[test]
    fn flush_promotes_buffered_partials() {
        let mut m = merger();
        m.process(&response(&[(" left", 0.0, 0.5, None)], false, vec![0]));
        m.process(&response(&[(" over", 0.2, 0.7, None)], false, vec![1]));

        let update = m.flush();

        assert_eq!(final_texts(&update), [" left", " over"]);
        assert!(update.partial_words.is_empty());
        assert!(m.flush().new_final_words.is_empty());
    }

    #[test]
    fn flush_carries_speaker_hints_from_partials() {
        let mut m = merger();
        m.process(&response(&[(" hi", 0.0, 0.5, Some(1))], false, vec![0]));

        let update = m.flush();

        assert_eq!(update.speaker_hints.len(), 1);
        assert_eq!(update.speaker_hints[0].speaker_index, 1);
    }

    // ── Validation ───────────────────────────────────────────────────────

    #[test]
    fn wordless_frames_are_ignored() {
        let mut m = merger();
        assert!(m.process(&partial(&[])).is_none());

        let terminal = StreamResponse::TerminalResponse {
            request_id: String::new(),
            duration: 1.0,
            channels: 1,
        };
        assert!(m.process(&terminal).is_none());
    }

    #[test]
    fn missing_channel_index_is_skipped() {
        let mut m = merger();

        let skipped = m.process(&response(&[(" hi", 0.0, 0.5, None)], false, vec![]));

        assert!(skipped.is_none());
        assert!(m.all_partials().is_empty());
    }

    #[test]
    fn out_of_range_channel_is_skipped() {
        let mut m = merger();

        assert!(m
            .process(&response(&[(" hi", 0.0, 0.5, None)], false, vec![1000]))
            .is_none());
        assert!(m
            .process(&response(&[(" hi", 0.0, 0.5, None)], false, vec![-1]))
            .is_none());
        assert!(m.all_partials().is_empty());
    }

    #[test]
    fn backwards_timestamps_are_skipped() {
        let mut m = merger();

        let skipped = m.process(&partial(&[(" late", 1.0, 1.2), (" early", 0.0, 0.5)]));

        assert!(skipped.is_none());
        assert!(m.all_partials().is_empty());
    }

    // ── Batch ────────────────────────────────────────────────────────────

    fn batch_word(text: &str, start: f64, end: f64, speaker: Option<i32>) -> batch::Word {
        batch::Word {
            word: text.trim().to_string(),
            start,
            end,
            confidence: 1.0,
            speaker,
            punctuated_word: Some(text.to_string()),
        }
    }

    fn batch_response(channels: &[&[(&str, f64, f64, Option<i32>)]]) -> batch::Response {
        batch::Response {
            results: batch::Results {
                channels: channels
                    .iter()
                    .map(|words| batch::Channel {
                        alternatives: vec![batch::Alternatives {
                            transcript: String::new(),
                            confidence: 1.0,
                            words: words
                                .iter()
                                .map(|&(t, s, e, sp)| batch_word(t, s, e, sp))
                                .collect(),
                        }],
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn batch_flattens_and_sorts_across_channels() {
        let mut m = merger();
        let response = batch_response(&[
            &[(" zero-a", 0.0, 0.5, None), (" zero-b", 1.0, 1.5, None)],
            &[(" one-a", 0.2, 0.6, None)],
        ]);

        let (words, _) = m.process_batch(&response);

        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, [" zero-a", " one-a", " zero-b"]);
        let channels: Vec<_> = words.iter().map(|w| w.channel).collect();
        assert_eq!(channels, [0, 1, 0]);
    }

    #[test]
    fn batch_extracts_speaker_hints() {
        let mut m = merger();
        let response = batch_response(&[&[(" hi", 0.0, 0.5, Some(4))]]);

        let (words, hints) = m.process_batch(&response);

        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].word_id, words[0].id);
        assert_eq!(hints[0].speaker_index, 4);
    }
}

use confab_stt_interface::{batch, stream};

use super::id::IdGenerator;
use super::types::{RawWord, SpeakerHint, TranscriptWord};

// ── Normalization ─────────────────────────────────────────────────────────────

/// Convert streaming ASR tokens into `RawWord`s.
///
/// The punctuated form wins over the bare token when the provider sends one.
/// Blank tokens are dropped, every surviving word gets a leading space, and
/// provider timestamps (seconds, f64) become millisecond integers. This is
/// the only place word text is shaped; everything downstream assumes
/// `RawWord` text is already display-ready.
pub(crate) fn normalize(raw: &[stream::Word], channel: i32) -> Vec<RawWord> {
    raw.iter()
        .filter_map(|w| {
            let text = spaced_text(&w.word, w.punctuated_word.as_deref())?;
            Some(RawWord {
                text,
                start_ms: to_ms(w.start),
                end_ms: to_ms(w.end),
                channel,
                speaker: w.speaker,
            })
        })
        .collect()
}

/// Same shaping for batch words. Channel index comes from the caller (the
/// word's position in the `results.channels` array).
pub(crate) fn normalize_batch(raw: &[batch::Word], channel: i32) -> Vec<RawWord> {
    raw.iter()
        .filter_map(|w| {
            let text = spaced_text(&w.word, w.punctuated_word.as_deref())?;
            Some(RawWord {
                text,
                start_ms: to_ms(w.start),
                end_ms: to_ms(w.end),
                channel,
                speaker: w.speaker,
            })
        })
        .collect()
}

fn spaced_text(word: &str, punctuated: Option<&str>) -> Option<String> {
    let text = punctuated.unwrap_or(word);
    if text.trim().is_empty() {
        return None;
    }
    let mut text = text.to_string();
    if !text.starts_with(' ') {
        text.insert(0, ' ');
    }
    Some(text)
}

fn to_ms(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

/// Providers emit words in utterance order. A response that violates this
/// (start times going backwards) is malformed and gets skipped upstream.
pub(crate) fn is_chronological(words: &[RawWord]) -> bool {
    words.windows(2).all(|pair| pair[0].start_ms <= pair[1].start_ms)
}

// ── Window splice ─────────────────────────────────────────────────────────────

/// Replace the time range covered by `incoming` inside `existing`.
///
/// Keeps existing words that end at or before the incoming range starts,
/// then the incoming words, then existing words that start at or after the
/// incoming range ends. The range end is the **max** end across incoming
/// words, not the last word's: a long word early in the batch can cover
/// later short ones.
///
/// `incoming` must be chronologically ordered; the merger validates that
/// before calling in.
pub(crate) fn splice(existing: &[RawWord], incoming: Vec<RawWord>) -> Vec<RawWord> {
    let Some(range_start) = incoming.first().map(|w| w.start_ms) else {
        return existing.to_vec();
    };
    let range_end = incoming
        .iter()
        .map(|w| w.end_ms)
        .max()
        .unwrap_or(range_start);

    let before = existing.iter().filter(|w| w.end_ms <= range_start).cloned();
    let after = existing.iter().filter(|w| w.start_ms >= range_end).cloned();

    before.chain(incoming).chain(after).collect()
}

// ── Finalization ──────────────────────────────────────────────────────────────

/// Promote `RawWord`s to `TranscriptWord`s, assigning IDs and extracting
/// speaker hints for words the provider tagged.
pub(crate) fn finalize_words(
    words: Vec<RawWord>,
    ids: &mut dyn IdGenerator,
) -> (Vec<TranscriptWord>, Vec<SpeakerHint>) {
    let mut final_words = Vec::with_capacity(words.len());
    let mut hints = Vec::new();

    for w in words {
        let (word, hint) = w.to_final(ids.next_id());
        hints.extend(hint);
        final_words.push(word);
    }

    (final_words, hints)
}

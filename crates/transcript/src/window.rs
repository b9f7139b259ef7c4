use super::types::RawWord;
use super::words::splice;

/// Hard cap on buffered partials per channel. A stream that keeps sending
/// partials without ever finalizing hits this; the oldest words are dropped.
const MAX_BUFFERED_WORDS: usize = 1000;

/// Buffered partials further than this behind the newest buffered word are
/// dropped.
const MAX_PARTIAL_AGE_MS: i64 = 300_000;

/// Per-channel buffer of unconfirmed (partial) words.
///
/// Partials replace each other by time range. Finals never enter the buffer;
/// they pass through and evict the buffered words they supersede.
#[derive(Default)]
pub(crate) struct PartialWindow {
    buffer: Vec<RawWord>,
}

impl PartialWindow {
    /// Apply a confirmed final batch.
    ///
    /// Buffered words whose start lies at or before the final's cutoff (the
    /// max end across incoming words) are superseded and dropped; words past
    /// the cutoff survive. Returns the incoming words unchanged: the final
    /// payload is what gets persisted, never a mix with buffered partials.
    pub(crate) fn apply_final(&mut self, words: Vec<RawWord>) -> Vec<RawWord> {
        let Some(cutoff) = words.iter().map(|w| w.end_ms).max() else {
            return words;
        };
        self.buffer.retain(|w| w.start_ms > cutoff);
        words
    }

    /// Splice a partial batch into the buffer, then enforce retention bounds.
    pub(crate) fn apply_partial(&mut self, words: Vec<RawWord>) {
        if words.is_empty() {
            return;
        }
        self.buffer = splice(&self.buffer, words);
        self.enforce_bounds();
    }

    /// Hand over the whole buffer. Called at session end, where survivors are
    /// promoted to final rather than dropped.
    pub(crate) fn drain(&mut self) -> Vec<RawWord> {
        std::mem::take(&mut self.buffer)
    }

    pub(crate) fn words(&self) -> &[RawWord] {
        &self.buffer
    }

    fn enforce_bounds(&mut self) {
        let Some(newest) = self.buffer.iter().map(|w| w.end_ms).max() else {
            return;
        };
        self.buffer
            .retain(|w| newest - w.end_ms <= MAX_PARTIAL_AGE_MS);

        if self.buffer.len() > MAX_BUFFERED_WORDS {
            let excess = self.buffer.len() - MAX_BUFFERED_WORDS;
            self.buffer.drain(..excess);
        }
    }
}

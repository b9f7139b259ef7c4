mod batch;
mod live;

pub use batch::{BatchActor, BatchArgs, BatchMsg};
pub use live::{LiveActor, LiveArgs, LiveMsg};

use confab_transcript::TranscriptUpdate;

use crate::sink::{TranscriptSink, attach_provider};

pub(crate) fn session_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("session", session_id = %session_id)
}

/// Persist an update's new final words, attaching the provider to its
/// speaker hints. Updates without final words are skipped.
pub(crate) fn persist_update(
    sink: &dyn TranscriptSink,
    session_id: &str,
    provider: &str,
    update: TranscriptUpdate,
) {
    if update.new_final_words.is_empty() {
        return;
    }
    let hints = attach_provider(update.speaker_hints, provider);
    sink.persist(session_id, update.new_final_words, hints);
}

/// Map raw provider/transport error strings onto something a user can act
/// on. Unrecognized errors pass through unchanged.
pub(crate) fn format_user_friendly_error(error: &str) -> String {
    let error_lower = error.to_lowercase();

    if error_lower.contains("401") || error_lower.contains("unauthorized") {
        return "Authentication failed. Please check your API key in settings.".to_string();
    }
    if error_lower.contains("403") || error_lower.contains("forbidden") {
        return "Access denied. Your API key may not have permission for this operation."
            .to_string();
    }
    if error_lower.contains("429") || error_lower.contains("rate limit") {
        return "Rate limit exceeded. Please wait a moment and try again.".to_string();
    }
    if error_lower.contains("timeout") {
        return "Connection timed out. Please check your internet connection and try again."
            .to_string();
    }
    if error_lower.contains("connection refused")
        || error_lower.contains("failed to connect")
        || error_lower.contains("network")
    {
        return "Could not connect to the transcription service. Please check your internet connection.".to_string();
    }
    if error_lower.contains("invalid audio")
        || error_lower.contains("unsupported format")
        || error_lower.contains("codec")
    {
        return "The audio file format is not supported. Please try a different file.".to_string();
    }
    if error_lower.contains("file not found") || error_lower.contains("no such file") {
        return "Audio file not found. The recording may have been moved or deleted.".to_string();
    }

    error.to_string()
}

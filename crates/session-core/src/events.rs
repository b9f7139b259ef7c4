use confab_stt_interface::batch::Response as BatchResponse;
use confab_stt_interface::stream::StreamResponse;

/// Events published by a live capture pipeline.
///
/// `Active` and `Inactive` carry an optional error: a degraded start (audio
/// device fell back, recognition still running) and a pipeline death both
/// surface here rather than through a separate error channel.
#[derive(serde::Serialize, Clone)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
#[serde(tag = "type")]
pub enum CaptureEvent {
    #[serde(rename = "active")]
    Active {
        session_id: String,
        error: Option<String>,
    },
    #[serde(rename = "finalizing")]
    Finalizing { session_id: String },
    #[serde(rename = "streamedResult")]
    Response {
        session_id: String,
        response: StreamResponse,
    },
    /// Throttled audio level readout for meters. Carries no transcript data.
    #[serde(rename = "amplitude")]
    Amplitude {
        session_id: String,
        mic: u16,
        speaker: u16,
    },
    #[serde(rename = "inactive")]
    Inactive {
        session_id: String,
        error: Option<String>,
    },
}

impl CaptureEvent {
    pub fn session_id(&self) -> &str {
        match self {
            CaptureEvent::Active { session_id, .. }
            | CaptureEvent::Finalizing { session_id }
            | CaptureEvent::Response { session_id, .. }
            | CaptureEvent::Amplitude { session_id, .. }
            | CaptureEvent::Inactive { session_id, .. } => session_id,
        }
    }
}

/// Events published by a batch transcription pipeline.
///
/// Protocol per job: `BatchStarted`, then zero or more
/// `BatchResponseStreamed` chunks, then either a single-shot `BatchResponse`
/// or a `BatchFailed`. Streaming providers may end with a final chunk whose
/// `from_finalize` flag is set instead of a `BatchResponse`.
#[derive(serde::Serialize, Clone)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
#[serde(tag = "type")]
pub enum BatchEvent {
    #[serde(rename = "batchStarted")]
    BatchStarted { session_id: String },
    #[serde(rename = "batchResponse")]
    BatchResponse {
        session_id: String,
        response: BatchResponse,
    },
    #[serde(rename = "batchProgress")]
    BatchResponseStreamed {
        session_id: String,
        response: StreamResponse,
        /// Fraction of the source file covered so far, in `0.0..=1.0`.
        percentage: f64,
    },
    #[serde(rename = "batchFailed")]
    BatchFailed { session_id: String, error: String },
}

impl BatchEvent {
    pub fn session_id(&self) -> &str {
        match self {
            BatchEvent::BatchStarted { session_id }
            | BatchEvent::BatchResponse { session_id, .. }
            | BatchEvent::BatchResponseStreamed { session_id, .. }
            | BatchEvent::BatchFailed { session_id, .. } => session_id,
        }
    }
}

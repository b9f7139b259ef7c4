use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use confab_stt_interface::batch;
use confab_stt_interface::stream::{self, StreamResponse};
use confab_transcript::TranscriptWord;
use session_core::{
    BatchEvent, BatchJobParams, BatchPipeline, CaptureEvent, CapturePipeline, Error,
    LiveSessionParams, SessionEngine, StoredSpeakerHint, TranscriptSegment, TranscriptSink,
};

pub const TIMEOUT: Duration = Duration::from_secs(2);

// ── Pipelines ────────────────────────────────────────────────────────────

pub struct FakeCapture {
    events: broadcast::Sender<CaptureEvent>,
    started: Mutex<Vec<LiveSessionParams>>,
    stopped: Mutex<Vec<String>>,
    fail_start: AtomicBool,
}

impl FakeCapture {
    pub fn new() -> Self {
        Self {
            events: broadcast::channel(64).0,
            started: Mutex::new(Vec::new()),
            stopped: Mutex::new(Vec::new()),
            fail_start: AtomicBool::new(false),
        }
    }

    pub fn emit(&self, event: CaptureEvent) {
        let _ = self.events.send(event);
    }

    pub fn fail_next_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn started(&self) -> Vec<LiveSessionParams> {
        self.started.lock().unwrap().clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CapturePipeline for FakeCapture {
    async fn start(&self, params: &LiveSessionParams) -> session_core::Result<()> {
        if self.fail_start.swap(false, Ordering::SeqCst) {
            return Err(Error::CaptureStartFailed("audio device unavailable".into()));
        }
        self.started.lock().unwrap().push(params.clone());
        Ok(())
    }

    async fn stop(&self, session_id: &str) -> session_core::Result<()> {
        self.stopped.lock().unwrap().push(session_id.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }
}

pub struct FakeBatch {
    events: broadcast::Sender<BatchEvent>,
    started: Mutex<Vec<BatchJobParams>>,
    fail_start: AtomicBool,
}

impl FakeBatch {
    pub fn new() -> Self {
        Self {
            events: broadcast::channel(64).0,
            started: Mutex::new(Vec::new()),
            fail_start: AtomicBool::new(false),
        }
    }

    pub fn emit(&self, event: BatchEvent) {
        let _ = self.events.send(event);
    }

    pub fn fail_next_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn started(&self) -> Vec<BatchJobParams> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BatchPipeline for FakeBatch {
    async fn start(&self, params: &BatchJobParams) -> session_core::Result<()> {
        if self.fail_start.swap(false, Ordering::SeqCst) {
            return Err(Error::BatchStartFailed("file not found".into()));
        }
        self.started.lock().unwrap().push(params.clone());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.events.subscribe()
    }
}

// ── Sink ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    segments: Mutex<Vec<TranscriptSegment>>,
    next_started_at: AtomicI64,
}

impl RecordingSink {
    /// Word texts per persisted segment, in persistence order.
    pub fn texts(&self, session_id: &str) -> Vec<Vec<String>> {
        self.segments
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.session_id == session_id)
            .map(|s| s.words.iter().map(|w| w.text.clone()).collect())
            .collect()
    }

    pub fn hints(&self, session_id: &str) -> Vec<StoredSpeakerHint> {
        self.segments
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.session_id == session_id)
            .flat_map(|s| s.hints.clone())
            .collect()
    }
}

impl TranscriptSink for RecordingSink {
    fn persist(
        &self,
        session_id: &str,
        words: Vec<TranscriptWord>,
        hints: Vec<StoredSpeakerHint>,
    ) {
        let mut segments = self.segments.lock().unwrap();
        let id = format!("segment-{}", segments.len());
        segments.push(TranscriptSegment {
            id,
            session_id: session_id.to_string(),
            started_at: self.next_started_at.fetch_add(1, Ordering::SeqCst),
            words,
            hints,
        });
    }

    fn segments(&self, session_id: &str) -> Vec<TranscriptSegment> {
        self.segments
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.session_id == session_id)
            .cloned()
            .collect()
    }

    fn set_hints(&self, segment_id: &str, hints: Vec<StoredSpeakerHint>) {
        if let Some(segment) = self
            .segments
            .lock()
            .unwrap()
            .iter_mut()
            .find(|s| s.id == segment_id)
        {
            segment.hints = hints;
        }
    }
}

// ── Frames ───────────────────────────────────────────────────────────────

fn build_frame(
    words: &[(&str, f64, f64)],
    is_final: bool,
    from_finalize: bool,
    channel: i32,
) -> StreamResponse {
    let transcript = words
        .iter()
        .map(|&(t, ..)| t)
        .collect::<Vec<_>>()
        .join(" ");

    StreamResponse::TranscriptResponse {
        start: words.first().map(|&(_, s, _)| s).unwrap_or(0.0),
        duration: 0.0,
        is_final,
        speech_final: is_final,
        from_finalize,
        channel: stream::Channel {
            alternatives: vec![stream::Alternatives {
                transcript,
                words: words
                    .iter()
                    .map(|&(t, s, e)| stream::Word {
                        word: t.trim_end_matches(['.', ',']).to_string(),
                        start: s,
                        end: e,
                        confidence: 1.0,
                        speaker: None,
                        punctuated_word: Some(t.to_string()),
                        language: None,
                    })
                    .collect(),
                confidence: 1.0,
                languages: vec![],
            }],
        },
        metadata: stream::Metadata::default(),
        channel_index: vec![channel],
    }
}

pub fn frame(words: &[(&str, f64, f64)], is_final: bool) -> StreamResponse {
    build_frame(words, is_final, false, 0)
}

pub fn channel_frame(words: &[(&str, f64, f64)], is_final: bool, channel: i32) -> StreamResponse {
    build_frame(words, is_final, false, channel)
}

pub fn finalize_frame(words: &[(&str, f64, f64)]) -> StreamResponse {
    build_frame(words, true, true, 0)
}

pub fn batch_payload(words: &[(&str, f64, f64, i32)]) -> batch::Response {
    let transcript = words
        .iter()
        .map(|&(t, ..)| t)
        .collect::<Vec<_>>()
        .join(" ");

    batch::Response {
        results: batch::Results {
            channels: vec![batch::Channel {
                alternatives: vec![batch::Alternatives {
                    transcript,
                    confidence: 1.0,
                    words: words
                        .iter()
                        .map(|&(t, s, e, speaker)| batch::Word {
                            word: t.trim_end_matches(['.', ',']).to_string(),
                            start: s,
                            end: e,
                            confidence: 1.0,
                            speaker: Some(speaker),
                            punctuated_word: Some(t.to_string()),
                        })
                        .collect(),
                }],
            }],
        },
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

pub struct EngineHandle {
    pub engine: SessionEngine,
    pub capture: Arc<FakeCapture>,
    pub batch: Arc<FakeBatch>,
    pub sink: Arc<RecordingSink>,
}

pub async fn spawn_engine() -> EngineHandle {
    let capture = Arc::new(FakeCapture::new());
    let batch = Arc::new(FakeBatch::new());
    let sink = Arc::new(RecordingSink::default());

    let engine = SessionEngine::spawn(capture.clone(), batch.clone(), sink.clone())
        .await
        .expect("failed to spawn engine");

    EngineHandle {
        engine,
        capture,
        batch,
        sink,
    }
}

pub fn live_params(session_id: &str) -> LiveSessionParams {
    LiveSessionParams {
        session_id: session_id.to_string(),
        provider: "fake-live".to_string(),
    }
}

pub fn batch_params(session_id: &str) -> BatchJobParams {
    BatchJobParams {
        session_id: session_id.to_string(),
        provider: "fake-batch".to_string(),
        file_path: "meeting.wav".to_string(),
    }
}

pub async fn poll_first<T>(mut f: impl FnMut() -> Option<T>, timeout: Duration) -> T {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(v) = f() {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;

use confab_stt_interface::batch;
use confab_stt_interface::stream::{self, StreamResponse};
use confab_transcript::TranscriptWord;
use session_core::{
    BatchEvent, BatchJobParams, BatchPipeline, CaptureEvent, CapturePipeline, DiarizationSegment,
    LiveSessionParams, SessionEngine, SessionMode, StoredSpeakerHint, TranscriptSegment,
    TranscriptSink,
};

struct ReplayCapture {
    events: broadcast::Sender<CaptureEvent>,
}

#[async_trait::async_trait]
impl CapturePipeline for ReplayCapture {
    async fn start(&self, params: &LiveSessionParams) -> session_core::Result<()> {
        let events = self.events.clone();
        let session_id = params.session_id.clone();
        tokio::spawn(async move {
            let _ = events.send(CaptureEvent::Active {
                session_id: session_id.clone(),
                error: None,
            });
            let script = [
                (200, frame(&[("Hello", 0.0, 0.4)], false)),
                (
                    250,
                    frame(&[("Hello", 0.0, 0.4), ("there", 0.4, 0.8)], false),
                ),
                (
                    250,
                    frame(
                        &[
                            ("Hello", 0.0, 0.4),
                            ("there,", 0.4, 0.8),
                            ("welcome.", 0.8, 1.4),
                        ],
                        true,
                    ),
                ),
            ];
            for (delay_ms, response) in script {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                let _ = events.send(CaptureEvent::Response {
                    session_id: session_id.clone(),
                    response,
                });
            }
        });
        Ok(())
    }

    async fn stop(&self, session_id: &str) -> session_core::Result<()> {
        let _ = self.events.send(CaptureEvent::Finalizing {
            session_id: session_id.to_string(),
        });
        let _ = self.events.send(CaptureEvent::Inactive {
            session_id: session_id.to_string(),
            error: None,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }
}

struct ReplayBatch {
    events: broadcast::Sender<BatchEvent>,
}

#[async_trait::async_trait]
impl BatchPipeline for ReplayBatch {
    async fn start(&self, params: &BatchJobParams) -> session_core::Result<()> {
        let events = self.events.clone();
        let session_id = params.session_id.clone();
        tokio::spawn(async move {
            let _ = events.send(BatchEvent::BatchStarted {
                session_id: session_id.clone(),
            });
            tokio::time::sleep(Duration::from_millis(150)).await;
            let _ = events.send(BatchEvent::BatchResponseStreamed {
                session_id: session_id.clone(),
                response: frame(&[("Quarterly", 0.0, 0.5), ("planning", 0.5, 1.0)], false),
                percentage: 0.5,
            });
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = events.send(BatchEvent::BatchResponse {
                session_id,
                response: batch_payload(&[
                    ("Quarterly", 0.0, 0.5, 0),
                    ("planning", 0.5, 1.0, 0),
                    ("meeting.", 1.0, 1.6, 1),
                ]),
            });
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
struct ConsoleSink {
    segments: Mutex<Vec<TranscriptSegment>>,
}

impl TranscriptSink for ConsoleSink {
    fn persist(
        &self,
        session_id: &str,
        words: Vec<TranscriptWord>,
        hints: Vec<StoredSpeakerHint>,
    ) {
        let text: String = words.iter().map(|w| w.text.as_str()).collect();
        eprintln!("[sink] +{} words session={session_id}:{text}", words.len());

        let mut segments = self.segments.lock().unwrap();
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        let id = format!("segment-{}", segments.len());
        segments.push(TranscriptSegment {
            id,
            session_id: session_id.to_string(),
            started_at,
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
        eprintln!("[sink] hints segment={segment_id} count={}", hints.len());
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

fn frame(words: &[(&str, f64, f64)], is_final: bool) -> StreamResponse {
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
        from_finalize: false,
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
        channel_index: vec![0],
    }
}

fn batch_payload(words: &[(&str, f64, f64, i32)]) -> batch::Response {
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

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let (capture_tx, _) = broadcast::channel(64);
    let (batch_tx, _) = broadcast::channel(64);
    let sink = Arc::new(ConsoleSink::default());

    let engine = SessionEngine::spawn(
        Arc::new(ReplayCapture { events: capture_tx }),
        Arc::new(ReplayBatch { events: batch_tx }),
        sink.clone(),
    )
    .await
    .expect("failed to spawn engine");

    let live_id = uuid::Uuid::new_v4().to_string();
    eprintln!("Starting live session {live_id}...");

    let started = engine
        .start_live(LiveSessionParams {
            session_id: live_id.clone(),
            provider: "replay".into(),
        })
        .await
        .expect("failed to start live session");
    if !started {
        eprintln!("Session not idle");
        std::process::exit(1);
    }

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let elapsed = engine
        .elapsed_of(&live_id)
        .await
        .expect("failed to query elapsed");
    eprintln!("[mode] {:?} elapsed={elapsed:?}s", engine.mode_of(&live_id));

    eprintln!("Stopping live session...");
    engine
        .stop_live()
        .await
        .expect("failed to stop live session");
    tokio::time::sleep(Duration::from_millis(200)).await;

    let batch_id = uuid::Uuid::new_v4().to_string();
    eprintln!("Importing file for session {batch_id}...");

    let started = engine
        .run_batch(BatchJobParams {
            session_id: batch_id.clone(),
            provider: "replay-batch".into(),
            file_path: "meeting.wav".into(),
        })
        .await
        .expect("failed to start batch job");
    if !started {
        eprintln!("Session not idle");
        std::process::exit(1);
    }

    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        match engine.mode_of(&batch_id) {
            SessionMode::BatchRunning(progress) => {
                eprintln!("[mode] batch {:.0}% {:?}", progress.percent, progress.phase);
            }
            SessionMode::Idle => break,
            other => eprintln!("[mode] {other:?}"),
        }
    }

    let diarization = vec![
        DiarizationSegment {
            start_s: 0.0,
            end_s: 0.6,
            speaker_index: 0,
        },
        DiarizationSegment {
            start_s: 0.6,
            end_s: 5.0,
            speaker_index: 1,
        },
    ];
    let hinted = engine.diarize(&live_id, &diarization, "sortformer");
    eprintln!("[diarize] hinted {hinted} words");

    for session_id in [&live_id, &batch_id] {
        for segment in sink.segments(session_id) {
            println!("{}", serde_json::to_string(&segment).unwrap_or_default());
        }
    }

    engine.shutdown().await;
    eprintln!("Done.");
}

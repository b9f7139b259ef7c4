use std::sync::Arc;

use ractor::{Actor, ActorRef};
use tokio::task::JoinHandle;

use crate::actors::{BatchActor, BatchArgs, BatchMsg, LiveActor, LiveArgs, LiveMsg};
use crate::diarize::{DiarizationSegment, diarize_session};
use crate::pipeline::{BatchJobParams, BatchPipeline, CapturePipeline, LiveSessionParams};
use crate::registry::{BatchProgress, SessionMode, SessionRegistry};
use crate::sink::TranscriptSink;

/// Single entry point for session coordination.
///
/// Owns the live and batch coordinator actors plus the shared mode registry
/// that keeps the two sides mutually exclusive per session. All transcript
/// output flows into the sink handed to [`SessionEngine::spawn`].
pub struct SessionEngine {
    live: ActorRef<LiveMsg>,
    batch: ActorRef<BatchMsg>,
    live_handle: JoinHandle<()>,
    batch_handle: JoinHandle<()>,
    registry: SessionRegistry,
    sink: Arc<dyn TranscriptSink>,
}

impl SessionEngine {
    pub async fn spawn(
        capture: Arc<dyn CapturePipeline>,
        batch: Arc<dyn BatchPipeline>,
        sink: Arc<dyn TranscriptSink>,
    ) -> crate::Result<Self> {
        let registry = SessionRegistry::new();

        let (live_ref, live_handle) = Actor::spawn(
            None,
            LiveActor,
            LiveArgs {
                pipeline: capture,
                sink: sink.clone(),
                registry: registry.clone(),
            },
        )
        .await?;

        let (batch_ref, batch_handle) = Actor::spawn(
            None,
            BatchActor,
            BatchArgs {
                pipeline: batch,
                sink: sink.clone(),
                registry: registry.clone(),
            },
        )
        .await?;

        Ok(Self {
            live: live_ref,
            batch: batch_ref,
            live_handle,
            batch_handle,
            registry,
            sink,
        })
    }

    /// Start a live capture session. Returns `Ok(false)` when the session is
    /// not idle or another live session is already running.
    pub async fn start_live(&self, params: LiveSessionParams) -> crate::Result<bool> {
        ractor::call!(self.live, LiveMsg::Start, params)
            .map_err(|e| crate::Error::Coordinator(e.to_string()))?
    }

    /// Stop the running live session. A no-op when nothing is running.
    pub async fn stop_live(&self) -> crate::Result<()> {
        ractor::call!(self.live, LiveMsg::Stop)
            .map_err(|e| crate::Error::Coordinator(e.to_string()))?
    }

    /// Seconds the live session has been capturing, or `None` if `session_id`
    /// is not the running session.
    pub async fn elapsed_of(&self, session_id: &str) -> crate::Result<Option<u64>> {
        ractor::call!(self.live, LiveMsg::Elapsed, session_id.to_string())
            .map_err(|e| crate::Error::Coordinator(e.to_string()))
    }

    /// Start a batch transcription job. Returns `Ok(false)` when the session
    /// is not idle or a job for it is already running.
    pub async fn run_batch(&self, params: BatchJobParams) -> crate::Result<bool> {
        ractor::call!(self.batch, BatchMsg::Run, params)
            .map_err(|e| crate::Error::Coordinator(e.to_string()))?
    }

    pub fn mode_of(&self, session_id: &str) -> SessionMode {
        self.registry.mode_of(session_id)
    }

    pub fn progress_of(&self, session_id: &str) -> Option<BatchProgress> {
        self.registry.progress_of(session_id)
    }

    /// Run speaker attribution over the session's persisted transcript.
    pub fn diarize(
        &self,
        session_id: &str,
        diarization: &[DiarizationSegment],
        provider: &str,
    ) -> usize {
        diarize_session(self.sink.as_ref(), session_id, diarization, provider)
    }

    /// Stop both coordinators and wait for them to wind down. Any running
    /// live session is finalized and buffered partials are flushed; running
    /// batch jobs are cancelled without flushing.
    pub async fn shutdown(self) {
        self.live.stop(None);
        self.batch.stop(None);
        let _ = self.live_handle.await;
        let _ = self.batch_handle.await;
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tracing::Instrument;

use confab_transcript::TranscriptMerger;

use super::{format_user_friendly_error, persist_update, session_span};
use crate::events::BatchEvent;
use crate::pipeline::{BatchJobParams, BatchPipeline, Subscription};
use crate::registry::{BatchPhase, BatchProgress, SessionRegistry};
use crate::sink::{TranscriptSink, attach_provider};

pub enum BatchMsg {
    Run(BatchJobParams, RpcReplyPort<crate::Result<bool>>),
    Job(Box<BatchEvent>),
}

pub struct BatchArgs {
    pub pipeline: Arc<dyn BatchPipeline>,
    pub sink: Arc<dyn TranscriptSink>,
    pub registry: SessionRegistry,
}

struct BatchJob {
    params: BatchJobParams,
    merger: TranscriptMerger,
    subscription: Option<Subscription>,
}

pub struct BatchState {
    pipeline: Arc<dyn BatchPipeline>,
    sink: Arc<dyn TranscriptSink>,
    registry: SessionRegistry,
    jobs: HashMap<String, BatchJob>,
}

#[derive(Debug)]
enum JobOutcome {
    /// Terminal progress chunk seen; buffered partials get flushed.
    Completed,
    /// Single-shot response persisted; it supersedes the partial window.
    Delivered,
    /// Provider reported failure; nothing further is persisted.
    Failed,
    /// Actor shutting down; the job is dropped without flushing.
    Cancelled,
}

/// Coordinator for batch (file import) transcription jobs.
///
/// One job per session id, any number of sessions at once. Jobs live in a
/// table keyed by session id; an event whose session misses the table is a
/// late arrival for a finished job and is ignored, which is what makes the
/// cleanup path safe to reach from every terminal branch.
pub struct BatchActor;

#[ractor::async_trait]
impl Actor for BatchActor {
    type Msg = BatchMsg;
    type State = BatchState;
    type Arguments = BatchArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(BatchState {
            pipeline: args.pipeline,
            sink: args.sink,
            registry: args.registry,
            jobs: HashMap::new(),
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            BatchMsg::Run(params, reply) => {
                let result = run_batch_impl(myself, params, state).await;
                let _ = reply.send(result);
            }
            BatchMsg::Job(event) => {
                handle_job_event(*event, state).await;
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let session_ids: Vec<String> = state.jobs.keys().cloned().collect();
        for session_id in session_ids {
            let span = session_span(&session_id);
            finish_job(state, &session_id, JobOutcome::Cancelled)
                .instrument(span)
                .await;
        }
        Ok(())
    }
}

async fn run_batch_impl(
    myself: ActorRef<BatchMsg>,
    params: BatchJobParams,
    state: &mut BatchState,
) -> crate::Result<bool> {
    let span = session_span(&params.session_id);

    async {
        if state.jobs.contains_key(&params.session_id) {
            tracing::warn!("batch_already_running");
            return Ok(false);
        }
        if !state.registry.try_enter_batch(&params.session_id) {
            tracing::warn!("session_not_idle");
            return Ok(false);
        }

        // Subscribe before issuing the start command so no early event is
        // missed; the forwarder filters on session id.
        let subscription = {
            let session_id = params.session_id.clone();
            Subscription::spawn(state.pipeline.subscribe(), move |event: BatchEvent| {
                if event.session_id() == session_id {
                    let _ = myself.send_message(BatchMsg::Job(Box::new(event)));
                }
            })
        };

        if let Err(e) = state.pipeline.start(&params).await {
            tracing::error!(error = %e, "failed_to_start_batch");
            subscription.cancel().await;
            state.registry.release(&params.session_id);
            return Err(e);
        }

        tracing::info!(file = %params.file_path, "batch_started");
        state.jobs.insert(
            params.session_id.clone(),
            BatchJob {
                params,
                merger: TranscriptMerger::new(),
                subscription: Some(subscription),
            },
        );
        Ok(true)
    }
    .instrument(span)
    .await
}

async fn handle_job_event(event: BatchEvent, state: &mut BatchState) {
    let session_id = event.session_id().to_string();
    if !state.jobs.contains_key(&session_id) {
        tracing::debug!(%session_id, "batch_event_without_job");
        return;
    }
    let span = session_span(&session_id);

    match event {
        BatchEvent::BatchStarted { .. } => {
            let _guard = span.enter();
            tracing::info!("batch_pipeline_started");
        }

        BatchEvent::BatchResponseStreamed {
            response,
            percentage,
            ..
        } => {
            let finished = {
                let _guard = span.enter();
                let Some(job) = state.jobs.get_mut(&session_id) else {
                    return;
                };

                state.registry.mark_batch_progress(
                    &session_id,
                    BatchProgress {
                        percent: (percentage * 100.0) as f32,
                        phase: BatchPhase::Transcribing,
                    },
                );

                if let Some(update) = job.merger.process(&response) {
                    persist_update(
                        state.sink.as_ref(),
                        &session_id,
                        &job.params.provider,
                        update,
                    );
                }

                response.is_from_finalize()
            };

            if finished {
                finish_job(state, &session_id, JobOutcome::Completed)
                    .instrument(span)
                    .await;
            }
        }

        BatchEvent::BatchResponse { response, .. } => {
            {
                let _guard = span.enter();
                let Some(job) = state.jobs.get_mut(&session_id) else {
                    return;
                };

                let (words, hints) = job.merger.process_batch(&response);
                tracing::info!(words = words.len(), "batch_response_received");
                if !words.is_empty() {
                    let hints = attach_provider(hints, &job.params.provider);
                    state.sink.persist(&session_id, words, hints);
                }
            }

            finish_job(state, &session_id, JobOutcome::Delivered)
                .instrument(span)
                .await;
        }

        BatchEvent::BatchFailed { error, .. } => {
            {
                let _guard = span.enter();
                let friendly = format_user_friendly_error(&error);
                tracing::error!(error = %friendly, "batch_failed");
                sentry::capture_message(&friendly, sentry::Level::Error);
            }

            finish_job(state, &session_id, JobOutcome::Failed)
                .instrument(span)
                .await;
        }
    }
}

/// The one idempotent cleanup path for every terminal branch. Removing the
/// job from the table doubles as the cancellation token: anything that
/// arrives for this session afterwards misses the table and is dropped.
async fn finish_job(state: &mut BatchState, session_id: &str, outcome: JobOutcome) {
    let Some(mut job) = state.jobs.remove(session_id) else {
        return;
    };

    if matches!(outcome, JobOutcome::Completed) {
        let update = job.merger.flush();
        persist_update(
            state.sink.as_ref(),
            session_id,
            &job.params.provider,
            update,
        );
    }

    if let Some(subscription) = job.subscription.take() {
        subscription.cancel().await;
    }

    state.registry.release(session_id);
    tracing::info!(?outcome, "batch_job_finished");
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tracing::Instrument;

use confab_transcript::TranscriptMerger;

use super::{persist_update, session_span};
use crate::events::CaptureEvent;
use crate::pipeline::{CapturePipeline, LiveSessionParams, Subscription};
use crate::registry::SessionRegistry;
use crate::sink::TranscriptSink;

const ELAPSED_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub enum LiveMsg {
    Start(LiveSessionParams, RpcReplyPort<crate::Result<bool>>),
    Stop(RpcReplyPort<crate::Result<()>>),
    Elapsed(String, RpcReplyPort<Option<u64>>),
    Capture(Box<CaptureEvent>),
}

pub struct LiveArgs {
    pub pipeline: Arc<dyn CapturePipeline>,
    pub sink: Arc<dyn TranscriptSink>,
    pub registry: SessionRegistry,
}

struct Tick {
    task: tokio::task::JoinHandle<()>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

struct LiveSession {
    params: LiveSessionParams,
    merger: TranscriptMerger,
    subscription: Option<Subscription>,
    elapsed_secs: Arc<AtomicU64>,
    tick: Option<Tick>,
}

pub struct LiveState {
    pipeline: Arc<dyn CapturePipeline>,
    sink: Arc<dyn TranscriptSink>,
    registry: SessionRegistry,
    session: Option<LiveSession>,
}

/// Coordinator for the single engine-wide live capture session.
///
/// All mutation runs through this actor's mailbox, so the start/stop
/// commands and the capture event stream can never interleave mid-update.
pub struct LiveActor;

#[ractor::async_trait]
impl Actor for LiveActor {
    type Msg = LiveMsg;
    type State = LiveState;
    type Arguments = LiveArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(LiveState {
            pipeline: args.pipeline,
            sink: args.sink,
            registry: args.registry,
            session: None,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            LiveMsg::Start(params, reply) => {
                let result = start_live_impl(myself, params, state).await;
                let _ = reply.send(result);
            }
            LiveMsg::Stop(reply) => {
                let result = stop_live_impl(state).await;
                let _ = reply.send(result);
            }
            LiveMsg::Elapsed(session_id, reply) => {
                let elapsed = state
                    .session
                    .as_ref()
                    .filter(|s| s.params.session_id == session_id)
                    .map(|s| s.elapsed_secs.load(Ordering::Relaxed));
                let _ = reply.send(elapsed);
            }
            LiveMsg::Capture(event) => {
                handle_capture_event(*event, state).await;
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if state.session.is_some() {
            finalize_session(state, Some("engine_shutdown".to_string())).await;
        }
        Ok(())
    }
}

async fn start_live_impl(
    myself: ActorRef<LiveMsg>,
    params: LiveSessionParams,
    state: &mut LiveState,
) -> crate::Result<bool> {
    let span = session_span(&params.session_id);

    async {
        if state.session.is_some() {
            tracing::warn!("session_already_running");
            return Ok(false);
        }
        if !state.registry.try_enter_live(&params.session_id) {
            tracing::warn!("session_not_idle");
            return Ok(false);
        }

        configure_sentry_session_context(&params);

        // Subscribe before issuing the start command so no early event is
        // missed; the forwarder filters on session id.
        let subscription = {
            let session_id = params.session_id.clone();
            Subscription::spawn(state.pipeline.subscribe(), move |event: CaptureEvent| {
                if event.session_id() == session_id {
                    let _ = myself.send_message(LiveMsg::Capture(Box::new(event)));
                }
            })
        };

        if let Err(e) = state.pipeline.start(&params).await {
            tracing::error!(error = %e, "failed_to_start_session");
            subscription.cancel().await;
            state.registry.release(&params.session_id);
            clear_sentry_session_context();
            return Err(e);
        }

        state.session = Some(LiveSession {
            params,
            merger: TranscriptMerger::new(),
            subscription: Some(subscription),
            elapsed_secs: Arc::new(AtomicU64::new(0)),
            tick: None,
        });

        tracing::info!("session_started");
        Ok(true)
    }
    .instrument(span)
    .await
}

async fn stop_live_impl(state: &mut LiveState) -> crate::Result<()> {
    let Some(session_id) = state.session.as_ref().map(|s| s.params.session_id.clone()) else {
        tracing::warn!("no_session_running");
        return Ok(());
    };
    let span = session_span(&session_id);

    async {
        tracing::info!("session_stop_requested");
        if let Err(e) = state.pipeline.stop(&session_id).await {
            tracing::error!(error = %e, "failed_to_stop_session");
            finalize_session(state, Some(e.to_string())).await;
            return Err(e);
        }
        Ok(())
    }
    .instrument(span)
    .await
}

async fn handle_capture_event(event: CaptureEvent, state: &mut LiveState) {
    let current = state.session.as_ref().map(|s| s.params.session_id.clone());
    let Some(session_id) = current else {
        tracing::debug!(event_session = event.session_id(), "capture_event_without_session");
        return;
    };
    let span = session_span(&session_id);

    match event {
        CaptureEvent::Active { error, .. } => {
            let _guard = span.enter();
            match &error {
                Some(error) => tracing::warn!(%error, "session_active_degraded"),
                None => tracing::info!("session_active"),
            }
            if let Some(session) = state.session.as_mut() {
                start_tick(session);
            }
        }
        CaptureEvent::Finalizing { .. } => {
            let _guard = span.enter();
            state.registry.mark_live_finalizing(&session_id);
            tracing::info!("session_finalizing");
        }
        CaptureEvent::Response { response, .. } => {
            let _guard = span.enter();
            if let Some(session) = state.session.as_mut()
                && let Some(update) = session.merger.process(&response)
            {
                persist_update(
                    state.sink.as_ref(),
                    &session_id,
                    &session.params.provider,
                    update,
                );
            }
        }
        // UI-bound level meter signal, no coordination effect.
        CaptureEvent::Amplitude { .. } => {}
        CaptureEvent::Inactive { error, .. } => {
            finalize_session(state, error).instrument(span).await;
        }
    }
}

/// Flush, persist, unsubscribe, release. The one cleanup path for every way
/// a live session ends: solicited stop, pipeline death, actor shutdown.
async fn finalize_session(state: &mut LiveState, error: Option<String>) {
    let Some(mut session) = state.session.take() else {
        return;
    };
    let session_id = session.params.session_id.clone();

    if let Some(tick) = session.tick.take() {
        let _ = tick.shutdown_tx.send(());
        let _ = tick.task.await;
    }

    let update = session.merger.flush();
    persist_update(
        state.sink.as_ref(),
        &session_id,
        &session.params.provider,
        update,
    );

    if let Some(subscription) = session.subscription.take() {
        subscription.cancel().await;
    }

    state.registry.release(&session_id);
    clear_sentry_session_context();
    tracing::info!(?error, "session_ended");
}

fn start_tick(session: &mut LiveSession) {
    if session.tick.is_some() {
        return;
    }

    let elapsed = session.elapsed_secs.clone();
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let span = session_span(&session.params.session_id);

    let task = tokio::spawn(
        async move {
            let mut interval = tokio::time::interval(ELAPSED_TICK_INTERVAL);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        let secs = elapsed.fetch_add(1, Ordering::Relaxed) + 1;
                        tracing::debug!(secs, "session_elapsed");
                    }
                }
            }
        }
        .instrument(span),
    );

    session.tick = Some(Tick { task, shutdown_tx });
}

fn configure_sentry_session_context(params: &LiveSessionParams) {
    sentry::configure_scope(|scope| {
        scope.set_tag("session.id", &params.session_id);
        scope.set_tag("session.provider", &params.provider);

        let mut ctx = std::collections::BTreeMap::new();
        ctx.insert("session_id".into(), params.session_id.clone().into());
        ctx.insert("provider".into(), params.provider.clone().into());
        scope.set_context("live_session", sentry::protocol::Context::Other(ctx));
    });
}

fn clear_sentry_session_context() {
    sentry::configure_scope(|scope| {
        scope.remove_tag("session.id");
        scope.remove_tag("session.provider");
        scope.remove_context("live_session");
    });
}

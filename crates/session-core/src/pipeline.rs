use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::error::Result;
use crate::events::{BatchEvent, CaptureEvent};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct LiveSessionParams {
    pub session_id: String,
    /// STT provider backing the capture pipeline. Stamped onto speaker hints
    /// the provider reports inline.
    pub provider: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct BatchJobParams {
    pub session_id: String,
    pub provider: String,
    pub file_path: String,
}

/// Live capture plumbing (audio devices, streaming recognition) behind a
/// trait so the engine runs the same against the native stack or a test
/// double.
///
/// Contract: `start` returns once the pipeline is running or has
/// definitively failed; every started session eventually publishes an
/// `Inactive` event, solicited by `stop` or not.
#[async_trait]
pub trait CapturePipeline: Send + Sync {
    async fn start(&self, params: &LiveSessionParams) -> Result<()>;

    /// Ask the pipeline to wind down. Termination is reported through the
    /// event stream, not this return value.
    async fn stop(&self, session_id: &str) -> Result<()>;

    /// Subscribe to capture events. Each call returns an independent
    /// receiver over the same event feed.
    fn subscribe(&self) -> broadcast::Receiver<CaptureEvent>;
}

/// Batch (file import) transcription behind the same kind of seam. One call
/// to `start` per job; the job reports progress and its terminal outcome
/// through the event stream.
#[async_trait]
pub trait BatchPipeline: Send + Sync {
    async fn start(&self, params: &BatchJobParams) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<BatchEvent>;
}

/// Handle to a running event-forwarding task.
///
/// `spawn` bridges a broadcast receiver into a delivery closure (typically a
/// `send_message` into an actor mailbox) until cancelled or the sender side
/// closes. `cancel` stops the task and waits for it to wind down; dropping
/// the handle aborts the task instead.
pub struct Subscription {
    task: tokio::task::JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl Subscription {
    pub fn spawn<E, F>(rx: broadcast::Receiver<E>, mut deliver: F) -> Self
    where
        E: Clone + Send + 'static,
        F: FnMut(E) + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let mut stream = BroadcastStream::new(rx);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    item = StreamExt::next(&mut stream) => match item {
                        Some(Ok(event)) => deliver(event),
                        Some(Err(BroadcastStreamRecvError::Lagged(missed))) => {
                            tracing::warn!(missed, "subscription_lagged");
                        }
                        None => break,
                    },
                }
            }
        });

        Self {
            task,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub async fn cancel(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

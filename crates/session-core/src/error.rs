pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to start capture: {0}")]
    CaptureStartFailed(String),
    #[error("failed to stop capture: {0}")]
    CaptureStopFailed(String),
    #[error("failed to start batch transcription: {0}")]
    BatchStartFailed(String),
    #[error(transparent)]
    Spawn(#[from] ractor::SpawnErr),
    #[error("coordinator unavailable: {0}")]
    Coordinator(String),
}

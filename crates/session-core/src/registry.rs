use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
#[serde(rename_all = "lowercase")]
pub enum BatchPhase {
    Starting,
    Transcribing,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct BatchProgress {
    /// Percent of the source file transcribed, `0.0..=100.0`.
    pub percent: f32,
    pub phase: BatchPhase,
}

/// What a session is currently doing. Live and batch are mutually exclusive
/// per session id by construction: both entry points go through the same
/// registry check.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionMode {
    Idle,
    LiveActive,
    LiveFinalizing,
    BatchRunning(BatchProgress),
}

/// Shared table of session modes, keyed by session id.
///
/// The check-then-act pair inside each `try_enter_*` runs under one lock
/// acquisition with no await in between, so two concurrent start attempts
/// for the same session cannot both pass. Idle sessions hold no entry.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<String, SessionMode>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `session_id` for live capture. Rejected unless the session is
    /// idle: a still-finalizing live session or a running batch job blocks
    /// re-entry until it winds down.
    pub fn try_enter_live(&self, session_id: &str) -> bool {
        let mut sessions = self.lock();
        match sessions.get(session_id) {
            None => {
                sessions.insert(session_id.to_string(), SessionMode::LiveActive);
                true
            }
            Some(_) => false,
        }
    }

    /// Claim `session_id` for a batch job. Rejected unless the session is
    /// idle, which covers both "batch already running" and "session is live".
    pub fn try_enter_batch(&self, session_id: &str) -> bool {
        let mut sessions = self.lock();
        match sessions.get(session_id) {
            None => {
                sessions.insert(
                    session_id.to_string(),
                    SessionMode::BatchRunning(BatchProgress {
                        percent: 0.0,
                        phase: BatchPhase::Starting,
                    }),
                );
                true
            }
            Some(_) => false,
        }
    }

    /// Move a live session into its wind-down phase. Ignored unless the
    /// session is currently `LiveActive`.
    pub fn mark_live_finalizing(&self, session_id: &str) {
        let mut sessions = self.lock();
        if let Some(mode) = sessions.get_mut(session_id)
            && *mode == SessionMode::LiveActive
        {
            *mode = SessionMode::LiveFinalizing;
        }
    }

    /// Record batch progress. Ignored unless a batch job currently holds the
    /// session, so a late progress event cannot resurrect a finished job.
    pub fn mark_batch_progress(&self, session_id: &str, progress: BatchProgress) {
        let mut sessions = self.lock();
        if let Some(mode) = sessions.get_mut(session_id)
            && matches!(mode, SessionMode::BatchRunning(_))
        {
            *mode = SessionMode::BatchRunning(progress);
        }
    }

    /// Return the session to idle by removing its entry.
    pub fn release(&self, session_id: &str) {
        self.lock().remove(session_id);
    }

    pub fn mode_of(&self, session_id: &str) -> SessionMode {
        self.lock()
            .get(session_id)
            .copied()
            .unwrap_or(SessionMode::Idle)
    }

    pub fn progress_of(&self, session_id: &str) -> Option<BatchProgress> {
        match self.mode_of(session_id) {
            SessionMode::BatchRunning(progress) => Some(progress),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionMode>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

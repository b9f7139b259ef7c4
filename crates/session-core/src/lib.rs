pub mod actors;
pub mod diarize;
pub mod events;
pub mod pipeline;
pub mod registry;
pub mod sink;

mod engine;
mod error;

pub use diarize::{DiarizationSegment, diarize_session};
pub use engine::SessionEngine;
pub use error::{Error, Result};
pub use events::{BatchEvent, CaptureEvent};
pub use pipeline::{
    BatchJobParams, BatchPipeline, CapturePipeline, LiveSessionParams, Subscription,
};
pub use registry::{BatchPhase, BatchProgress, SessionMode, SessionRegistry};
pub use sink::{StoredSpeakerHint, TranscriptSegment, TranscriptSink, attach_provider};

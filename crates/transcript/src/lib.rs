pub mod id;
pub mod merge;
pub mod types;

mod window;
mod words;

pub use id::{IdGenerator, SequentialIdGen, UuidIdGen};
pub use merge::TranscriptMerger;
pub use types::{PartialWord, RawWord, SpeakerHint, TranscriptUpdate, TranscriptWord};

//! Transcription orchestration: recognition, alignment and speaker
//! diarization stages coordinated into a single immutable transcript.

pub mod audio;
pub mod models;
pub mod pipeline;
pub mod shared;
pub mod transcript;

/// Error type returned by pluggable engines and loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

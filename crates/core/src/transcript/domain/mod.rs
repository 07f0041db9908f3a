pub mod error;
pub mod raw_segment;
pub mod segment;
pub mod speaker;
pub mod srt;
pub mod transcription_request;
pub mod transcription_result;

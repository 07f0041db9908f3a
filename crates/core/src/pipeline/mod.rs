pub mod pipeline_logger;
pub mod segment_builder;
pub mod speaker_assignment;
pub mod transcription_pipeline;

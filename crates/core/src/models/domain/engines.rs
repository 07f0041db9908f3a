use crate::audio::domain::audio_segment::AudioSegment;
use crate::models::domain::access_token::AccessToken;
use crate::models::domain::model_config::{Device, ModelConfig};
use crate::transcript::domain::error::TranscriptionError;
use crate::transcript::domain::raw_segment::{
    RawSegment, Recognition, SpeakerCountHints, SpeakerTurn,
};
use crate::BoxError;

/// Speech-to-text over a whole recording.
pub trait SpeechRecognizer: Send {
    /// `language_hint` biases the engine; `None` asks it to auto-detect.
    fn recognize(
        &self,
        audio: &AudioSegment,
        language_hint: Option<&str>,
    ) -> Result<Recognition, BoxError>;
}

/// Refines coarse segment boundaries against the audio.
pub trait SegmentAligner: Send {
    fn align(
        &self,
        segments: &[RawSegment],
        audio: &AudioSegment,
        language: &str,
    ) -> Result<Vec<RawSegment>, BoxError>;
}

/// Labels who speaks when.
pub trait SpeakerDiarizer: Send {
    fn diarize(
        &self,
        audio: &AudioSegment,
        hints: SpeakerCountHints,
    ) -> Result<Vec<SpeakerTurn>, BoxError>;
}

/// Constructs engine handles. Each call performs a full (blocking) load;
/// caching is the registry's job.
pub trait ModelLoader: Send {
    fn load_recognizer(&self, config: &ModelConfig) -> Result<Box<dyn SpeechRecognizer>, BoxError>;

    fn load_aligner(
        &self,
        language: &str,
        device: Device,
    ) -> Result<Box<dyn SegmentAligner>, BoxError>;

    fn load_diarizer(
        &self,
        token: &AccessToken,
        device: Device,
    ) -> Result<Box<dyn SpeakerDiarizer>, BoxError>;

    /// Called after every cached handle has been dropped.
    fn release_accelerator_memory(&self, _device: Device) {}

    /// Whether `Device::Auto` may resolve to an accelerator.
    fn accelerator_available(&self) -> bool {
        false
    }
}

/// Source of model handles for the orchestrator.
pub trait ModelProvider {
    /// Configuration every recognizer handle is loaded with.
    fn config(&self) -> &ModelConfig;

    fn acquire_recognizer(&mut self) -> Result<&dyn SpeechRecognizer, TranscriptionError>;

    fn acquire_aligner(&mut self, language: &str) -> Result<&dyn SegmentAligner, TranscriptionError>;

    /// Fails with [`TranscriptionError::MissingCredential`] when no access
    /// token was supplied.
    fn acquire_diarizer(&mut self) -> Result<&dyn SpeakerDiarizer, TranscriptionError>;

    /// Drops every cached handle. Safe to call repeatedly.
    fn release_all(&mut self);
}

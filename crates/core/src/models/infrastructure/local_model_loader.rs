use crate::models::domain::access_token::AccessToken;
use crate::models::domain::engines::{
    ModelLoader, SegmentAligner, SpeakerDiarizer, SpeechRecognizer,
};
use crate::models::domain::model_config::{Device, ModelConfig};
use crate::models::infrastructure::energy_aligner::EnergyAligner;
use crate::shared::model_resolver::ModelLocations;
use crate::BoxError;

/// Loader backed by the engines that ship with this crate: whisper.cpp for
/// recognition (feature `whisper`), [`EnergyAligner`] for alignment and
/// pyannote for diarization (feature `pyannote`).
#[derive(Debug, Clone, Default)]
pub struct LocalModelLoader {
    locations: ModelLocations,
}

impl LocalModelLoader {
    pub fn new(locations: ModelLocations) -> Self {
        Self { locations }
    }

    pub fn locations(&self) -> &ModelLocations {
        &self.locations
    }
}

impl ModelLoader for LocalModelLoader {
    #[cfg(feature = "whisper")]
    fn load_recognizer(&self, config: &ModelConfig) -> Result<Box<dyn SpeechRecognizer>, BoxError> {
        use crate::models::infrastructure::whisper_recognizer::WhisperRecognizer;
        Ok(Box::new(WhisperRecognizer::load(config, &self.locations)?))
    }

    #[cfg(not(feature = "whisper"))]
    fn load_recognizer(&self, config: &ModelConfig) -> Result<Box<dyn SpeechRecognizer>, BoxError> {
        Err(format!(
            "no speech recognizer available for {config}: build with the `whisper` feature"
        )
        .into())
    }

    fn load_aligner(
        &self,
        language: &str,
        _device: Device,
    ) -> Result<Box<dyn SegmentAligner>, BoxError> {
        Ok(Box::new(EnergyAligner::new(language)))
    }

    #[cfg(feature = "pyannote")]
    fn load_diarizer(
        &self,
        _token: &AccessToken,
        device: Device,
    ) -> Result<Box<dyn SpeakerDiarizer>, BoxError> {
        use crate::models::infrastructure::pyannote_diarizer::PyannoteDiarizer;
        if device.is_accelerator() {
            log::debug!("Diarization runs on the CPU execution provider");
        }
        Ok(Box::new(PyannoteDiarizer::load(&self.locations)?))
    }

    #[cfg(not(feature = "pyannote"))]
    fn load_diarizer(
        &self,
        _token: &AccessToken,
        _device: Device,
    ) -> Result<Box<dyn SpeakerDiarizer>, BoxError> {
        Err("no diarization engine available: build with the `pyannote` feature".into())
    }

    fn accelerator_available(&self) -> bool {
        cfg!(feature = "whisper-cuda")
    }
}

use crate::models::domain::access_token::AccessToken;
use crate::models::domain::engines::{
    ModelLoader, ModelProvider, SegmentAligner, SpeakerDiarizer, SpeechRecognizer,
};
use crate::models::domain::model_config::ModelConfig;
use crate::transcript::domain::error::{ModelKind, TranscriptionError};

/// Lazily loads and caches model handles.
///
/// - the recognizer is loaded once, with the registry's fixed configuration;
/// - the aligner is keyed by language and reloaded whenever a different
///   language is requested;
/// - the diarizer is loaded once and needs an access token.
///
/// Handles stay cached across requests, including failed ones, until
/// [`release_all`](ModelProvider::release_all) or drop.
pub struct ModelRegistry<L: ModelLoader> {
    loader: L,
    config: ModelConfig,
    access_token: Option<AccessToken>,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    aligner: Option<(String, Box<dyn SegmentAligner>)>,
    diarizer: Option<Box<dyn SpeakerDiarizer>>,
}

impl<L: ModelLoader> ModelRegistry<L> {
    /// `config.device == Auto` is pinned here using the loader's accelerator
    /// probe. Nothing is loaded yet.
    pub fn new(loader: L, config: ModelConfig, access_token: Option<AccessToken>) -> Self {
        let config = config.resolve(loader.accelerator_available());
        log::debug!("Model registry configured with {config}");
        Self {
            loader,
            config,
            access_token,
            recognizer: None,
            aligner: None,
            diarizer: None,
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Language of the cached aligner, if one is loaded.
    pub fn aligner_language(&self) -> Option<&str> {
        self.aligner.as_ref().map(|(language, _)| language.as_str())
    }

    pub fn has_diarizer(&self) -> bool {
        self.diarizer.is_some()
    }
}

impl<L: ModelLoader> ModelProvider for ModelRegistry<L> {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn acquire_recognizer(&mut self) -> Result<&dyn SpeechRecognizer, TranscriptionError> {
        let recognizer = match self.recognizer.take() {
            Some(recognizer) => {
                log::debug!("Recognition model cache hit");
                recognizer
            }
            None => {
                log::info!("Loading recognition model ({})", self.config);
                self.loader
                    .load_recognizer(&self.config)
                    .map_err(|e| TranscriptionError::model_load(ModelKind::Recognition, e))?
            }
        };
        Ok(&**self.recognizer.insert(recognizer))
    }

    fn acquire_aligner(&mut self, language: &str) -> Result<&dyn SegmentAligner, TranscriptionError> {
        let cached = match self.aligner.take() {
            Some((cached_language, aligner)) if cached_language == language => {
                log::debug!("Alignment model cache hit for '{language}'");
                (cached_language, aligner)
            }
            previous => {
                if let Some((old, _)) = &previous {
                    log::info!("Language changed from '{old}' to '{language}', reloading alignment model");
                } else {
                    log::info!("Loading alignment model for '{language}'");
                }
                drop(previous);
                let aligner = self
                    .loader
                    .load_aligner(language, self.config.device)
                    .map_err(|e| TranscriptionError::model_load(ModelKind::Alignment, e))?;
                (language.to_string(), aligner)
            }
        };
        Ok(&*self.aligner.insert(cached).1)
    }

    fn acquire_diarizer(&mut self) -> Result<&dyn SpeakerDiarizer, TranscriptionError> {
        let diarizer = match self.diarizer.take() {
            Some(diarizer) => {
                log::debug!("Diarization model cache hit");
                diarizer
            }
            None => {
                let token = self
                    .access_token
                    .as_ref()
                    .ok_or(TranscriptionError::MissingCredential)?;
                log::info!("Loading diarization model on {}", self.config.device);
                self.loader
                    .load_diarizer(token, self.config.device)
                    .map_err(|e| TranscriptionError::model_load(ModelKind::Diarization, e))?
            }
        };
        Ok(&**self.diarizer.insert(diarizer))
    }

    fn release_all(&mut self) {
        let had_models =
            self.recognizer.is_some() || self.aligner.is_some() || self.diarizer.is_some();
        self.recognizer = None;
        self.aligner = None;
        self.diarizer = None;
        self.loader.release_accelerator_memory(self.config.device);
        if had_models {
            log::info!("Released cached models");
        }
    }
}

use std::path::{Path, PathBuf};

use crate::models::domain::model_config::ModelConfig;
use crate::transcript::domain::error::ValidationError;
use crate::transcript::domain::raw_segment::SpeakerCountHints;

/// Input of one pipeline run. Only constructible through
/// [`TranscriptionRequestBuilder::build`], which validates every field.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionRequest {
    audio_path: PathBuf,
    language: Option<String>,
    enable_diarization: bool,
    diarization_optional: bool,
    min_speakers: Option<u32>,
    max_speakers: Option<u32>,
    model: ModelConfig,
}

impl TranscriptionRequest {
    pub fn builder(audio_path: impl Into<PathBuf>) -> TranscriptionRequestBuilder {
        TranscriptionRequestBuilder::new(audio_path)
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    /// Language hint; `None` asks recognition to detect it.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn enable_diarization(&self) -> bool {
        self.enable_diarization
    }

    /// When set, a failing diarization stage degrades to a result without
    /// speakers instead of aborting the run.
    pub fn diarization_optional(&self) -> bool {
        self.diarization_optional
    }

    pub fn min_speakers(&self) -> Option<u32> {
        self.min_speakers
    }

    pub fn max_speakers(&self) -> Option<u32> {
        self.max_speakers
    }

    pub fn speaker_hints(&self) -> SpeakerCountHints {
        SpeakerCountHints {
            min_speakers: self.min_speakers,
            max_speakers: self.max_speakers,
        }
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptionRequestBuilder {
    audio_path: PathBuf,
    language: Option<String>,
    enable_diarization: bool,
    diarization_optional: bool,
    min_speakers: Option<u32>,
    max_speakers: Option<u32>,
    model: ModelConfig,
}

impl TranscriptionRequestBuilder {
    pub fn new(audio_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
            language: None,
            enable_diarization: true,
            diarization_optional: false,
            min_speakers: None,
            max_speakers: None,
            model: ModelConfig::default(),
        }
    }

    pub fn language(mut self, language: Option<&str>) -> Self {
        self.language = language
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty());
        self
    }

    pub fn enable_diarization(mut self, enabled: bool) -> Self {
        self.enable_diarization = enabled;
        self
    }

    pub fn diarization_optional(mut self, optional: bool) -> Self {
        self.diarization_optional = optional;
        self
    }

    pub fn min_speakers(mut self, min: Option<u32>) -> Self {
        self.min_speakers = min;
        self
    }

    pub fn max_speakers(mut self, max: Option<u32>) -> Self {
        self.max_speakers = max;
        self
    }

    pub fn model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn build(self) -> Result<TranscriptionRequest, ValidationError> {
        if !self.audio_path.exists() {
            return Err(ValidationError::AudioNotFound(self.audio_path));
        }
        if !self.audio_path.is_file() {
            return Err(ValidationError::AudioNotAFile(self.audio_path));
        }
        if let Some(min) = self.min_speakers.filter(|&n| n < 1) {
            return Err(ValidationError::SpeakerCountTooSmall {
                field: "min_speakers",
                value: min,
            });
        }
        if let Some(max) = self.max_speakers.filter(|&n| n < 1) {
            return Err(ValidationError::SpeakerCountTooSmall {
                field: "max_speakers",
                value: max,
            });
        }
        if let (Some(min), Some(max)) = (self.min_speakers, self.max_speakers) {
            if max < min {
                return Err(ValidationError::SpeakerRange { min, max });
            }
        }

        Ok(TranscriptionRequest {
            audio_path: self.audio_path,
            language: self.language,
            enable_diarization: self.enable_diarization,
            diarization_optional: self.diarization_optional,
            min_speakers: self.min_speakers,
            max_speakers: self.max_speakers,
            model: self.model,
        })
    }
}

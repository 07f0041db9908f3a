use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::BoxError;

/// A value that violates an entity invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("audio file does not exist: {0}")]
    AudioNotFound(PathBuf),
    #[error("audio path is not a regular file: {0}")]
    AudioNotAFile(PathBuf),
    #[error("{field} must be at least 1, got {value}")]
    SpeakerCountTooSmall { field: &'static str, value: u32 },
    #[error("max_speakers ({max}) must be >= min_speakers ({min})")]
    SpeakerRange { min: u32, max: u32 },
    #[error("{field} must be a finite, non-negative number of seconds, got {value}")]
    InvalidTimestamp { field: &'static str, value: f64 },
    #[error("end ({end}) must not be before start ({start})")]
    EndBeforeStart { start: f64, end: f64 },
    #[error("confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(f32),
    #[error("speaker id must not be empty")]
    EmptySpeakerId,
    #[error("segment speaker {0} is not listed among the transcript's speakers")]
    UnlistedSpeaker(String),
}

/// Which model capability a load error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Recognition,
    Alignment,
    Diarization,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Recognition => write!(f, "recognition"),
            ModelKind::Alignment => write!(f, "alignment"),
            ModelKind::Diarization => write!(f, "diarization"),
        }
    }
}

/// Pipeline stage that failed while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    AudioDecode,
    Recognition,
    Alignment,
    Diarization,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::AudioDecode => write!(f, "audio decode"),
            Stage::Recognition => write!(f, "recognition"),
            Stage::Alignment => write!(f, "alignment"),
            Stage::Diarization => write!(f, "diarization"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("diarization requires an access token; none was configured for this pipeline")]
    MissingCredential,

    #[error("failed to load {kind} model: {source}")]
    ModelLoad {
        kind: ModelKind,
        #[source]
        source: BoxError,
    },

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: BoxError,
    },

    #[error("segment {index} produced by the pipeline is invalid: {source}")]
    InvalidSegment {
        index: usize,
        #[source]
        source: ValidationError,
    },
}

impl TranscriptionError {
    pub fn model_load(kind: ModelKind, source: impl Into<BoxError>) -> Self {
        Self::ModelLoad {
            kind,
            source: source.into(),
        }
    }

    pub fn stage(stage: Stage, source: impl Into<BoxError>) -> Self {
        Self::Stage {
            stage,
            source: source.into(),
        }
    }

    /// The stage this error aborted, if it happened while running one.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::ModelLoad { kind, .. } => Some(match kind {
                ModelKind::Recognition => Stage::Recognition,
                ModelKind::Alignment => Stage::Alignment,
                ModelKind::Diarization => Stage::Diarization,
            }),
            Self::MissingCredential => Some(Stage::Diarization),
            Self::Validation(_) | Self::InvalidSegment { .. } => None,
        }
    }
}

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pyannote_rs::{EmbeddingExtractor, EmbeddingManager};

use crate::audio::domain::audio_segment::AudioSegment;
use crate::models::domain::engines::SpeakerDiarizer;
use crate::shared::constants::{
    EMBEDDING_MODEL_NAME, PYANNOTE_MODEL_BASE_URL, SEGMENTATION_MODEL_NAME,
};
use crate::shared::model_resolver::{self, ModelLocations};
use crate::transcript::domain::raw_segment::{SpeakerCountHints, SpeakerTurn};
use crate::BoxError;

/// Cosine similarity above which a speech span joins an existing speaker.
const SIMILARITY_THRESHOLD: f32 = 0.5;

/// Speaker cap when the request gives no upper bound.
const DEFAULT_MAX_SPEAKERS: usize = 10;

/// Speaker diarization with the pyannote segmentation model and a speaker
/// embedding model, both run through ONNX Runtime by `pyannote-rs`.
///
/// Speech spans come from the segmentation model; each span's embedding is
/// clustered against the speakers seen so far in the same recording.
pub struct PyannoteDiarizer {
    segmentation_model: PathBuf,
    extractor: Mutex<EmbeddingExtractor>,
}

impl PyannoteDiarizer {
    /// Resolves both ONNX models through the model cache (downloading them
    /// on first use) and loads the embedding model.
    pub fn load(locations: &ModelLocations) -> Result<Self, BoxError> {
        let segmentation = model_resolver::resolve(
            SEGMENTATION_MODEL_NAME,
            &format!("{PYANNOTE_MODEL_BASE_URL}/{SEGMENTATION_MODEL_NAME}"),
            locations,
        )?;
        let embedding = model_resolver::resolve(
            EMBEDDING_MODEL_NAME,
            &format!("{PYANNOTE_MODEL_BASE_URL}/{EMBEDDING_MODEL_NAME}"),
            locations,
        )?;
        Self::from_files(&segmentation, &embedding)
    }

    pub fn from_files(segmentation_model: &Path, embedding_model: &Path) -> Result<Self, BoxError> {
        for path in [segmentation_model, embedding_model] {
            if !path.exists() {
                return Err(format!("Diarization model not found at: {}", path.display()).into());
            }
        }
        let extractor = EmbeddingExtractor::new(embedding_model)
            .map_err(|e| format!("Failed to load speaker embedding model: {e}"))?;
        log::info!(
            "Loaded diarization models {} and {}",
            segmentation_model.display(),
            embedding_model.display()
        );
        Ok(Self {
            segmentation_model: segmentation_model.to_path_buf(),
            extractor: Mutex::new(extractor),
        })
    }
}

impl SpeakerDiarizer for PyannoteDiarizer {
    fn diarize(
        &self,
        audio: &AudioSegment,
        hints: SpeakerCountHints,
    ) -> Result<Vec<SpeakerTurn>, BoxError> {
        let samples = to_pcm16(audio.samples());
        let max_speakers = hints
            .max_speakers
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_SPEAKERS);
        let mut speakers = EmbeddingManager::new(max_speakers);
        let mut extractor = self
            .extractor
            .lock()
            .map_err(|_| "speaker embedding model is poisoned by an earlier panic")?;

        let spans = pyannote_rs::get_segments(&samples, audio.sample_rate(), &self.segmentation_model)
            .map_err(|e| format!("Speech segmentation failed: {e}"))?;

        let mut turns = Vec::new();
        for span in spans {
            let span = span.map_err(|e| format!("Speech segmentation failed: {e}"))?;
            let embedding: Vec<f32> = extractor
                .compute(&span.samples)
                .map_err(|e| format!("Speaker embedding failed: {e}"))?
                .collect();
            match speakers.search_speaker(embedding, SIMILARITY_THRESHOLD) {
                Some(index) => turns.push(SpeakerTurn::new(span.start, span.end, speaker_id(index))),
                None => log::warn!(
                    "More than {max_speakers} speakers; leaving {:.2}s-{:.2}s unattributed",
                    span.start,
                    span.end
                ),
            }
        }

        let found = turns
            .iter()
            .map(|t| t.speaker.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        if let Some(min) = hints.min_speakers {
            if found < min as usize {
                log::warn!("Expected at least {min} speakers, found {found}");
            }
        }
        log::debug!("Diarization produced {} turns from {found} speakers", turns.len());
        Ok(turns)
    }
}

/// `SPEAKER_00`, `SPEAKER_01`, ... in cluster order.
fn speaker_id(index: usize) -> String {
    format!("SPEAKER_{index:02}")
}

fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
        .collect()
}

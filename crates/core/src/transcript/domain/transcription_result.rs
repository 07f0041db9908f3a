use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::segment::Segment;
use super::speaker::Speaker;
use super::srt;
use crate::shared::constants::UNKNOWN_SPEAKER;

/// Texts grouped per speaker id, buckets in first-seen order.
pub type SpeakerTexts = Vec<(String, Vec<String>)>;

/// Transcript of one audio file. Assembled once, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TranscriptionResultRecord")]
pub struct TranscriptionResult {
    audio_path: PathBuf,
    language: String,
    duration: f64,
    segments: Vec<Segment>,
    speakers: Vec<Arc<Speaker>>,
}

/// Wire form of [`TranscriptionResult`]. Reassembled through
/// [`TranscriptionResult::new`], with every segment pointed back at the
/// listed speaker of the same id.
#[derive(Deserialize)]
struct TranscriptionResultRecord {
    audio_path: PathBuf,
    language: String,
    duration: f64,
    segments: Vec<Segment>,
    #[serde(default)]
    speakers: Vec<Speaker>,
}

impl TryFrom<TranscriptionResultRecord> for TranscriptionResult {
    type Error = ValidationError;

    fn try_from(record: TranscriptionResultRecord) -> Result<Self, Self::Error> {
        if !record.duration.is_finite() || record.duration < 0.0 {
            return Err(ValidationError::InvalidTimestamp {
                field: "duration",
                value: record.duration,
            });
        }

        let speakers: Vec<Arc<Speaker>> = record.speakers.into_iter().map(Arc::new).collect();
        let shared: HashMap<String, Arc<Speaker>> = speakers
            .iter()
            .map(|s| (s.id().to_string(), s.clone()))
            .collect();
        let segments = record
            .segments
            .into_iter()
            .map(|segment| {
                let Some(id) = segment.speaker_id().map(str::to_string) else {
                    return Ok(segment);
                };
                match shared.get(&id) {
                    Some(speaker) => Ok(segment.with_speaker(speaker.clone())),
                    None => Err(ValidationError::UnlistedSpeaker(id)),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            record.audio_path,
            record.language,
            record.duration,
            segments,
            speakers,
        ))
    }
}

impl TranscriptionResult {
    /// Segments keep their given order; speakers are deduplicated by id and
    /// sorted.
    pub fn new(
        audio_path: impl Into<PathBuf>,
        language: impl Into<String>,
        duration: f64,
        segments: Vec<Segment>,
        speakers: Vec<Arc<Speaker>>,
    ) -> Self {
        let speakers: BTreeMap<String, Arc<Speaker>> = speakers
            .into_iter()
            .map(|s| (s.id().to_string(), s))
            .collect();
        Self {
            audio_path: audio_path.into(),
            language: language.into(),
            duration,
            segments,
            speakers: speakers.into_values().collect(),
        }
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Seconds of decoded audio.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn speakers(&self) -> &[Arc<Speaker>] {
        &self.speakers
    }

    /// Stripped segment texts joined by single spaces. Empty segments still
    /// contribute their (empty) slot.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text().trim())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn text_by_speaker(&self) -> SpeakerTexts {
        let mut buckets: SpeakerTexts = Vec::new();
        for segment in &self.segments {
            let id = segment.speaker_id().unwrap_or(UNKNOWN_SPEAKER);
            let text = segment.text().trim().to_string();
            match buckets.iter_mut().find(|(key, _)| key == id) {
                Some((_, texts)) => texts.push(text),
                None => buckets.push((id.to_string(), vec![text])),
            }
        }
        buckets
    }

    pub fn to_srt(&self) -> String {
        srt::render(&self.segments)
    }

    /// One `[start - end] [speaker]: text` line per segment.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            let speaker = segment
                .speaker()
                .map(|s| s.display_name())
                .unwrap_or("?");
            let _ = writeln!(
                out,
                "[{:.2}s - {:.2}s] [{speaker}]: {}",
                segment.start(),
                segment.end(),
                segment.text().trim()
            );
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Returns a copy whose speakers carry human labels from `labels`
    /// (keyed by speaker id). Segments are re-pointed at the relabelled
    /// speakers; ids not in `labels` keep their current label.
    pub fn with_speaker_labels(&self, labels: &HashMap<String, String>) -> Self {
        let relabelled: HashMap<&str, Arc<Speaker>> = self
            .speakers
            .iter()
            .map(|speaker| {
                let updated = match labels.get(speaker.id()) {
                    Some(label) => Arc::new(Speaker::clone(speaker).with_label(label.clone())),
                    None => speaker.clone(),
                };
                (speaker.id(), updated)
            })
            .collect();

        let segments = self
            .segments
            .iter()
            .map(|segment| match segment.speaker_id().and_then(|id| relabelled.get(id)) {
                Some(speaker) => segment.clone().with_speaker(speaker.clone()),
                None => segment.clone(),
            })
            .collect();

        Self {
            audio_path: self.audio_path.clone(),
            language: self.language.clone(),
            duration: self.duration,
            segments,
            speakers: self
                .speakers
                .iter()
                .map(|s| relabelled[s.id()].clone())
                .collect(),
        }
    }
}

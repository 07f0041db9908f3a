use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::speaker::Speaker;

/// A contiguous span of transcribed speech, timestamps in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SegmentRecord")]
pub struct Segment {
    start: f64,
    end: f64,
    text: String,
    speaker: Option<Arc<Speaker>>,
    confidence: Option<f32>,
}

/// Wire form of [`Segment`]; deserialization goes through the validating
/// constructors.
#[derive(Deserialize)]
struct SegmentRecord {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    speaker: Option<Speaker>,
    #[serde(default)]
    confidence: Option<f32>,
}

impl TryFrom<SegmentRecord> for Segment {
    type Error = ValidationError;

    fn try_from(record: SegmentRecord) -> Result<Self, Self::Error> {
        let mut segment = Segment::new(record.start, record.end, record.text)?;
        if let Some(confidence) = record.confidence {
            segment = segment.with_confidence(confidence)?;
        }
        if let Some(speaker) = record.speaker {
            segment = segment.with_speaker(Arc::new(speaker));
        }
        Ok(segment)
    }
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Result<Self, ValidationError> {
        check_timestamp("start", start)?;
        check_timestamp("end", end)?;
        if end < start {
            return Err(ValidationError::EndBeforeStart { start, end });
        }
        Ok(Self {
            start,
            end,
            text: text.into(),
            speaker: None,
            confidence: None,
        })
    }

    pub fn with_speaker(mut self, speaker: Arc<Speaker>) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(confidence));
        }
        self.confidence = Some(confidence);
        Ok(self)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn speaker(&self) -> Option<&Arc<Speaker>> {
        self.speaker.as_ref()
    }

    pub fn speaker_id(&self) -> Option<&str> {
        self.speaker.as_deref().map(Speaker::id)
    }

    /// `None` means the engine did not report one, not a zero score.
    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

fn check_timestamp(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidTimestamp { field, value })
    }
}

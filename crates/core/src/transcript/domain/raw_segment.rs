use serde::{Deserialize, Serialize};

/// Loosely-typed segment record as emitted by recognition and alignment
/// engines. Any field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Speaker id attached by speaker assignment.
    #[serde(default)]
    pub speaker: Option<String>,
}

impl RawSegment {
    pub fn timed(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn start_or_zero(&self) -> f64 {
        self.start.unwrap_or(0.0)
    }

    pub fn end_or_zero(&self) -> f64 {
        self.end.unwrap_or(0.0)
    }
}

/// Output of the recognition stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recognition {
    /// Language the engine settled on; `None` when it could not tell.
    pub language: Option<String>,
    pub segments: Vec<RawSegment>,
}

/// One diarized interval attributed to a speaker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeakerTurn {
    pub start: f64,
    pub end: f64,
    pub speaker: String,
}

impl SpeakerTurn {
    pub fn new(start: f64, end: f64, speaker: impl Into<String>) -> Self {
        Self {
            start,
            end,
            speaker: speaker.into(),
        }
    }

    /// Length of the intersection with `[start, end]`, zero when disjoint.
    pub fn overlap(&self, start: f64, end: f64) -> f64 {
        (self.end.min(end) - self.start.max(start)).max(0.0)
    }
}

/// Speaker-count bounds forwarded to the diarization engine. `None` lets the
/// engine decide.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpeakerCountHints {
    pub min_speakers: Option<u32>,
    pub max_speakers: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_missing_times_default_to_zero() {
        let raw = RawSegment::default();
        assert_eq!(raw.start_or_zero(), 0.0);
        assert_eq!(raw.end_or_zero(), 0.0);
    }

    #[test]
    fn test_turn_overlap() {
        let turn = SpeakerTurn::new(1.0, 3.0, "SPEAKER_00");
        assert_relative_eq!(turn.overlap(0.0, 2.0), 1.0);
        assert_relative_eq!(turn.overlap(1.5, 2.5), 1.0);
        assert_relative_eq!(turn.overlap(3.0, 4.0), 0.0);
        assert_relative_eq!(turn.overlap(5.0, 6.0), 0.0);
    }

    #[test]
    fn test_raw_segment_deserializes_with_missing_fields() {
        let raw: RawSegment = serde_json::from_str(r#"{"text": " salut"}"#).unwrap();
        assert_eq!(raw.text.as_deref(), Some(" salut"));
        assert!(raw.start.is_none());
        assert!(raw.confidence.is_none());
    }
}

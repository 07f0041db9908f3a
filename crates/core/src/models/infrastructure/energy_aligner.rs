use crate::audio::domain::audio_segment::AudioSegment;
use crate::models::domain::engines::SegmentAligner;
use crate::transcript::domain::raw_segment::RawSegment;
use crate::BoxError;

/// Analysis window length in seconds.
const WINDOW_SECS: f64 = 0.02;
/// A window counts as speech when its RMS reaches this fraction of the
/// segment's loudest window.
const RELATIVE_THRESHOLD: f32 = 0.1;
/// RMS below which a window is treated as silence regardless of the peak.
const SILENCE_FLOOR: f32 = 1e-4;

/// Tightens segment boundaries to the span that actually carries energy.
///
/// Acoustic only, so the language merely identifies the cache slot. A
/// segment is never widened, and is left untouched when it has no timing
/// or no window rises above the silence floor.
#[derive(Debug, Clone)]
pub struct EnergyAligner {
    language: String,
}

impl EnergyAligner {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn refine(&self, segment: &RawSegment, audio: &AudioSegment) -> RawSegment {
        let (Some(start), Some(end)) = (segment.start, segment.end) else {
            return segment.clone();
        };
        let rate = audio.sample_rate();
        let window_len = ((WINDOW_SECS * rate as f64) as usize).max(1);
        let samples = audio.window(start, end);
        let energies: Vec<f32> = samples.chunks(window_len).map(rms).collect();

        let peak = energies.iter().copied().fold(0.0f32, f32::max);
        let threshold = (peak * RELATIVE_THRESHOLD).max(SILENCE_FLOOR);
        let first = energies.iter().position(|&e| e >= threshold);
        let last = energies.iter().rposition(|&e| e >= threshold);
        let (Some(first), Some(last)) = (first, last) else {
            return segment.clone();
        };

        // Offsets are relative to the first sample of the window.
        let origin = audio.sample_index_at_time(start) as f64 / rate as f64;
        let new_start = (origin + (first * window_len) as f64 / rate as f64).max(start);
        let new_end = (origin + ((last + 1) * window_len) as f64 / rate as f64).min(end);

        RawSegment {
            start: Some(new_start),
            end: Some(new_end.max(new_start)),
            ..segment.clone()
        }
    }
}

impl SegmentAligner for EnergyAligner {
    fn align(
        &self,
        segments: &[RawSegment],
        audio: &AudioSegment,
        language: &str,
    ) -> Result<Vec<RawSegment>, BoxError> {
        if language != self.language {
            log::warn!(
                "Aligner loaded for '{}' used on '{language}' audio",
                self.language
            );
        }
        if audio.sample_rate() == 0 {
            return Err("cannot align audio with a zero sample rate".into());
        }
        Ok(segments.iter().map(|s| self.refine(s, audio)).collect())
    }
}

fn rms(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    (window.iter().map(|s| s * s).sum::<f32>() / window.len() as f32).sqrt()
}

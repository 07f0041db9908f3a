use std::path::Path;

use crate::audio::domain::audio_segment::AudioSegment;
use crate::BoxError;

/// Domain interface for decoding an audio file.
pub trait AudioLoader: Send {
    /// Decode `path` to mono PCM resampled to `sample_rate`.
    fn load(&self, path: &Path, sample_rate: u32) -> Result<AudioSegment, BoxError>;
}

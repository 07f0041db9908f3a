/// Decoded mono PCM audio normalized to [-1.0, 1.0].
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Seconds of audio, derived from the decoded sample count.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn sample_index_at_time(&self, time: f64) -> usize {
        ((time.max(0.0) * self.sample_rate as f64) as usize).min(self.samples.len())
    }

    /// Samples between two timestamps, clamped to the available audio.
    pub fn window(&self, start: f64, end: f64) -> &[f32] {
        let from = self.sample_index_at_time(start);
        let to = self.sample_index_at_time(end).max(from);
        &self.samples[from..to]
    }
}

use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::audio::domain::audio_loader::AudioLoader;
use crate::audio::domain::audio_segment::AudioSegment;
use crate::BoxError;

/// Input frames fed to the resampler per call.
const RESAMPLE_CHUNK: usize = 1024;

/// Decodes PCM WAV files with `hound`, downmixing to mono and resampling to
/// the requested rate with `rubato`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavAudioLoader;

impl AudioLoader for WavAudioLoader {
    fn load(&self, path: &Path, sample_rate: u32) -> Result<AudioSegment, BoxError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(format!("WAV file declares zero channels: {}", path.display()).into());
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let mono = downmix(&interleaved, spec.channels as usize);
        let samples = resample(&mono, spec.sample_rate, sample_rate)?;
        log::debug!(
            "Decoded {} ({} Hz, {} ch) to {} samples at {} Hz",
            path.display(),
            spec.sample_rate,
            spec.channels,
            samples.len(),
            sample_rate
        );
        Ok(AudioSegment::new(samples, sample_rate))
    }
}

/// Averages interleaved frames into a single channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Band-limited sample-rate conversion with a windowed-sinc filter, so
/// content above the target Nyquist frequency is removed instead of folded
/// back into the speech band.
///
/// The output holds `round(len * to_rate / from_rate)` samples, aligned with
/// the input (the filter delay is trimmed).
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, BoxError> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(format!("cannot resample from {from_rate} Hz to {to_rate} Hz").into());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1)?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(expected + delay);

    let mut chunks = samples.chunks_exact(RESAMPLE_CHUNK);
    for chunk in &mut chunks {
        let frames = resampler.process(&[chunk][..], None)?;
        output.extend_from_slice(&frames[0]);
    }
    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let frames = resampler.process_partial(Some(&[remainder][..]), None)?;
        output.extend_from_slice(&frames[0]);
    }
    // Flush the filter tail.
    while output.len() < expected + delay {
        let frames = resampler.process_partial::<&[f32]>(None, None)?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);
    Ok(output)
}

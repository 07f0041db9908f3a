use std::path::Path;

use ffmpeg_next::format::sample::Type as SampleType;
use ffmpeg_next::format::Sample;
use ffmpeg_next::util::frame::audio::Audio;

use crate::audio::domain::audio_loader::AudioLoader;
use crate::audio::domain::audio_segment::AudioSegment;
use crate::BoxError;

/// Decodes any container ffmpeg understands (mp3, m4a, ogg, video files...)
/// to mono f32 at the requested rate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegAudioLoader;

impl AudioLoader for FfmpegAudioLoader {
    fn load(&self, path: &Path, sample_rate: u32) -> Result<AudioSegment, BoxError> {
        ffmpeg_next::init()?;

        let mut ictx = ffmpeg_next::format::input(path)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Audio)
            .ok_or_else(|| format!("no audio stream in {}", path.display()))?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let mut decoder = codec_ctx.decoder().audio()?;

        let mut resampler = ffmpeg_next::software::resampling::Context::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            Sample::F32(SampleType::Planar),
            ffmpeg_next::ChannelLayout::MONO,
            sample_rate,
        )?;

        let mut samples: Vec<f32> = Vec::new();
        let mut decoded = Audio::empty();
        let mut resampled = Audio::empty();

        for (stream, packet) in ictx.packets() {
            if stream.index() != stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;
            while decoder.receive_frame(&mut decoded).is_ok() {
                resampler.run(&decoded, &mut resampled)?;
                append_mono(&resampled, &mut samples);
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            resampler.run(&decoded, &mut resampled)?;
            append_mono(&resampled, &mut samples);
        }

        // Resampler may still hold buffered output.
        if let Ok(Some(delay)) = resampler.flush(&mut resampled) {
            if delay.output > 0 {
                append_mono(&resampled, &mut samples);
            }
        }

        log::debug!(
            "Decoded {} to {} samples at {} Hz",
            path.display(),
            samples.len(),
            sample_rate
        );
        Ok(AudioSegment::new(samples, sample_rate))
    }
}

fn append_mono(frame: &Audio, out: &mut Vec<f32>) {
    let n = frame.samples();
    if n == 0 {
        return;
    }
    out.extend_from_slice(&frame.plane::<f32>(0)[..n]);
}

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_audio_loader;
pub mod wav_audio_loader;

/// Rate every stage consumes; segment timestamps and result duration are
/// expressed against it.
pub const CANONICAL_SAMPLE_RATE: u32 = 16000;

/// Language assumed when recognition cannot confirm one.
pub const DEFAULT_FALLBACK_LANGUAGE: &str = "fr";

/// Bucket for segments without a speaker in `text_by_speaker`.
pub const UNKNOWN_SPEAKER: &str = "UNKNOWN";

pub const WHISPER_MODEL_BASE_URL: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Directory name used under the platform cache and config directories.
pub const APP_DIR_NAME: &str = "Voxscribe";

pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "m4a", "mp4", "webm"];

/// Release hosting the ONNX diarization models `pyannote-rs` runs.
pub const PYANNOTE_MODEL_BASE_URL: &str =
    "https://github.com/thewh1teagle/pyannote-rs/releases/download/v0.1.0";

pub const SEGMENTATION_MODEL_NAME: &str = "segmentation-3.0.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "wespeaker_en_voxceleb_CAM++.onnx";

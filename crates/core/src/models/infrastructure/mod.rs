pub mod energy_aligner;
pub mod local_model_loader;
#[cfg(feature = "pyannote")]
pub mod pyannote_diarizer;
#[cfg(feature = "whisper")]
pub mod whisper_recognizer;

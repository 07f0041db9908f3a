use std::path::{Path, PathBuf};

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::domain::audio_segment::AudioSegment;
use crate::models::domain::engines::SpeechRecognizer;
use crate::models::domain::model_config::{ModelConfig, ModelSize};
use crate::shared::constants::WHISPER_MODEL_BASE_URL;
use crate::shared::model_resolver::{self, ModelLocations};
use crate::transcript::domain::raw_segment::{RawSegment, Recognition};
use crate::BoxError;

/// Speech recognizer using whisper.cpp via whisper-rs.
///
/// The model context is created once at load time and shared by every
/// `recognize` call; each call gets a fresh decoding state.
pub struct WhisperRecognizer {
    model_path: PathBuf,
    context: WhisperContext,
}

impl WhisperRecognizer {
    /// Resolves `ggml-<size>.bin` through the model cache (downloading it on
    /// first use) and loads it.
    pub fn load(config: &ModelConfig, locations: &ModelLocations) -> Result<Self, BoxError> {
        let name = model_file_name(config.model_size);
        let url = format!("{WHISPER_MODEL_BASE_URL}/{name}");
        let path = model_resolver::resolve(&name, &url, locations)?;
        Self::from_file(&path, config)
    }

    pub fn from_file(model_path: &Path, config: &ModelConfig) -> Result<Self, BoxError> {
        if !model_path.exists() {
            return Err(format!("Whisper model not found at: {}", model_path.display()).into());
        }
        let mut params = WhisperContextParameters::default();
        params.use_gpu = config.device.is_accelerator();
        let context = WhisperContext::new_with_params(
            model_path.to_str().ok_or("Invalid model path")?,
            params,
        )
        .map_err(|e| format!("Failed to load Whisper model: {e}"))?;
        log::info!(
            "Loaded Whisper model {} ({})",
            model_path.display(),
            config
        );
        Ok(Self {
            model_path: model_path.to_path_buf(),
            context,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn recognize(
        &self,
        audio: &AudioSegment,
        language_hint: Option<&str>,
    ) -> Result<Recognition, BoxError> {
        let mut state = self
            .context
            .create_state()
            .map_err(|e| format!("Failed to create Whisper state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(language_hint.unwrap_or("auto")));
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(num_cpus().min(8) as i32);

        state
            .full(params, audio.samples())
            .map_err(|e| format!("Whisper inference failed: {e}"))?;

        let language = whisper_rs::get_lang_str(state.full_lang_id_from_state())
            .map(|s| s.to_string());

        let mut segments = Vec::new();
        for idx in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(idx) else {
                continue;
            };
            let text = segment
                .to_str_lossy()
                .map(|cow| cow.trim().to_string())
                .unwrap_or_default();

            let mut probabilities = Vec::new();
            for token_idx in 0..segment.n_tokens() {
                let Some(token) = segment.get_token(token_idx) else {
                    continue;
                };
                // Special tokens ([_BEG_], <|endoftext|>...) carry no text.
                let is_special = token
                    .to_str()
                    .map(|t| t.trim_start().starts_with('[') || t.trim_start().starts_with('<'))
                    .unwrap_or(true);
                if !is_special {
                    probabilities.push(token.token_probability());
                }
            }

            // Segment timestamps are in 10 ms units.
            segments.push(RawSegment {
                start: Some(segment.start_timestamp() as f64 / 100.0),
                end: Some(segment.end_timestamp() as f64 / 100.0),
                text: Some(text),
                confidence: mean_probability(&probabilities),
                speaker: None,
            });
        }

        log::debug!(
            "Whisper produced {} segments, language {:?}",
            segments.len(),
            language
        );
        Ok(Recognition { language, segments })
    }
}

/// whisper.cpp weights file for a model size.
pub fn model_file_name(size: ModelSize) -> String {
    format!("ggml-{}.bin", size.as_str())
}

fn mean_probability(probabilities: &[f32]) -> Option<f32> {
    if probabilities.is_empty() {
        return None;
    }
    let mean = probabilities.iter().sum::<f32>() / probabilities.len() as f32;
    Some(mean.clamp(0.0, 1.0))
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

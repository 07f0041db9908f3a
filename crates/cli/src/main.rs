use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use voxscribe_core::audio::domain::audio_loader::AudioLoader;
use voxscribe_core::models::domain::model_config::{ComputeType, Device, ModelSize};
use voxscribe_core::models::infrastructure::local_model_loader::LocalModelLoader;
use voxscribe_core::models::model_registry::ModelRegistry;
use voxscribe_core::pipeline::pipeline_logger::LogPipelineLogger;
use voxscribe_core::pipeline::transcription_pipeline::{TranscribeOptions, TranscriptionPipeline};
use voxscribe_core::shared::constants::AUDIO_EXTENSIONS;
use voxscribe_core::shared::settings::Settings;
use voxscribe_core::transcript::domain::transcription_result::TranscriptionResult;

/// Transcribe audio recordings with timestamps and speaker labels.
#[derive(Parser)]
#[command(name = "voxscribe")]
struct Cli {
    /// Input audio file.
    input: PathBuf,

    /// Language hint (e.g. fr, en). Detected automatically when omitted.
    #[arg(long)]
    language: Option<String>,

    /// Label speakers. Needs an access token and the `pyannote` feature.
    #[arg(long)]
    diarize: bool,

    /// Keep the transcript when diarization fails instead of aborting.
    #[arg(long, requires = "diarize")]
    best_effort_diarization: bool,

    /// Lower bound on the number of speakers.
    #[arg(long)]
    min_speakers: Option<u32>,

    /// Upper bound on the number of speakers.
    #[arg(long)]
    max_speakers: Option<u32>,

    /// Recognition model: tiny, base, small, medium, large-v2, large-v3.
    #[arg(long)]
    model_size: Option<ModelSize>,

    /// Inference device: auto, cpu, cuda.
    #[arg(long)]
    device: Option<Device>,

    /// Numeric precision: float16, float32, int8.
    #[arg(long)]
    compute_type: Option<ComputeType>,

    /// Access token for gated diarization models. Falls back to $HF_TOKEN.
    #[arg(long)]
    hf_token: Option<String>,

    /// Write SubRip subtitles to this file.
    #[arg(long)]
    srt: Option<PathBuf>,

    /// Write the full transcript as JSON to this file.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Human label for a speaker id, e.g. SPEAKER_00=Agent (repeatable).
    #[arg(long = "speaker-label", value_name = "ID=LABEL")]
    speaker_labels: Vec<String>,

    /// Settings file to use instead of the default one.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };
    apply_overrides(&mut settings, &cli);
    let labels = parse_speaker_labels(&cli.speaker_labels)?;

    let loader = LocalModelLoader::new(settings.model_locations());
    let registry = ModelRegistry::new(loader, settings.model_config(), settings.access_token());
    let mut pipeline = TranscriptionPipeline::new(registry, audio_loader())
        .with_fallback_language(settings.fallback_language.clone())
        .with_logger(Box::new(LogPipelineLogger::new()));

    let options = TranscribeOptions {
        language: cli.language.clone(),
        enable_diarization: cli.diarize,
        diarization_optional: cli.best_effort_diarization,
        min_speakers: cli.min_speakers,
        max_speakers: cli.max_speakers,
    };
    let mut result = pipeline.transcribe_file(&cli.input, &options)?;
    if !labels.is_empty() {
        result = result.with_speaker_labels(&labels);
    }

    print_transcript(&result);
    write_exports(&cli, &settings, &result)?;

    pipeline.logger().summary();
    pipeline.unload_models();
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !is_audio(&cli.input) {
        return Err(format!(
            "Unsupported input {}; expected one of: {}",
            cli.input.display(),
            AUDIO_EXTENSIONS.join(", ")
        )
        .into());
    }
    if !cfg!(feature = "ffmpeg") && !has_extension(&cli.input, "wav") {
        return Err("Only WAV input is supported without the `ffmpeg` feature".into());
    }
    if cli.diarize && !cfg!(feature = "pyannote") {
        return Err("--diarize needs a build with the `pyannote` feature".into());
    }
    if (cli.min_speakers.is_some() || cli.max_speakers.is_some()) && !cli.diarize {
        return Err("--min-speakers/--max-speakers require --diarize".into());
    }
    Ok(())
}

/// Command-line flags take precedence over the settings file.
fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(size) = cli.model_size {
        settings.model_size = size;
    }
    if let Some(device) = cli.device {
        settings.device = device;
    }
    if let Some(compute_type) = cli.compute_type {
        settings.compute_type = compute_type;
    }
    if let Some(token) = cli.hf_token.clone().or_else(|| std::env::var("HF_TOKEN").ok()) {
        settings.hf_token = Some(token);
    }
}

fn parse_speaker_labels(raw: &[String]) -> Result<HashMap<String, String>, String> {
    raw.iter()
        .map(|entry| match entry.split_once('=') {
            Some((id, label)) if !id.trim().is_empty() && !label.trim().is_empty() => {
                Ok((id.trim().to_string(), label.trim().to_string()))
            }
            _ => Err(format!("Speaker label must look like ID=LABEL, got '{entry}'")),
        })
        .collect()
}

fn print_transcript(result: &TranscriptionResult) {
    println!(
        "Language: {}  Duration: {:.1}s  Segments: {}  Speakers: {}",
        result.language(),
        result.duration(),
        result.segments().len(),
        result.speakers().len()
    );
    print!("{}", result.to_text());
    println!("\nFull text:\n{}", result.full_text());
}

fn write_exports(
    cli: &Cli,
    settings: &Settings,
    result: &TranscriptionResult,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(srt) = &cli.srt {
        let path = output_path(settings.output_dir.as_deref(), srt);
        fs::write(&path, result.to_srt())?;
        log::info!("Subtitles written to {}", path.display());
    }
    if let Some(json) = &cli.json {
        let path = output_path(settings.output_dir.as_deref(), json);
        fs::write(&path, result.to_json()?)?;
        log::info!("Transcript written to {}", path.display());
    }
    Ok(())
}

/// Relative export paths land in the configured output directory, if any.
fn output_path(output_dir: Option<&Path>, requested: &Path) -> PathBuf {
    match output_dir {
        Some(dir) if requested.is_relative() => dir.join(requested),
        _ => requested.to_path_buf(),
    }
}

#[cfg(feature = "ffmpeg")]
fn audio_loader() -> Box<dyn AudioLoader> {
    Box::new(voxscribe_core::audio::infrastructure::ffmpeg_audio_loader::FfmpegAudioLoader)
}

#[cfg(not(feature = "ffmpeg"))]
fn audio_loader() -> Box<dyn AudioLoader> {
    Box::new(voxscribe_core::audio::infrastructure::wav_audio_loader::WavAudioLoader)
}

fn is_audio(path: &Path) -> bool {
    AUDIO_EXTENSIONS.iter().any(|ext| has_extension(path, ext))
}

fn has_extension(path: &Path, expected: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

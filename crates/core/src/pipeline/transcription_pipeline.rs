use std::path::Path;
use std::time::Instant;

use crate::audio::domain::audio_loader::AudioLoader;
use crate::audio::domain::audio_segment::AudioSegment;
use crate::models::domain::engines::ModelProvider;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::segment_builder::{speakers_from_ids, SegmentBuilder};
use crate::pipeline::speaker_assignment::{assign_speakers, observed_speakers};
use crate::shared::constants::{CANONICAL_SAMPLE_RATE, DEFAULT_FALLBACK_LANGUAGE};
use crate::transcript::domain::error::{Stage, TranscriptionError};
use crate::transcript::domain::raw_segment::{SpeakerCountHints, SpeakerTurn};
use crate::transcript::domain::transcription_request::TranscriptionRequest;
use crate::transcript::domain::transcription_result::TranscriptionResult;

/// Per-call knobs for [`TranscriptionPipeline::transcribe_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeOptions {
    pub language: Option<String>,
    pub enable_diarization: bool,
    pub diarization_optional: bool,
    pub min_speakers: Option<u32>,
    pub max_speakers: Option<u32>,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            language: None,
            enable_diarization: true,
            diarization_optional: false,
            min_speakers: None,
            max_speakers: None,
        }
    }
}

/// Runs audio decode, recognition, alignment and optional diarization for
/// one request at a time, then assembles the transcript.
///
/// Model handles live in the provider and survive across requests, failed
/// ones included. `transcribe` takes `&mut self`: one pipeline serves one
/// caller at a time, and parallel work uses several pipelines.
pub struct TranscriptionPipeline<P: ModelProvider> {
    models: P,
    audio_loader: Box<dyn AudioLoader>,
    fallback_language: String,
    logger: Box<dyn PipelineLogger>,
}

impl<P: ModelProvider> TranscriptionPipeline<P> {
    pub fn new(models: P, audio_loader: Box<dyn AudioLoader>) -> Self {
        Self {
            models,
            audio_loader,
            fallback_language: DEFAULT_FALLBACK_LANGUAGE.to_string(),
            logger: Box::new(NullPipelineLogger),
        }
    }

    /// Language used when recognition cannot tell which one it heard.
    pub fn with_fallback_language(mut self, language: impl Into<String>) -> Self {
        self.fallback_language = language.into();
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn models(&self) -> &P {
        &self.models
    }

    pub fn fallback_language(&self) -> &str {
        &self.fallback_language
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    pub fn transcribe(
        &mut self,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let active = *self.models.config();
        let requested = request.model().resolve(active.device.is_accelerator());
        if requested != active {
            log::warn!(
                "Request asks for {requested} but this pipeline's models use {active}; using {active}"
            );
        }

        let t0 = Instant::now();
        let audio = self
            .audio_loader
            .load(request.audio_path(), CANONICAL_SAMPLE_RATE)
            .map_err(|e| TranscriptionError::stage(Stage::AudioDecode, e))?;
        self.logger.timing("audio", elapsed_ms(t0));
        log::info!(
            "Loaded {} ({:.1}s of audio)",
            request.audio_path().display(),
            audio.duration()
        );

        let t0 = Instant::now();
        let recognition = self
            .models
            .acquire_recognizer()?
            .recognize(&audio, request.language())
            .map_err(|e| TranscriptionError::stage(Stage::Recognition, e))?;
        self.logger.timing("recognition", elapsed_ms(t0));

        let language = match recognition.language.filter(|l| !l.trim().is_empty()) {
            Some(detected) => detected,
            None => {
                log::warn!(
                    "Recognition could not confirm a language, assuming '{}'",
                    self.fallback_language
                );
                self.fallback_language.clone()
            }
        };
        self.logger.info(&format!(
            "Detected language: {language} ({} segments)",
            recognition.segments.len()
        ));

        let t0 = Instant::now();
        let mut segments = self
            .models
            .acquire_aligner(&language)?
            .align(&recognition.segments, &audio, &language)
            .map_err(|e| TranscriptionError::stage(Stage::Alignment, e))?;
        self.logger.timing("alignment", elapsed_ms(t0));

        let mut speakers = Vec::new();
        if request.enable_diarization() {
            let t0 = Instant::now();
            match self.diarize(&audio, request.speaker_hints()) {
                Ok(turns) => {
                    segments = assign_speakers(&segments, &turns);
                    speakers = speakers_from_ids(observed_speakers(&segments));
                    log::info!(
                        "Diarization found {} turn(s), {} speaker(s) assigned",
                        turns.len(),
                        speakers.len()
                    );
                }
                Err(e) if request.diarization_optional() => {
                    log::warn!("Diarization failed, continuing without speakers: {e}");
                }
                Err(e) => return Err(e),
            }
            self.logger.timing("diarization", elapsed_ms(t0));
        }

        let t0 = Instant::now();
        let segments = SegmentBuilder::new(&speakers).build(&segments)?;
        self.logger.metric("segments", segments.len() as f64);
        self.logger.metric("speakers", speakers.len() as f64);
        let result = TranscriptionResult::new(
            request.audio_path(),
            language,
            audio.duration(),
            segments,
            speakers,
        );
        self.logger.timing("assembly", elapsed_ms(t0));
        Ok(result)
    }

    /// Builds a request against this pipeline's own model configuration and
    /// transcribes it.
    pub fn transcribe_file(
        &mut self,
        audio_path: impl AsRef<Path>,
        options: &TranscribeOptions,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let request = TranscriptionRequest::builder(audio_path.as_ref())
            .language(options.language.as_deref())
            .enable_diarization(options.enable_diarization)
            .diarization_optional(options.diarization_optional)
            .min_speakers(options.min_speakers)
            .max_speakers(options.max_speakers)
            .model(*self.models.config())
            .build()?;
        self.transcribe(&request)
    }

    /// Drops every cached model. The next request reloads what it needs.
    pub fn unload_models(&mut self) {
        self.models.release_all();
    }

    fn diarize(
        &mut self,
        audio: &AudioSegment,
        hints: SpeakerCountHints,
    ) -> Result<Vec<SpeakerTurn>, TranscriptionError> {
        self.models
            .acquire_diarizer()?
            .diarize(audio, hints)
            .map_err(|e| TranscriptionError::stage(Stage::Diarization, e))
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::models::domain::access_token::AccessToken;
    use crate::models::domain::engines::{
        ModelLoader, SegmentAligner, SpeakerDiarizer, SpeechRecognizer,
    };
    use crate::models::domain::model_config::{Device, ModelConfig, ModelSize};
    use crate::models::model_registry::ModelRegistry;
    use crate::transcript::domain::error::ModelKind;
    use crate::transcript::domain::raw_segment::{RawSegment, Recognition};
    use crate::transcript::domain::transcription_request::TranscriptionRequestBuilder;
    use crate::BoxError;

    // --- stubs ---

    /// What the stub engines return.
    #[derive(Clone, Default)]
    struct Script {
        /// `None` echoes the request's language hint back as detected.
        language: Option<String>,
        segments: Vec<RawSegment>,
        turns: Vec<SpeakerTurn>,
        fail_alignment: bool,
        fail_diarization: bool,
    }

    #[derive(Default)]
    struct Calls {
        recognizer_loads: AtomicUsize,
        aligner_loads: Mutex<Vec<String>>,
        diarizer_loads: AtomicUsize,
        releases: AtomicUsize,
        hints: Mutex<Vec<SpeakerCountHints>>,
    }

    struct ScriptedRecognizer(Script);
    impl SpeechRecognizer for ScriptedRecognizer {
        fn recognize(&self, _: &AudioSegment, hint: Option<&str>) -> Result<Recognition, BoxError> {
            Ok(Recognition {
                language: self.0.language.clone().or(hint.map(str::to_string)),
                segments: self.0.segments.clone(),
            })
        }
    }

    struct ScriptedAligner(bool);
    impl SegmentAligner for ScriptedAligner {
        fn align(
            &self,
            segments: &[RawSegment],
            _: &AudioSegment,
            _: &str,
        ) -> Result<Vec<RawSegment>, BoxError> {
            if self.0 {
                return Err("alignment model crashed".into());
            }
            Ok(segments.to_vec())
        }
    }

    struct ScriptedDiarizer {
        script: Script,
        calls: Arc<Calls>,
    }
    impl SpeakerDiarizer for ScriptedDiarizer {
        fn diarize(&self, _: &AudioSegment, hints: SpeakerCountHints) -> Result<Vec<SpeakerTurn>, BoxError> {
            self.calls.hints.lock().unwrap().push(hints);
            if self.script.fail_diarization {
                return Err("diarization model crashed".into());
            }
            Ok(self.script.turns.clone())
        }
    }

    struct ScriptedLoader {
        script: Script,
        calls: Arc<Calls>,
    }

    impl ModelLoader for ScriptedLoader {
        fn load_recognizer(&self, _: &ModelConfig) -> Result<Box<dyn SpeechRecognizer>, BoxError> {
            self.calls.recognizer_loads.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedRecognizer(self.script.clone())))
        }

        fn load_aligner(&self, language: &str, _: Device) -> Result<Box<dyn SegmentAligner>, BoxError> {
            self.calls
                .aligner_loads
                .lock()
                .unwrap()
                .push(language.to_string());
            Ok(Box::new(ScriptedAligner(self.script.fail_alignment)))
        }

        fn load_diarizer(&self, _: &AccessToken, _: Device) -> Result<Box<dyn SpeakerDiarizer>, BoxError> {
            self.calls.diarizer_loads.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedDiarizer {
                script: self.script.clone(),
                calls: self.calls.clone(),
            }))
        }

        fn release_accelerator_memory(&self, _: Device) {
            self.calls.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Returns `samples` of silence, or fails.
    struct StubAudioLoader {
        samples: usize,
        fail: bool,
    }

    impl AudioLoader for StubAudioLoader {
        fn load(&self, _: &Path, sample_rate: u32) -> Result<AudioSegment, BoxError> {
            if self.fail {
                return Err("unsupported codec".into());
            }
            Ok(AudioSegment::new(vec![0.0; self.samples], sample_rate))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingLogger {
        stages: Arc<Mutex<Vec<String>>>,
    }

    impl PipelineLogger for RecordingLogger {
        fn timing(&mut self, stage: &str, _duration_ms: f64) {
            self.stages.lock().unwrap().push(stage.to_string());
        }
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, _message: &str) {}
    }

    // --- fixtures ---

    type TestPipeline = TranscriptionPipeline<ModelRegistry<ScriptedLoader>>;

    fn two_speaker_script() -> Script {
        Script {
            language: Some("fr".to_string()),
            segments: vec![
                RawSegment::timed(0.0, 1.5, " Bonjour "),
                RawSegment::timed(1.5, 3.25, "ça va"),
                RawSegment::timed(4.0, 5.0, "silence?"),
            ],
            turns: vec![
                SpeakerTurn::new(0.0, 1.6, "SPEAKER_01"),
                SpeakerTurn::new(1.6, 3.5, "SPEAKER_00"),
            ],
            ..Script::default()
        }
    }

    fn pipeline_with(script: Script, token: Option<&str>, audio: StubAudioLoader) -> (TestPipeline, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let loader = ScriptedLoader {
            script,
            calls: calls.clone(),
        };
        let registry = ModelRegistry::new(loader, ModelConfig::default(), token.and_then(AccessToken::new));
        (TranscriptionPipeline::new(registry, Box::new(audio)), calls)
    }

    fn pipeline(script: Script, token: Option<&str>) -> (TestPipeline, Arc<Calls>) {
        pipeline_with(
            script,
            token,
            StubAudioLoader {
                samples: 80_000,
                fail: false,
            },
        )
    }

    fn audio_file() -> NamedTempFile {
        NamedTempFile::new().unwrap()
    }

    fn request(file: &NamedTempFile) -> TranscriptionRequestBuilder {
        TranscriptionRequest::builder(file.path())
    }

    // --- happy path ---

    #[test]
    fn test_full_run_assigns_speakers_by_overlap() {
        let file = audio_file();
        let (mut pipeline, calls) = pipeline(two_speaker_script(), Some("hf_token"));

        let result = pipeline.transcribe(&request(&file).build().unwrap()).unwrap();

        assert_eq!(result.language(), "fr");
        assert_relative_eq!(result.duration(), 5.0);
        assert_eq!(result.audio_path(), file.path());
        let ids: Vec<Option<&str>> = result.segments().iter().map(|s| s.speaker_id()).collect();
        assert_eq!(ids, [Some("SPEAKER_01"), Some("SPEAKER_00"), None]);
        let speakers: Vec<&str> = result.speakers().iter().map(|s| s.id()).collect();
        assert_eq!(speakers, ["SPEAKER_00", "SPEAKER_01"]);
        assert!(Arc::ptr_eq(
            result.segments()[1].speaker().unwrap(),
            &result.speakers()[0]
        ));
        assert_eq!(result.full_text(), "Bonjour ça va silence?");
        assert_eq!(calls.diarizer_loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_srt_of_full_run() {
        let file = audio_file();
        let script = Script {
            segments: vec![
                RawSegment::timed(0.0, 1.5, "Bonjour"),
                RawSegment::timed(1.5, 3.25, "ça va"),
            ],
            turns: vec![SpeakerTurn::new(1.5, 3.25, "SPEAKER_00")],
            ..two_speaker_script()
        };
        let (mut pipeline, _) = pipeline(script, Some("hf_token"));

        let result = pipeline.transcribe(&request(&file).build().unwrap()).unwrap();

        assert_eq!(
            result.to_srt(),
            "1\n00:00:00,000 --> 00:00:01,500\nBonjour\n\n\
             2\n00:00:01,500 --> 00:00:03,250\n[SPEAKER_00] ça va\n\n"
        );
    }

    #[test]
    fn test_speaker_hints_forwarded_only_when_set() {
        let file = audio_file();
        let (mut pipeline, calls) = pipeline(two_speaker_script(), Some("hf_token"));

        let req = request(&file).min_speakers(Some(2)).build().unwrap();
        pipeline.transcribe(&req).unwrap();
        let req = request(&file).max_speakers(Some(3)).build().unwrap();
        pipeline.transcribe(&req).unwrap();

        let hints = calls.hints.lock().unwrap();
        assert_eq!(
            *hints,
            vec![
                SpeakerCountHints {
                    min_speakers: Some(2),
                    max_speakers: None
                },
                SpeakerCountHints {
                    min_speakers: None,
                    max_speakers: Some(3)
                },
            ]
        );
    }

    // --- diarization switches ---

    #[test]
    fn test_diarization_disabled_needs_no_credential() {
        let file = audio_file();
        let (mut pipeline, calls) = pipeline(two_speaker_script(), None);

        let req = request(&file).enable_diarization(false).build().unwrap();
        let result = pipeline.transcribe(&req).unwrap();

        assert!(result.speakers().is_empty());
        assert!(result.segments().iter().all(|s| s.speaker().is_none()));
        assert_eq!(calls.diarizer_loads.load(Ordering::SeqCst), 0);
        assert!(!pipeline.models().has_diarizer());
    }

    #[test]
    fn test_missing_credential_aborts_after_alignment() {
        let file = audio_file();
        let (mut pipeline, calls) = pipeline(two_speaker_script(), None);

        let err = pipeline
            .transcribe(&request(&file).build().unwrap())
            .unwrap_err();

        assert!(matches!(err, TranscriptionError::MissingCredential));
        assert_eq!(calls.recognizer_loads.load(Ordering::SeqCst), 1);
        assert_eq!(calls.diarizer_loads.load(Ordering::SeqCst), 0);
        assert!(calls.hints.lock().unwrap().is_empty());
    }

    #[test]
    fn test_optional_diarization_degrades_to_no_speakers() {
        let file = audio_file();
        let (mut pipeline, _) = pipeline(two_speaker_script(), None);

        let req = request(&file).diarization_optional(true).build().unwrap();
        let result = pipeline.transcribe(&req).unwrap();

        assert!(result.speakers().is_empty());
        assert_eq!(result.segments().len(), 3);
    }

    #[test]
    fn test_diarization_failure_is_a_stage_error() {
        let file = audio_file();
        let script = Script {
            fail_diarization: true,
            ..two_speaker_script()
        };
        let (mut pipeline, _) = pipeline(script, Some("hf_token"));

        let err = pipeline
            .transcribe(&request(&file).build().unwrap())
            .unwrap_err();

        assert_eq!(err.failed_stage(), Some(Stage::Diarization));
        assert!(matches!(err, TranscriptionError::Stage { .. }));
    }

    // --- language handling ---

    #[test]
    fn test_detected_language_wins_over_hint() {
        let file = audio_file();
        let (mut pipeline, calls) = pipeline(two_speaker_script(), None);

        let req = request(&file)
            .language(Some("en"))
            .enable_diarization(false)
            .build()
            .unwrap();
        let result = pipeline.transcribe(&req).unwrap();

        assert_eq!(result.language(), "fr");
        assert_eq!(*calls.aligner_loads.lock().unwrap(), vec!["fr"]);
    }

    #[test]
    fn test_unconfirmed_language_uses_fallback() {
        let file = audio_file();
        let script = Script {
            language: None,
            ..two_speaker_script()
        };
        let (pipeline, _) = pipeline(script, None);
        let mut pipeline = pipeline.with_fallback_language("de");

        let req = request(&file).enable_diarization(false).build().unwrap();
        let result = pipeline.transcribe(&req).unwrap();

        assert_eq!(result.language(), "de");
    }

    #[test]
    fn test_default_fallback_is_french() {
        let (pipeline, _) = pipeline(Script::default(), None);
        assert_eq!(pipeline.fallback_language(), "fr");
    }

    #[test]
    fn test_aligner_follows_language_across_requests() {
        let file = audio_file();
        let script = Script {
            language: None,
            ..two_speaker_script()
        };
        let (mut pipeline, calls) = pipeline(script, None);

        for lang in ["fr", "en", "fr", "fr"] {
            let req = request(&file)
                .language(Some(lang))
                .enable_diarization(false)
                .build()
                .unwrap();
            assert_eq!(pipeline.transcribe(&req).unwrap().language(), lang);
        }

        assert_eq!(calls.recognizer_loads.load(Ordering::SeqCst), 1);
        assert_eq!(*calls.aligner_loads.lock().unwrap(), vec!["fr", "en", "fr"]);
    }

    // --- failures ---

    #[test]
    fn test_audio_decode_failure_loads_no_models() {
        let file = audio_file();
        let (mut pipeline, calls) = pipeline_with(
            two_speaker_script(),
            Some("hf_token"),
            StubAudioLoader {
                samples: 0,
                fail: true,
            },
        );

        let err = pipeline
            .transcribe(&request(&file).build().unwrap())
            .unwrap_err();

        assert_eq!(err.failed_stage(), Some(Stage::AudioDecode));
        assert_eq!(calls.recognizer_loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_alignment_failure_keeps_recognizer_cached() {
        let file = audio_file();
        let script = Script {
            fail_alignment: true,
            ..two_speaker_script()
        };
        let (mut pipeline, calls) = pipeline(script, None);
        let req = request(&file).enable_diarization(false).build().unwrap();

        let first = pipeline.transcribe(&req).unwrap_err();
        let second = pipeline.transcribe(&req).unwrap_err();

        assert_eq!(first.failed_stage(), Some(Stage::Alignment));
        assert_eq!(second.failed_stage(), Some(Stage::Alignment));
        assert_eq!(calls.recognizer_loads.load(Ordering::SeqCst), 1);
        assert!(pipeline.models().has_recognizer());
    }

    #[test]
    fn test_invalid_engine_output_is_rejected() {
        let file = audio_file();
        let script = Script {
            segments: vec![RawSegment::timed(2.0, 1.0, "backwards")],
            ..two_speaker_script()
        };
        let (mut pipeline, _) = pipeline(script, None);

        let req = request(&file).enable_diarization(false).build().unwrap();
        let err = pipeline.transcribe(&req).unwrap_err();

        assert!(matches!(err, TranscriptionError::InvalidSegment { index: 0, .. }));
    }

    #[test]
    fn test_model_load_failure_is_surfaced() {
        struct BrokenLoader;
        impl ModelLoader for BrokenLoader {
            fn load_recognizer(&self, _: &ModelConfig) -> Result<Box<dyn SpeechRecognizer>, BoxError> {
                Err("weights missing".into())
            }
            fn load_aligner(&self, _: &str, _: Device) -> Result<Box<dyn SegmentAligner>, BoxError> {
                Err("weights missing".into())
            }
            fn load_diarizer(&self, _: &AccessToken, _: Device) -> Result<Box<dyn SpeakerDiarizer>, BoxError> {
                Err("weights missing".into())
            }
        }

        let file = audio_file();
        let registry = ModelRegistry::new(BrokenLoader, ModelConfig::default(), None);
        let mut pipeline = TranscriptionPipeline::new(
            registry,
            Box::new(StubAudioLoader {
                samples: 16000,
                fail: false,
            }),
        );

        let err = pipeline
            .transcribe(&request(&file).build().unwrap())
            .unwrap_err();

        assert!(matches!(
            err,
            TranscriptionError::ModelLoad {
                kind: ModelKind::Recognition,
                ..
            }
        ));
    }

    // --- lifecycle ---

    #[test]
    fn test_unload_models_forces_reload() {
        let file = audio_file();
        let (mut pipeline, calls) = pipeline(two_speaker_script(), Some("hf_token"));
        let req = request(&file).build().unwrap();

        pipeline.transcribe(&req).unwrap();
        pipeline.unload_models();
        pipeline.unload_models();
        pipeline.transcribe(&req).unwrap();

        assert_eq!(calls.releases.load(Ordering::SeqCst), 2);
        assert_eq!(calls.recognizer_loads.load(Ordering::SeqCst), 2);
        assert_eq!(calls.diarizer_loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_transcribe_file_uses_pipeline_config() {
        let file = audio_file();
        let (mut pipeline, _) = pipeline(two_speaker_script(), None);
        let options = TranscribeOptions {
            enable_diarization: false,
            ..TranscribeOptions::default()
        };

        let result = pipeline.transcribe_file(file.path(), &options).unwrap();

        assert_eq!(result.segments().len(), 3);
        assert_eq!(pipeline.models().config().model_size, ModelSize::LargeV3);
    }

    #[test]
    fn test_transcribe_file_validates_path() {
        let (mut pipeline, calls) = pipeline(two_speaker_script(), None);
        let err = pipeline
            .transcribe_file("/nonexistent/call.wav", &TranscribeOptions::default())
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::Validation(_)));
        assert_eq!(calls.recognizer_loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_logger_sees_every_stage() {
        let file = audio_file();
        let logger = RecordingLogger::default();
        let (pipeline, _) = pipeline(two_speaker_script(), Some("hf_token"));
        let mut pipeline = pipeline.with_logger(Box::new(logger.clone()));

        pipeline.transcribe(&request(&file).build().unwrap()).unwrap();

        assert_eq!(
            *logger.stages.lock().unwrap(),
            vec!["audio", "recognition", "alignment", "diarization", "assembly"]
        );
    }
}

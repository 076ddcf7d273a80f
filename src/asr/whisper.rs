use std::sync::Arc;
use async_trait::async_trait;
use tracing::{info, debug};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::asr::{normalize_language, Transcriber, Transcript};
use crate::audio::decode_to_pcm;
use crate::error::BackendError;
use crate::subtitles::{format_srt, srt_to_vtt, Segment};

/// Decoding knobs shared by both whisper backends.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    pub threads: i32,
    /// `None` disables the average log-probability fallback.
    pub logprob_thold: Option<f32>,
    pub no_speech_thold: f32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            logprob_thold: Some(-1.0),
            no_speech_thold: 0.6,
        }
    }
}

impl DecodeOptions {
    /// Settings that keep quiet recordings from decoding to empty output.
    pub fn quiet_audio(threads: i32) -> Self {
        Self {
            threads,
            logprob_thold: None,
            no_speech_thold: 0.3,
        }
    }
}

pub fn load_model(model_path: &str) -> Result<Arc<WhisperContext>, BackendError> {
    info!("Loading whisper model from {}", model_path);
    WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
        .map(Arc::new)
        .map_err(|e| BackendError::model(format!("failed to open whisper model {}: {}", model_path, e)))
}

fn build_params<'a>(language: Option<&'a str>, options: DecodeOptions) -> FullParams<'a, 'a> {
    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

    params.set_n_threads(options.threads);
    params.set_translate(false);
    params.set_no_context(false);
    params.set_single_segment(false);
    params.set_suppress_blank(true);
    params.set_suppress_non_speech_tokens(true);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_temperature(0.0);

    params.set_logprob_thold(options.logprob_thold.unwrap_or(f32::NEG_INFINITY));
    params.set_no_speech_thold(options.no_speech_thold);

    // "auto" lets whisper detect the spoken language
    params.set_language(Some(language.unwrap_or("auto")));
    params
}

/// Run one full decode with a fresh state, so concurrent calls never share
/// decoder state. Returns the segments and the language whisper settled on.
fn transcribe_samples(
    ctx: &WhisperContext,
    audio: &[f32],
    language: Option<&str>,
    options: DecodeOptions,
) -> Result<(Vec<Segment>, Option<String>), BackendError> {
    let mut state = ctx
        .create_state()
        .map_err(|e| BackendError::model(format!("failed to create whisper state: {}", e)))?;

    state
        .full(build_params(language, options), audio)
        .map_err(|e| BackendError::model(format!("whisper decoding failed: {}", e)))?;

    let num_segments = state
        .full_n_segments()
        .map_err(|e| BackendError::model(e.to_string()))?;

    let mut segments = Vec::with_capacity(num_segments.max(0) as usize);
    for i in 0..num_segments {
        let text = state
            .full_get_segment_text(i)
            .map_err(|e| BackendError::model(e.to_string()))?;
        // timestamps are in units of 10 ms
        let start = state.full_get_segment_t0(i).map_err(|e| BackendError::model(e.to_string()))?;
        let end = state.full_get_segment_t1(i).map_err(|e| BackendError::model(e.to_string()))?;

        segments.push(Segment {
            start: start as f64 / 100.0,
            end: end as f64 / 100.0,
            text,
        });
    }

    let detected = match language {
        Some(lang) => Some(lang.to_string()),
        None => state
            .full_lang_id_from_state()
            .ok()
            .and_then(whisper_rs::get_lang_str)
            .map(str::to_string),
    };

    debug!("whisper produced {} segments", segments.len());
    Ok((segments, detected))
}

async fn decode_and_transcribe(
    ctx: Arc<WhisperContext>,
    source: &str,
    language: Option<String>,
    options: DecodeOptions,
) -> Result<(String, Option<String>), BackendError> {
    let audio = decode_to_pcm(source).await?;

    let (segments, detected) = tokio::task::spawn_blocking(move || {
        transcribe_samples(&ctx, &audio, language.as_deref(), options)
    })
    .await
    .map_err(|e| BackendError::model(format!("whisper task aborted: {}", e)))??;

    Ok((srt_to_vtt(&format_srt(&segments)), detected))
}

/// One recognizer bound to a single language, fed through an ffmpeg pipe.
pub struct StreamingTranscriber {
    ctx: Arc<WhisperContext>,
    language: String,
    options: DecodeOptions,
}

impl StreamingTranscriber {
    pub fn new(model_path: &str, language: &str, threads: i32) -> Result<Self, BackendError> {
        Ok(Self {
            ctx: load_model(model_path)?,
            language: normalize_language(language),
            options: DecodeOptions { threads, ..DecodeOptions::default() },
        })
    }
}

#[async_trait]
impl Transcriber for StreamingTranscriber {
    async fn generate(&self, source: &str, language: Option<&str>) -> Result<Transcript, BackendError> {
        if let Some(requested) = language {
            if normalize_language(requested) != self.language {
                return Err(BackendError::unsupported(Some(requested)));
            }
        }

        let (text, _) = decode_and_transcribe(
            self.ctx.clone(),
            source,
            Some(self.language.clone()),
            self.options,
        )
        .await?;

        Ok(Transcript { text, language: self.language.clone() })
    }

    fn name(&self) -> &str {
        "whisper-streaming"
    }
}

/// A single multilingual model that detects the language when none is requested.
pub struct WhisperTranscriber {
    ctx: Arc<WhisperContext>,
    options: DecodeOptions,
}

impl WhisperTranscriber {
    pub fn new(model_path: String, threads: i32) -> Result<Self, BackendError> {
        Ok(Self {
            ctx: load_model(&model_path)?,
            options: DecodeOptions::quiet_audio(threads),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn generate(&self, source: &str, language: Option<&str>) -> Result<Transcript, BackendError> {
        let requested = language.map(normalize_language);
        if let Some(lang) = &requested {
            if whisper_rs::get_lang_id(lang).is_none() {
                return Err(BackendError::unsupported(Some(lang.as_str())));
            }
        }

        let (text, detected) =
            decode_and_transcribe(self.ctx.clone(), source, requested.clone(), self.options).await?;

        let language = detected
            .or(requested)
            .ok_or_else(|| BackendError::model("whisper did not report a language"))?;

        Ok(Transcript { text, language })
    }

    fn name(&self) -> &str {
        "whisper"
    }
}

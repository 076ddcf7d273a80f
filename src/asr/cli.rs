use std::path::{Path, PathBuf};
use std::process::Stdio;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::asr::{normalize_language, Transcriber, Transcript};
use crate::error::BackendError;
use crate::subtitles::srt_to_vtt;

/// Arguments of `vosk-transcriber` writing SRT to a file.
pub const DEFAULT_ARGS: &[&str] = &[
    "--model", "{model}",
    "-i", "{input}",
    "--log-level", "WARN",
    "-t", "srt",
    "-o", "{output}",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Srt,
    Vtt,
}

/// Shells out to an external transcription program, one process per call.
///
/// Arguments are a template where `{model}`, `{input}`, `{output}` and
/// `{language}` are substituted. Without an `{output}` placeholder the
/// subtitles are read from stdout.
pub struct CliTranscriber {
    program: String,
    args: Vec<String>,
    model_path: PathBuf,
    language: String,
    format: OutputFormat,
}

impl CliTranscriber {
    pub fn new(program: impl Into<String>, model_path: impl Into<PathBuf>, language: &str) -> Self {
        Self {
            program: program.into(),
            args: DEFAULT_ARGS.iter().map(|a| a.to_string()).collect(),
            model_path: model_path.into(),
            language: normalize_language(language),
            format: OutputFormat::Srt,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn render_args(&self, input: &str, output: &Path) -> Vec<String> {
        let model = self.model_path.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{model}", &model)
                    .replace("{input}", input)
                    .replace("{output}", &output)
                    .replace("{language}", &self.language)
            })
            .collect()
    }

    fn writes_file(&self) -> bool {
        self.args.iter().any(|a| a.contains("{output}"))
    }
}

#[async_trait]
impl Transcriber for CliTranscriber {
    async fn generate(&self, source: &str, language: Option<&str>) -> Result<Transcript, BackendError> {
        if let Some(requested) = language {
            if normalize_language(requested) != self.language {
                return Err(BackendError::unsupported(Some(requested)));
            }
        }

        let workdir = tempfile::tempdir()?;
        let output_path = workdir.path().join("subtitles.out");
        let args = self.render_args(source, &output_path);

        info!("Running {} for {}", self.program, source);
        debug!("{} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BackendError::Spawn { program: self.program.clone(), source: e })?;

        if !output.status.success() {
            return Err(BackendError::ToolFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let raw = if self.writes_file() {
            tokio::fs::read_to_string(&output_path).await?
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };

        let text = match self.format {
            OutputFormat::Srt => srt_to_vtt(&raw),
            OutputFormat::Vtt => raw,
        };

        Ok(Transcript { text, language: self.language.clone() })
    }

    fn name(&self) -> &str {
        &self.program
    }
}

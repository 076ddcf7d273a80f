//! Startup settings, read from the environment and an optional `.env` file.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_API_PORT: u16 = 50055;
const DEFAULT_REC_HOST: &str = "localhost";
const DEFAULT_REC_PORT: u16 = 50053;
const DEFAULT_WHISPER_MODEL: &str = "./models/ggml-large-v3.bin";
const DEFAULT_CLI_PROGRAM: &str = "vosk-transcriber";
const DEFAULT_LOG_DIR: &str = "./logs";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Which transcription backends to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// One multilingual whisper model that detects the language.
    Whisper,
    /// One whisper model per language, listed in `MODELS`.
    Streaming,
    /// One external program per language, listed in `MODELS`.
    Cli,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "whisper" | "ml" => Ok(BackendKind::Whisper),
            "streaming" => Ok(BackendKind::Streaming),
            "cli" => Ok(BackendKind::Cli),
            other => Err(format!("unknown transcriber {:?}, expected whisper, streaming or cli", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub path: PathBuf,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_port: u16,
    pub receiver_host: String,
    pub receiver_port: u16,
    pub backend: BackendKind,
    pub whisper_model: String,
    pub whisper_threads: i32,
    pub models: Vec<ModelSpec>,
    pub cli_program: String,
    pub cli_args: Option<Vec<String>>,
    pub workers: usize,
    pub auth_token: Option<String>,
    pub drain_timeout: Duration,
    pub join_timeout: Duration,
    pub log_dir: String,
}

impl Settings {
    /// Process environment first, then `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).or_else(|_| dotenv::var(key)).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match get("TRANSCRIBER") {
            Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                key: "TRANSCRIBER",
                value,
                reason,
            })?,
            None => BackendKind::Whisper,
        };

        let models = match get("MODELS") {
            Some(value) => parse_models(&value)?,
            None => Vec::new(),
        };
        if backend != BackendKind::Whisper && models.is_empty() {
            return Err(ConfigError::Missing("MODELS"));
        }

        let workers: usize = parse(&get, "CNT_WORKERS", 1)?;
        if workers == 0 {
            return Err(ConfigError::Invalid {
                key: "CNT_WORKERS",
                value: "0".to_string(),
                reason: "at least one worker is required".to_string(),
            });
        }

        Ok(Self {
            api_port: parse(&get, "API_PORT", DEFAULT_API_PORT)?,
            receiver_host: get("REC_HOST").unwrap_or_else(|| DEFAULT_REC_HOST.to_string()),
            receiver_port: parse(&get, "REC_PORT", DEFAULT_REC_PORT)?,
            backend,
            whisper_model: get("WHISPER_MODEL").unwrap_or_else(|| DEFAULT_WHISPER_MODEL.to_string()),
            whisper_threads: parse(&get, "WHISPER_THREADS", 4)?,
            models,
            cli_program: get("CLI_PROGRAM").unwrap_or_else(|| DEFAULT_CLI_PROGRAM.to_string()),
            cli_args: get("CLI_ARGS").map(|args| args.split_whitespace().map(str::to_string).collect()),
            workers,
            auth_token: get("AUTH_TOKEN"),
            drain_timeout: Duration::from_secs(parse(&get, "DRAIN_TIMEOUT_SECS", 10)?),
            join_timeout: Duration::from_secs(parse(&get, "JOIN_TIMEOUT_SECS", 30)?),
            log_dir: get("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string()),
        })
    }

    /// `host:port` of the subtitle receiver.
    pub fn receiver_address(&self) -> String {
        format!("{}:{}", self.receiver_host, self.receiver_port)
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

/// `path:lang` pairs separated by commas.
fn parse_models(value: &str) -> Result<Vec<ModelSpec>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.rsplit_once(':') {
            Some((path, language)) if !path.is_empty() && !language.is_empty() => Ok(ModelSpec {
                path: PathBuf::from(path),
                language: language.to_string(),
            }),
            _ => Err(ConfigError::Invalid {
                key: "MODELS",
                value: entry.to_string(),
                reason: "expected path:language".to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.api_port, 50055);
        assert_eq!(s.receiver_address(), "localhost:50053");
        assert_eq!(s.backend, BackendKind::Whisper);
        assert_eq!(s.workers, 1);
        assert_eq!(s.auth_token, None);
        assert_eq!(s.drain_timeout, Duration::from_secs(10));
        assert_eq!(s.join_timeout, Duration::from_secs(30));
        assert!(s.cli_args.is_none());
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("API_PORT", "8080"),
            ("REC_HOST", "receiver"),
            ("REC_PORT", "9000"),
            ("TRANSCRIBER", "Streaming"),
            ("MODELS", "/models/vosk-de:de, /models/vosk-en:en"),
            ("CNT_WORKERS", "4"),
            ("AUTH_TOKEN", "s3cret"),
            ("CLI_ARGS", "--model {model} -i {input}"),
        ])
        .unwrap();

        assert_eq!(s.api_port, 8080);
        assert_eq!(s.receiver_address(), "receiver:9000");
        assert_eq!(s.backend, BackendKind::Streaming);
        assert_eq!(s.workers, 4);
        assert_eq!(s.auth_token.as_deref(), Some("s3cret"));
        assert_eq!(
            s.models,
            vec![
                ModelSpec { path: PathBuf::from("/models/vosk-de"), language: "de".to_string() },
                ModelSpec { path: PathBuf::from("/models/vosk-en"), language: "en".to_string() },
            ]
        );
        assert_eq!(s.cli_args.unwrap(), vec!["--model", "{model}", "-i", "{input}"]);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            settings(&[("API_PORT", "http")]).unwrap_err(),
            ConfigError::Invalid { key: "API_PORT", .. }
        ));
        assert!(matches!(
            settings(&[("CNT_WORKERS", "0")]).unwrap_err(),
            ConfigError::Invalid { key: "CNT_WORKERS", .. }
        ));
        assert!(matches!(
            settings(&[("TRANSCRIBER", "kaldi")]).unwrap_err(),
            ConfigError::Invalid { key: "TRANSCRIBER", .. }
        ));
        assert!(matches!(
            settings(&[("TRANSCRIBER", "cli"), ("MODELS", "/models/vosk-de")]).unwrap_err(),
            ConfigError::Invalid { key: "MODELS", .. }
        ));
    }

    #[test]
    fn test_models_required_per_language_backends() {
        assert_eq!(
            settings(&[("TRANSCRIBER", "cli")]).unwrap_err(),
            ConfigError::Missing("MODELS")
        );
        assert!(settings(&[("TRANSCRIBER", "whisper")]).is_ok());
    }
}

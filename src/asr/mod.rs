use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use tracing::info;

use crate::config::{BackendKind, Settings};
use crate::error::BackendError;

pub mod cli;
#[cfg(feature = "whisper")]
pub mod whisper;

/// WebVTT subtitles plus the language they were produced in.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub language: String,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `source` (a local path or URL) into WebVTT.
    ///
    /// `language` is the requested language, `None` asks the backend to
    /// detect it. Backends that serve a fixed language fail with
    /// [`BackendError::UnsupportedLanguage`] for any other request.
    async fn generate(&self, source: &str, language: Option<&str>) -> Result<Transcript, BackendError>;

    /// Human-readable backend name for logs.
    fn name(&self) -> &str;
}

static LANGUAGE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("english", "en"),
        ("deutsch", "de"),
        ("german", "de"),
        ("français", "fr"),
        ("french", "fr"),
        ("español", "es"),
        ("spanish", "es"),
    ])
});

/// Lower-case a language tag and fold well-known names onto their ISO code.
pub fn normalize_language(language: &str) -> String {
    let lower = language.trim().to_lowercase();
    LANGUAGE_ALIASES
        .get(lower.as_str())
        .map(|code| code.to_string())
        .unwrap_or(lower)
}

/// The backends loaded at startup, immutable afterwards.
///
/// A request with a language is served by the backend registered for it,
/// otherwise by the fallback. A request without a language can only be
/// served by the fallback.
#[derive(Clone, Default)]
pub struct BackendSet {
    per_language: HashMap<String, Arc<dyn Transcriber>>,
    fallback: Option<Arc<dyn Transcriber>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding one backend that detects the language itself.
    pub fn single(backend: Arc<dyn Transcriber>) -> Self {
        Self {
            per_language: HashMap::new(),
            fallback: Some(backend),
        }
    }

    pub fn register(mut self, language: &str, backend: Arc<dyn Transcriber>) -> Self {
        let language = normalize_language(language);
        info!("Registering {} backend for language: {}", backend.name(), language);
        self.per_language.insert(language, backend);
        self
    }

    pub fn with_fallback(mut self, backend: Arc<dyn Transcriber>) -> Self {
        info!("Registering {} as fallback backend", backend.name());
        self.fallback = Some(backend);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.per_language.is_empty() && self.fallback.is_none()
    }

    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.per_language.keys().cloned().collect();
        languages.sort();
        languages
    }

    /// Pick the backend for a request, returning it with the normalized language.
    pub fn resolve(&self, language: Option<&str>) -> Result<(Arc<dyn Transcriber>, Option<String>), BackendError> {
        let language = language
            .filter(|l| !l.trim().is_empty())
            .map(normalize_language);

        let backend = match &language {
            Some(lang) => self.per_language.get(lang).or(self.fallback.as_ref()),
            None => self.fallback.as_ref(),
        };

        match backend {
            Some(backend) => Ok((backend.clone(), language)),
            None => Err(BackendError::UnsupportedLanguage(language)),
        }
    }
}

/// Load the backends selected in the settings. Any failure is fatal at startup.
pub fn build_backends(settings: &Settings) -> Result<BackendSet, BackendError> {
    let mut set = BackendSet::new();

    match settings.backend {
        BackendKind::Cli => {
            for model in &settings.models {
                let mut backend = cli::CliTranscriber::new(&settings.cli_program, &model.path, &model.language);
                if let Some(args) = &settings.cli_args {
                    backend = backend.with_args(args.clone());
                }
                set = set.register(&model.language, Arc::new(backend));
            }
        }
        #[cfg(feature = "whisper")]
        BackendKind::Streaming => {
            for model in &settings.models {
                let backend = whisper::StreamingTranscriber::new(
                    &model.path.to_string_lossy(),
                    &model.language,
                    settings.whisper_threads,
                )?;
                set = set.register(&model.language, Arc::new(backend));
            }
        }
        #[cfg(feature = "whisper")]
        BackendKind::Whisper => {
            let backend = whisper::WhisperTranscriber::new(settings.whisper_model.clone(), settings.whisper_threads)?;
            set = set.with_fallback(Arc::new(backend));
        }
        #[cfg(not(feature = "whisper"))]
        BackendKind::Streaming | BackendKind::Whisper => {
            return Err(BackendError::model("built without the whisper feature"));
        }
    }

    if set.is_empty() {
        return Err(BackendError::model("no transcription backend configured"));
    }
    Ok(set)
}


#[cfg(test)]
mod tests {
    use super::testing::FakeTranscriber;
    use super::*;

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("EN"), "en");
        assert_eq!(normalize_language(" English "), "en");
        assert_eq!(normalize_language("Deutsch"), "de");
        assert_eq!(normalize_language("german"), "de");
        assert_eq!(normalize_language("pt"), "pt");
    }

    #[test]
    fn test_resolve_per_language() {
        let set = BackendSet::new()
            .register("de", FakeTranscriber::fixed("de-model", "de"))
            .register("EN", FakeTranscriber::fixed("en-model", "en"));

        let (backend, language) = set.resolve(Some("German")).unwrap();
        assert_eq!(backend.name(), "de-model");
        assert_eq!(language.as_deref(), Some("de"));

        let (backend, _) = set.resolve(Some("en")).unwrap();
        assert_eq!(backend.name(), "en-model");
        assert_eq!(set.languages(), vec!["de".to_string(), "en".to_string()]);
    }

    #[test]
    fn test_resolve_unsupported_language() {
        let set = BackendSet::new().register("de", FakeTranscriber::fixed("de-model", "de"));

        let err = set.resolve(Some("fr")).err().unwrap();
        assert!(matches!(err, BackendError::UnsupportedLanguage(Some(ref l)) if l == "fr"));

        let err = set.resolve(None).err().unwrap();
        assert!(matches!(err, BackendError::UnsupportedLanguage(None)));
    }

    #[test]
    fn test_resolve_fallback() {
        let set = BackendSet::new()
            .register("de", FakeTranscriber::fixed("de-model", "de"))
            .with_fallback(FakeTranscriber::auto("whisper"));

        assert_eq!(set.resolve(Some("fr")).unwrap().0.name(), "whisper");
        assert_eq!(set.resolve(None).unwrap().0.name(), "whisper");
        assert_eq!(set.resolve(Some("")).unwrap().1, None);
        assert_eq!(set.resolve(Some("de")).unwrap().0.name(), "de-model");

        let single = BackendSet::single(FakeTranscriber::auto("whisper"));
        assert!(!single.is_empty());
        assert!(BackendSet::new().is_empty());
    }

    #[test]
    fn test_build_cli_backends() {
        let vars = HashMap::from([
            ("TRANSCRIBER", "cli"),
            ("MODELS", "/models/vosk-de:Deutsch,/models/vosk-en:en"),
        ]);
        let settings = Settings::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        let set = build_backends(&settings).unwrap();
        assert_eq!(set.languages(), vec!["de".to_string(), "en".to_string()]);
        assert_eq!(set.resolve(Some("de")).unwrap().0.name(), "vosk-transcriber");
        assert!(set.resolve(None).is_err());
    }
}

use std::fmt::Display;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Generation,
    Extraction,
    Stop,
}

impl Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Generate subtitles for `source` and deliver them downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTask {
    pub source: String,
    pub language: Option<String>,
    pub stream_id: String,
}

/// Write HLS audio for `source` into the `destination` directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionTask {
    pub source: String,
    pub destination: PathBuf,
    pub stream_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Task {
    Generation(GenerationTask),
    Extraction(ExtractionTask),
    /// Poison pill: the worker that takes it leaves its loop.
    Stop,
}

impl Task {
    pub fn task_type(&self) -> TaskType {
        match self {
            Task::Generation(_) => TaskType::Generation,
            Task::Extraction(_) => TaskType::Extraction,
            Task::Stop => TaskType::Stop,
        }
    }

    pub fn stream_id(&self) -> Option<&str> {
        match self {
            Task::Generation(t) => Some(&t.stream_id),
            Task::Extraction(t) => Some(&t.stream_id),
            Task::Stop => None,
        }
    }
}

impl From<GenerationTask> for Task {
    fn from(task: GenerationTask) -> Self {
        Task::Generation(task)
    }
}

impl From<ExtractionTask> for Task {
    fn from(task: ExtractionTask) -> Self {
        Task::Extraction(task)
    }
}

/// Payload of the outbound receive call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleResult {
    pub stream_id: String,
    pub subtitles: String,
    pub language: String,
}

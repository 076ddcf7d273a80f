use std::sync::Arc;
use tracing::{info, warn, error, debug, info_span, Instrument};

use crate::asr::BackendSet;
use crate::audio::AudioExtractor;
use crate::error::BackendError;
use crate::schedule::callback::ResultSink;
use crate::schedule::queue::TaskQueue;
use crate::schedule::types::{ExtractionTask, GenerationTask, SubtitleResult, Task};

/// Everything a worker shares with its siblings. Read-only after startup.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: Arc<TaskQueue>,
    pub backends: Arc<BackendSet>,
    pub extractor: Arc<dyn AudioExtractor>,
    pub sink: Arc<dyn ResultSink>,
}

/// What a worker did before it stopped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub id: usize,
    pub delivered: usize,
    pub undelivered: usize,
    pub failed: usize,
    pub extracted: usize,
    pub stops: usize,
}

enum Outcome {
    Delivered,
    Undelivered,
    Extracted,
    Failed,
}

pub struct TaskWorker {
    // worker number inside the pool, for logs
    id: usize,
    ctx: WorkerContext,
}

impl TaskWorker {
    pub fn new(id: usize, ctx: WorkerContext) -> Self {
        Self { id, ctx }
    }

    /// Consume tasks until a stop task arrives.
    pub async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats { id: self.id, ..WorkerStats::default() };
        info!("Worker {} started", self.id);

        loop {
            debug!("worker {}: waiting for task...", self.id);
            let task = self.ctx.queue.take().await;

            let span = info_span!("task", kind = %task.task_type(), stream_id = task.stream_id().unwrap_or("-"));
            let outcome = match task {
                Task::Generation(task) => self.generate(task).instrument(span).await,
                Task::Extraction(task) => self.extract(task).instrument(span).await,
                Task::Stop => {
                    stats.stops += 1;
                    break;
                }
            };

            match outcome {
                Outcome::Delivered => stats.delivered += 1,
                Outcome::Undelivered => stats.undelivered += 1,
                Outcome::Extracted => stats.extracted += 1,
                Outcome::Failed => stats.failed += 1,
            }
        }

        info!("Worker {} stopped: {:?}", self.id, stats);
        stats
    }

    async fn generate(&self, task: GenerationTask) -> Outcome {
        info!("Generating subtitles for {}", task.source);

        let transcript = match self.transcribe(&task).await {
            Ok(transcript) => transcript,
            Err(e) => {
                error!("Failed to generate subtitles for stream {}: {}", task.stream_id, e);
                return Outcome::Failed;
            }
        };

        let result = SubtitleResult {
            stream_id: task.stream_id,
            subtitles: transcript.text,
            language: transcript.language,
        };

        match self.ctx.sink.deliver(&result).await {
            Ok(()) => Outcome::Delivered,
            Err(e) => {
                warn!("Dropping subtitles of stream {}: {}", result.stream_id, e);
                Outcome::Undelivered
            }
        }
    }

    async fn transcribe(&self, task: &GenerationTask) -> Result<crate::asr::Transcript, BackendError> {
        let (backend, language) = self.ctx.backends.resolve(task.language.as_deref())?;
        debug!("using {} backend, language {:?}", backend.name(), language);
        backend.generate(&task.source, language.as_deref()).await
    }

    async fn extract(&self, task: ExtractionTask) -> Outcome {
        info!("Extracting audio of {}", task.source);
        match self.ctx.extractor.extract(&task.source, &task.destination).await {
            Ok(()) => Outcome::Extracted,
            Err(e) => {
                error!("Failed to extract audio of {}: {}", task.source, e);
                Outcome::Failed
            }
        }
    }
}

pub mod types;
pub mod queue;
pub mod scheduler;
pub mod callback;

pub use types::{ExtractionTask, GenerationTask, SubtitleResult, Task, TaskType};
pub use queue::TaskQueue;
pub use scheduler::{JoinReport, TaskWorker, WorkerContext, WorkerPool, WorkerStats};
pub use callback::{ReceiverClient, ResultSink};

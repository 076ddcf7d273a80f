mod worker;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::sync::Mutex;
use tracing::{info, warn, error, info_span, Instrument};

pub use worker::{TaskWorker, WorkerContext, WorkerStats};
#[cfg(test)]
pub(crate) use worker::testing;
use crate::schedule::queue::TaskQueue;

/// How the workers ended up after [`WorkerPool::join`].
#[derive(Debug, Default)]
pub struct JoinReport {
    pub finished: Vec<WorkerStats>,
    pub panicked: usize,
    /// Workers still busy when the timeout elapsed. They are detached.
    pub unfinished: usize,
}

impl JoinReport {
    pub fn is_complete(&self) -> bool {
        self.unfinished == 0 && self.panicked == 0
    }
}

/// A fixed number of workers consuming one shared queue.
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    size: usize,
    workers: Mutex<Vec<JoinHandle<WorkerStats>>>,
}

impl WorkerPool {
    /// Spawn `size` workers. The size never changes afterwards.
    pub fn start(size: usize, ctx: WorkerContext) -> Self {
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let worker = TaskWorker::new(id, ctx.clone());
            workers.push(tokio::spawn(worker.run().instrument(info_span!("worker", id))));
        }
        info!("Started {} workers", size);

        Self {
            queue: ctx.queue,
            size,
            workers: Mutex::new(workers),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Ask every worker to stop once the tasks already queued are done.
    pub fn stop(&self) -> bool {
        self.queue.stop(self.size)
    }

    /// Wait for the workers to exit, giving up after `timeout`.
    pub async fn join(&self, timeout: Duration) -> JoinReport {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut report = JoinReport::default();

        let mut workers = self.workers.lock().await;
        for mut handle in workers.drain(..) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(stats)) => report.finished.push(stats),
                Ok(Err(e)) => {
                    error!("Worker terminated abnormally: {}", e);
                    report.panicked += 1;
                }
                Err(_) => report.unfinished += 1,
            }
        }

        if report.unfinished > 0 {
            warn!("{} workers did not finish within {:?}", report.unfinished, timeout);
        } else {
            info!("All {} workers joined", report.finished.len());
        }
        report
    }
}

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::schedule::types::Task;

/// Unbounded multi-producer, multi-consumer FIFO of tasks.
///
/// `put` never blocks and never rejects. `take` suspends the caller until a
/// task is available. There is no capacity limit, so a producer that outpaces
/// the workers grows the queue without bound.
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
    available: Notify,
    stopped: AtomicBool,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn put(&self, task: Task) {
        debug!("enqueue {} task", task.task_type());
        self.lock().push_back(task);
        self.available.notify_one();
    }

    pub async fn take(&self) -> Task {
        loop {
            if let Some(task) = self.lock().pop_front() {
                return task;
            }
            // notify_one leaves a permit when nobody waits, so a put between
            // the pop above and this await is not lost
            self.available.notified().await;
        }
    }

    /// Enqueue one stop task per worker. Only the first call has an effect.
    pub fn stop(&self, workers: usize) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            warn!("task queue already stopped, ignoring stop({})", workers);
            return false;
        }
        for _ in 0..workers {
            self.put(Task::Stop);
        }
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Task>> {
        // a panic while holding the lock cannot leave the deque half-updated
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

//! Cooperative task scheduler
//!
//! Side effects that may run after an operation returns (tag cleanup,
//! composing an artifact) are queued here and executed in FIFO order on the
//! caller's thread by [`Scheduler::run_pending`], which returns their
//! completions in the order the tasks finished.

use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::debug;

use crate::error::{LibraryError, Result};

type Job<M> = Box<dyn FnOnce() -> Result<M>>;

/// Messages produced by library background tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    /// Orphaned tags removed from the registry
    TagsCleaned(Vec<String>),

    /// A pipeline was composed and written
    Composed {
        pipeline: String,
        output: PathBuf,
        tokens: usize,
    },
}

/// Outcome of one task
#[derive(Debug)]
pub enum TaskCompletion<M> {
    Done(M),
    Failed(LibraryError),
}

/// Handle to a queued task
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    cancelled: Rc<Cell<bool>>,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancels the task if it has not started. A cancelled task produces no
    /// completion.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

struct Queued<M> {
    id: u64,
    label: &'static str,
    cancelled: Rc<Cell<bool>>,
    job: Job<M>,
}

pub struct Scheduler<M> {
    queue: VecDeque<Queued<M>>,
    next_id: u64,
}

impl<M> Default for Scheduler<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for Scheduler<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.queue.len())
            .finish()
    }
}

impl<M> Scheduler<M> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            next_id: 1,
        }
    }

    /// Queues a task. `label` names it in logs.
    pub fn spawn<F>(&mut self, label: &'static str, job: F) -> TaskHandle
    where
        F: FnOnce() -> Result<M> + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;

        let cancelled = Rc::new(Cell::new(false));
        self.queue.push_back(Queued {
            id,
            label,
            cancelled: Rc::clone(&cancelled),
            job: Box::new(job),
        });
        debug!(id, label, "queued task");

        TaskHandle { id, cancelled }
    }

    /// Number of queued tasks, including cancelled ones not yet discarded
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Runs every queued task in order and returns their completions
    pub fn run_pending(&mut self) -> Vec<TaskCompletion<M>> {
        let mut completions = Vec::with_capacity(self.queue.len());
        while let Some(task) = self.queue.pop_front() {
            if task.cancelled.get() {
                debug!(id = task.id, label = task.label, "skipping cancelled task");
                continue;
            }

            let completion = match (task.job)() {
                Ok(message) => TaskCompletion::Done(message),
                Err(LibraryError::Cancelled) => {
                    debug!(id = task.id, label = task.label, "task cancelled itself");
                    continue;
                }
                Err(e) => TaskCompletion::Failed(e),
            };
            debug!(id = task.id, label = task.label, "task finished");
            completions.push(completion);
        }

        completions
    }
}

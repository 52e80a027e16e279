use std::any::Any;
use std::fmt;
use std::time::Duration;

use lae_core::LaeError;
use serde::Serialize;

/// Raw unit of work executed by a worker thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fallible unit of work submitted to the pool.
pub type Task = Box<dyn FnOnce() -> lae_core::Result<()> + Send + 'static>;

/// Error type for pool and worker operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Worker {worker} already has a pending task")]
    MailboxFull { worker: usize },
    #[error("Worker {worker} is no longer running")]
    WorkerGone { worker: usize },
    #[error("Executor has been shut down")]
    ShutDown,
    #[error("Invalid pool configuration: {0}")]
    Config(String),
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl From<SchedulerError> for LaeError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::Config(msg) => LaeError::Config(msg),
            SchedulerError::ShutDown => LaeError::PoolShutDown,
            other => LaeError::Scheduler(other.to_string()),
        }
    }
}

/// How a single submitted task ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TaskOutcome {
    Completed,
    /// The task returned an error.
    Failed(String),
    /// The task panicked; the worker survived.
    Panicked(String),
    /// The task never reached a worker.
    Rejected(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Completed => write!(f, "completed"),
            TaskOutcome::Failed(msg) => write!(f, "failed: {}", msg),
            TaskOutcome::Panicked(msg) => write!(f, "panicked: {}", msg),
            TaskOutcome::Rejected(msg) => write!(f, "rejected: {}", msg),
        }
    }
}

/// A non-successful task within a batch, by submission index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskFailure {
    pub index: usize,
    pub outcome: TaskOutcome,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {} {}", self.index, self.outcome)
    }
}

/// Result of one `submit_all` barrier.
///
/// Failed tasks still count toward barrier completion; the report is how
/// callers find out about them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Tasks handed to `submit_all`.
    pub submitted: usize,
    /// Tasks that ran to completion without error.
    pub completed: usize,
    /// Everything else, ordered by submission index.
    pub failures: Vec<TaskFailure>,
    /// Wall time from first submission to barrier release.
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn any failure into a `TaskFailed` error.
    pub fn into_result(self) -> lae_core::Result<Self> {
        match self.failures.first() {
            None => Ok(self),
            Some(first) => Err(LaeError::TaskFailed {
                submitted: self.submitted,
                failed: self.failures.len(),
                first: first.to_string(),
            }),
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

//! Fatigue-weighted worker pool.
//!
//! Every [`TiredWorker`] accumulates busy time scaled by a fixed, randomly
//! drawn fatigue factor. The [`TiredExecutor`] always hands the next task to
//! the idle worker with the lowest fatigue, so slow or overworked workers
//! drift to the back of the line without any queue-length bookkeeping.
//!
//! - `worker`: the dedicated thread with its single-slot mailbox
//! - `idle`: the blocking min-fatigue queue of idle workers
//! - `executor`: submission, the in-flight barrier, and shutdown
//! - `report`: diagnostic snapshot of per-worker counters
//! - `types`: task aliases, per-task outcomes, batch reports, errors

pub mod executor;
mod idle;
pub mod report;
pub mod types;
pub mod worker;

pub use executor::TiredExecutor;
pub use report::{WorkerReport, WorkerStats};
pub use types::{BatchReport, Job, SchedulerError, Task, TaskFailure, TaskOutcome};
pub use worker::TiredWorker;

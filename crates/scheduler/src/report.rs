use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::worker::TiredWorker;

/// Counters of one worker at report time.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStats {
    pub id: usize,
    pub fatigue_factor: f64,
    pub fatigue: f64,
    /// Cumulative busy time in nanoseconds.
    pub time_used_ns: u64,
    /// Cumulative time spent waiting for work, in nanoseconds.
    pub time_idle_ns: u64,
    /// Whether the worker sat in the idle queue when the report was taken.
    pub idle: bool,
}

impl WorkerStats {
    pub(crate) fn capture(worker: &TiredWorker, idle: bool) -> Self {
        let time_used = worker.time_used();
        Self {
            id: worker.id(),
            fatigue_factor: worker.fatigue_factor(),
            fatigue: time_used.as_nanos() as f64 * worker.fatigue_factor(),
            time_used_ns: time_used.as_nanos() as u64,
            time_idle_ns: worker.time_idle().as_nanos() as u64,
            idle,
        }
    }
}

/// Diagnostic snapshot of the whole pool. Has no effect on scheduling.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub generated_at: DateTime<Utc>,
    pub workers: Vec<WorkerStats>,
}

impl WorkerReport {
    pub fn total_time_used_ns(&self) -> u64 {
        self.workers.iter().map(|w| w.time_used_ns).sum()
    }

    /// The worker with the most accumulated busy time.
    pub fn busiest(&self) -> Option<&WorkerStats> {
        self.workers.iter().max_by_key(|w| w.time_used_ns)
    }
}

impl fmt::Display for WorkerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Worker Report:")?;
        for w in &self.workers {
            writeln!(
                f,
                "Worker {}: Fatigue={:.2}, TimeUsed={}, TimeIdle={}",
                w.id, w.fatigue, w.time_used_ns, w.time_idle_ns
            )?;
        }
        Ok(())
    }
}

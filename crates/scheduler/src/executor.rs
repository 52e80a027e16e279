use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use lae_core::PoolConfig;
use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::idle::IdleQueue;
use crate::report::{WorkerReport, WorkerStats};
use crate::types::{panic_message, BatchReport, Job, SchedulerError, Task, TaskFailure, TaskOutcome};
use crate::worker::TiredWorker;

/// Count of submitted-but-unfinished tasks, doubling as the batch barrier.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    lock: Mutex<()>,
    drained: Condvar,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Taking the lock orders this wake-up after any waiter's check.
            let _guard = self.lock.lock();
            self.drained.notify_all();
        }
    }

    fn wait(&self) {
        let mut guard = self.lock.lock();
        while self.count.load(Ordering::Acquire) > 0 {
            self.drained.wait(&mut guard);
        }
    }

    fn get(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

/// Outcomes gathered from the tasks of one `submit_all` call.
#[derive(Default)]
struct BatchCollector {
    completed: AtomicUsize,
    failures: Mutex<Vec<TaskFailure>>,
}

impl BatchCollector {
    fn record(&self, index: usize, outcome: TaskOutcome) {
        if outcome.is_success() {
            self.completed.fetch_add(1, Ordering::AcqRel);
        } else {
            self.failures.lock().push(TaskFailure { index, outcome });
        }
    }
}

/// Fixed pool of [`TiredWorker`]s scheduled least-fatigued first.
pub struct TiredExecutor {
    workers: Vec<Arc<TiredWorker>>,
    idle: Arc<IdleQueue>,
    in_flight: Arc<InFlight>,
    shut_down: AtomicBool,
}

impl TiredExecutor {
    /// Start `num_threads` workers with factors drawn from the default range.
    pub fn new(num_threads: usize) -> Result<Self, SchedulerError> {
        Self::from_config(&PoolConfig::with_threads(num_threads))
    }

    /// Start a pool sized and seeded from config. Zero threads means
    /// available parallelism.
    pub fn from_config(config: &PoolConfig) -> Result<Self, SchedulerError> {
        config
            .validate()
            .map_err(|e| SchedulerError::Config(e.to_string()))?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let factors = (0..config.resolved_worker_threads())
            .map(|_| rng.gen_range(config.fatigue_min..config.fatigue_max))
            .collect();
        Self::with_factors(factors)
    }

    /// Start one worker per explicit fatigue factor.
    pub fn with_factors(factors: Vec<f64>) -> Result<Self, SchedulerError> {
        if factors.is_empty() {
            return Err(SchedulerError::Config("pool needs at least one worker".into()));
        }
        if let Some(bad) = factors.iter().find(|f| !f.is_finite() || **f <= 0.0) {
            return Err(SchedulerError::Config(format!(
                "fatigue factor must be positive and finite, got {}",
                bad
            )));
        }

        let idle = Arc::new(IdleQueue::new());
        let mut workers: Vec<Arc<TiredWorker>> = Vec::with_capacity(factors.len());
        for (id, factor) in factors.into_iter().enumerate() {
            let worker = Arc::new(TiredWorker::new(id, factor));
            if let Err(e) = worker.start() {
                for started in &workers {
                    started.shutdown();
                    started.join();
                }
                return Err(e);
            }
            idle.push(Arc::clone(&worker));
            workers.push(worker);
        }

        info!(
            "Executor started with {} workers (factors: {})",
            workers.len(),
            workers
                .iter()
                .map(|w| format!("{:.2}", w.fatigue_factor()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            workers,
            idle,
            in_flight: Arc::new(InFlight::default()),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Run `task` on the least-fatigued idle worker, waiting for one if all
    /// are busy. Task failures are logged, never returned.
    pub fn submit(&self, task: Task) -> Result<(), SchedulerError> {
        self.dispatch(task, |worker, outcome| {
            if !outcome.is_success() {
                warn!(worker = worker, "task {}", outcome);
            }
        })
    }

    fn dispatch<F>(&self, task: Task, record: F) -> Result<(), SchedulerError>
    where
        F: FnOnce(usize, TaskOutcome) + Send + 'static,
    {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(SchedulerError::ShutDown);
        }

        // Count first so a concurrent barrier never sees a false zero.
        self.in_flight.begin();
        let worker = self.idle.take();
        let worker_id = worker.id();

        let job: Job = Box::new(move || record(worker_id, run_task(task)));
        let on_complete: Job = {
            let idle = Arc::clone(&self.idle);
            let in_flight = Arc::clone(&self.in_flight);
            let worker = Arc::clone(&worker);
            Box::new(move || {
                idle.push(worker);
                in_flight.finish();
            })
        };

        if let Err(e) = worker.assign(job, on_complete) {
            // The worker is not returned to the idle queue: a full mailbox
            // means it is already owned by another task, a gone worker is dead.
            self.in_flight.finish();
            warn!(worker = worker_id, "submission rejected: {}", e);
            return Err(e);
        }
        debug!(worker = worker_id, "task assigned");
        Ok(())
    }

    /// Submit every task, then block until nothing is in flight.
    ///
    /// Every task counts toward the barrier whether it succeeds, fails or
    /// panics; the returned report says which.
    pub fn submit_all<I>(&self, tasks: I) -> BatchReport
    where
        I: IntoIterator<Item = Task>,
    {
        let started = Instant::now();
        let collector = Arc::new(BatchCollector::default());
        let mut submitted = 0;
        let mut rejected = Vec::new();

        for (index, task) in tasks.into_iter().enumerate() {
            submitted += 1;
            let sink = Arc::clone(&collector);
            let result = self.dispatch(task, move |worker, outcome| {
                if !outcome.is_success() {
                    warn!(worker = worker, "batch task {} {}", index, outcome);
                }
                sink.record(index, outcome);
            });
            if let Err(e) = result {
                rejected.push(TaskFailure {
                    index,
                    outcome: TaskOutcome::Rejected(e.to_string()),
                });
            }
        }

        if submitted > 0 {
            self.in_flight.wait();
        }

        let mut failures = std::mem::take(&mut *collector.failures.lock());
        failures.extend(rejected);
        failures.sort_by_key(|f| f.index);

        let report = BatchReport {
            submitted,
            completed: collector.completed.load(Ordering::Acquire),
            failures,
            elapsed: started.elapsed(),
        };
        debug!(
            "Batch of {} finished in {:?} ({} failed)",
            report.submitted,
            report.elapsed,
            report.failures.len()
        );
        report
    }

    /// Stop every worker and wait for each to exit. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Executor shutdown requested");
        for worker in &self.workers {
            worker.shutdown();
        }
        for worker in &self.workers {
            worker.join();
        }
        info!("Executor stopped");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Consistent per-worker counters, taken with the idle queue locked.
    pub fn worker_report(&self) -> WorkerReport {
        let workers = self.idle.inspect(|idle_ids| {
            self.workers
                .iter()
                .map(|w| WorkerStats::capture(w, idle_ids.contains(&w.id())))
                .collect()
        });
        WorkerReport {
            generated_at: Utc::now(),
            workers,
        }
    }

    pub fn workers(&self) -> &[Arc<TiredWorker>] {
        &self.workers
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Tasks submitted but not yet finished, across all callers.
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }
}

impl Drop for TiredExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_task(task: Task) -> TaskOutcome {
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(())) => TaskOutcome::Completed,
        Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
        Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lae_core::LaeError;
    use std::thread;
    use std::time::Duration;

    fn counting_tasks(n: usize, counter: &Arc<AtomicUsize>) -> Vec<Task> {
        (0..n)
            .map(|_| {
                let counter = Arc::clone(counter);
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }) as Task
            })
            .collect()
    }

    #[test]
    fn rejects_empty_pool_and_bad_factors() {
        // Zero threads resolves to available parallelism.
        assert!(TiredExecutor::new(0).unwrap().num_workers() > 0);
        assert!(matches!(
            TiredExecutor::with_factors(vec![]),
            Err(SchedulerError::Config(_))
        ));
        assert!(matches!(
            TiredExecutor::with_factors(vec![1.0, -0.5]),
            Err(SchedulerError::Config(_))
        ));
    }

    #[test]
    fn seeded_factors_are_reproducible_and_in_range() {
        let config = PoolConfig {
            worker_threads: 4,
            seed: Some(7),
            ..PoolConfig::default()
        };
        let a = TiredExecutor::from_config(&config).unwrap();
        let b = TiredExecutor::from_config(&config).unwrap();
        let fa: Vec<f64> = a.workers().iter().map(|w| w.fatigue_factor()).collect();
        let fb: Vec<f64> = b.workers().iter().map(|w| w.fatigue_factor()).collect();
        assert_eq!(fa, fb);
        assert!(fa.iter().all(|f| (0.5..1.5).contains(f)));
    }

    #[test]
    fn report_lists_every_worker() {
        let executor = TiredExecutor::new(3).unwrap();
        let report = executor.worker_report();
        assert_eq!(report.workers.len(), 3);
        assert!(report.workers.iter().all(|w| w.idle));

        let text = report.to_string();
        assert!(text.contains("Worker Report"));
        for i in 0..3 {
            assert!(text.contains(&format!("Worker {}", i)));
        }
    }

    #[test]
    fn submit_all_waits_for_every_task() {
        let executor = TiredExecutor::new(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<Task> = (0..20)
            .map(|_| {
                let counter = Arc::clone(&counter);
                Box::new(move || {
                    thread::sleep(Duration::from_millis(10));
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }) as Task
            })
            .collect();

        let report = executor.submit_all(tasks);
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        assert_eq!(report.submitted, 20);
        assert_eq!(report.completed, 20);
        assert!(report.is_clean());
        assert_eq!(executor.in_flight(), 0);
    }

    #[test]
    fn empty_batch_returns_immediately() {
        let executor = TiredExecutor::new(2).unwrap();
        let report = executor.submit_all(Vec::new());
        assert_eq!(report.submitted, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn failing_and_panicking_tasks_still_release_barrier() {
        let executor = TiredExecutor::new(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tasks = counting_tasks(1, &counter);
        tasks.push(Box::new(|| Err(LaeError::Other("Boom!".into()))));
        tasks.push(Box::new(|| panic!("kaboom")));
        tasks.extend(counting_tasks(1, &counter));

        let report = executor.submit_all(tasks);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(report.completed, 2);
        assert_eq!(
            report.failures,
            vec![
                TaskFailure {
                    index: 1,
                    outcome: TaskOutcome::Failed("Boom!".into())
                },
                TaskFailure {
                    index: 2,
                    outcome: TaskOutcome::Panicked("kaboom".into())
                },
            ]
        );

        // Workers are all back and usable.
        let again = executor.submit_all(counting_tasks(10, &counter));
        assert!(again.is_clean());
        assert_eq!(counter.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn large_batch_recycles_workers() {
        let executor = TiredExecutor::new(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let report = executor.submit_all(counting_tasks(50, &counter));
        assert_eq!(counter.load(Ordering::SeqCst), 50);
        assert_eq!(report.completed, 50);
    }

    #[test]
    fn submit_after_shutdown_fails() {
        let executor = TiredExecutor::new(2).unwrap();
        executor.shutdown();
        executor.shutdown();
        assert!(executor.is_shut_down());
        assert!(executor.workers().iter().all(|w| !w.is_alive()));
        assert!(matches!(
            executor.submit(Box::new(|| Ok(()))),
            Err(SchedulerError::ShutDown)
        ));

        let report = executor.submit_all(vec![Box::new(|| Ok(())) as Task]);
        assert_eq!(report.submitted, 1);
        assert!(matches!(
            report.failures[0].outcome,
            TaskOutcome::Rejected(_)
        ));
        assert_eq!(executor.in_flight(), 0);
    }
}

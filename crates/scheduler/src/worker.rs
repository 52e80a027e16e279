use std::cmp::Ordering as CmpOrdering;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::types::{panic_message, Job, SchedulerError};

enum Message {
    Work { job: Job, on_complete: Option<Job> },
    Shutdown,
}

/// A dedicated worker thread with a single-slot mailbox.
///
/// Fatigue is cumulative busy time (in nanoseconds) scaled by the worker's
/// fixed fatigue factor. Idle time is time spent blocked on the mailbox.
pub struct TiredWorker {
    id: usize,
    fatigue_factor: f64,
    time_used_ns: AtomicU64,
    time_idle_ns: AtomicU64,
    busy: AtomicBool,
    shutdown_requested: AtomicBool,
    mailbox: SyncSender<Message>,
    inbox: Mutex<Option<Receiver<Message>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TiredWorker {
    /// Create a worker. No thread runs until [`start`](Self::start).
    pub fn new(id: usize, fatigue_factor: f64) -> Self {
        let (mailbox, inbox) = mpsc::sync_channel(1);
        Self {
            id,
            fatigue_factor,
            time_used_ns: AtomicU64::new(0),
            time_idle_ns: AtomicU64::new(0),
            busy: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
            mailbox,
            inbox: Mutex::new(Some(inbox)),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the worker thread. Calling it again is a no-op.
    pub fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let Some(inbox) = self.inbox.lock().take() else {
            return Ok(());
        };
        let worker = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(format!("tired-worker-{}", self.id))
            .spawn(move || worker.run(inbox))?;
        *self.handle.lock() = Some(handle);
        Ok(())
    }

    fn run(&self, inbox: Receiver<Message>) {
        debug!(worker = self.id, "worker started");
        loop {
            let waiting = Instant::now();
            let message = inbox.recv();
            self.time_idle_ns
                .fetch_add(nanos(waiting.elapsed()), Ordering::Relaxed);

            match message {
                Ok(Message::Work { job, on_complete }) => {
                    self.execute(job, on_complete);
                    if self.shutdown_requested.load(Ordering::Acquire) {
                        self.drain(&inbox);
                        break;
                    }
                }
                Ok(Message::Shutdown) | Err(_) => break,
            }
        }
        debug!(worker = self.id, "worker stopped");
    }

    fn execute(&self, job: Job, on_complete: Option<Job>) {
        self.busy.store(true, Ordering::Release);
        let started = Instant::now();
        if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
            warn!(
                worker = self.id,
                "task panicked: {}",
                panic_message(payload.as_ref())
            );
        }
        self.time_used_ns
            .fetch_add(nanos(started.elapsed()), Ordering::AcqRel);
        self.busy.store(false, Ordering::Release);

        // Runs after the counters are updated so the pool re-ranks
        // this worker by its new fatigue.
        if let Some(done) = on_complete {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(done)) {
                error!(
                    worker = self.id,
                    "completion hook panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    /// Run work that was accepted before shutdown, up to the sentinel or an
    /// empty mailbox. A shutdown requested while the mailbox was full never
    /// queued its sentinel, so the flag is what ends the loop.
    fn drain(&self, inbox: &Receiver<Message>) {
        while let Ok(Message::Work { job, on_complete }) = inbox.try_recv() {
            debug!(worker = self.id, "running task accepted before shutdown");
            self.execute(job, on_complete);
        }
    }

    /// Hand the worker a job. Fails immediately if one is already pending.
    pub fn new_task(&self, job: Job) -> Result<(), SchedulerError> {
        self.send(Message::Work {
            job,
            on_complete: None,
        })
    }

    /// Like [`new_task`](Self::new_task), with a hook that runs after the
    /// worker has recorded the job's busy time.
    pub(crate) fn assign(&self, job: Job, on_complete: Job) -> Result<(), SchedulerError> {
        self.send(Message::Work {
            job,
            on_complete: Some(on_complete),
        })
    }

    fn send(&self, message: Message) -> Result<(), SchedulerError> {
        self.mailbox.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SchedulerError::MailboxFull { worker: self.id },
            TrySendError::Disconnected(_) => SchedulerError::WorkerGone { worker: self.id },
        })
    }

    /// Ask the worker to exit. Never blocks; a task that is already pending
    /// or running finishes first, hook included.
    pub fn shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
        // A full mailbox means a task is pending; the flag stops the loop after it.
        let _ = self.mailbox.try_send(Message::Shutdown);
    }

    /// Wait for the worker thread to exit.
    pub fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!(worker = self.id, "worker thread panicked");
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn fatigue_factor(&self) -> f64 {
        self.fatigue_factor
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn time_used(&self) -> Duration {
        Duration::from_nanos(self.time_used_ns.load(Ordering::Acquire))
    }

    pub fn time_idle(&self) -> Duration {
        Duration::from_nanos(self.time_idle_ns.load(Ordering::Relaxed))
    }

    pub fn fatigue(&self) -> f64 {
        self.time_used_ns.load(Ordering::Acquire) as f64 * self.fatigue_factor
    }

    /// Total order by fatigue, ties broken by id.
    pub fn compare_fatigue(&self, other: &TiredWorker) -> CmpOrdering {
        self.fatigue()
            .total_cmp(&other.fatigue())
            .then(self.id.cmp(&other.id))
    }
}

impl std::fmt::Debug for TiredWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiredWorker")
            .field("id", &self.id)
            .field("fatigue_factor", &self.fatigue_factor)
            .field("fatigue", &self.fatigue())
            .field("busy", &self.is_busy())
            .finish()
    }
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

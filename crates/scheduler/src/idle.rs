use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::worker::TiredWorker;

/// Heap entry keyed by the fatigue the worker had when it went idle.
///
/// An idle worker's fatigue cannot change, so the key stays valid for as
/// long as the entry sits in the heap.
struct IdleEntry {
    fatigue: f64,
    worker: Arc<TiredWorker>,
}

impl IdleEntry {
    fn key(&self) -> (f64, usize) {
        (self.fatigue, self.worker.id())
    }
}

impl PartialEq for IdleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IdleEntry {}

impl PartialOrd for IdleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdleEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        let (fa, ia) = self.key();
        let (fb, ib) = other.key();
        fa.total_cmp(&fb).then(ia.cmp(&ib))
    }
}

/// Blocking min-fatigue queue of idle workers.
#[derive(Default)]
pub(crate) struct IdleQueue {
    heap: Mutex<BinaryHeap<Reverse<IdleEntry>>>,
    available: Condvar,
}

impl IdleQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a worker ranked by its current fatigue. Never blocks on capacity.
    pub(crate) fn push(&self, worker: Arc<TiredWorker>) {
        let entry = IdleEntry {
            fatigue: worker.fatigue(),
            worker,
        };
        self.heap.lock().push(Reverse(entry));
        self.available.notify_one();
    }

    /// Remove the least-fatigued worker, waiting until one is idle.
    pub(crate) fn take(&self) -> Arc<TiredWorker> {
        let mut heap = self.heap.lock();
        loop {
            if let Some(Reverse(entry)) = heap.pop() {
                return entry.worker;
            }
            self.available.wait(&mut heap);
        }
    }

    /// Run `f` on the ids of idle workers while the queue is locked.
    pub(crate) fn inspect<R>(&self, f: impl FnOnce(&[usize]) -> R) -> R {
        let heap = self.heap.lock();
        let ids: Vec<usize> = heap.iter().map(|Reverse(e)| e.worker.id()).collect();
        f(&ids)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.heap.lock().len()
    }
}

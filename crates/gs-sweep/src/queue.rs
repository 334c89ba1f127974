//! The two channels shared between the submitting thread and the workers.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

use crate::partition::TaskBatch;
use crate::worker::ResultBatch;

#[derive(Debug, Default)]
struct Pending {
    count: Mutex<usize>,
    drained: Condvar,
}

/// Multi-producer, multi-consumer batch queue with a drain barrier.
///
/// Every batch put on the queue counts as pending until a consumer calls
/// [`TaskQueue::task_done`] for it; [`TaskQueue::join`] blocks until that
/// count returns to zero. Clones share the same channel and counter.
#[derive(Debug)]
pub struct TaskQueue<V> {
    sender: Sender<TaskBatch<V>>,
    receiver: Receiver<TaskBatch<V>>,
    pending: Arc<Pending>,
}

impl<V> Clone for TaskQueue<V> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<V> TaskQueue<V> {
    /// `capacity` of `None` gives an unbounded queue; the producer is then
    /// responsible for not outrunning the workers.
    pub fn new(capacity: Option<usize>) -> Self {
        let (sender, receiver) = match capacity {
            Some(cap) => crossbeam_channel::bounded(cap),
            None => crossbeam_channel::unbounded(),
        };
        Self {
            sender,
            receiver,
            pending: Arc::new(Pending::default()),
        }
    }

    /// Enqueue a batch, blocking while a bounded queue is full.
    ///
    /// Never fails: every handle owns a receiver, so the channel cannot be
    /// disconnected while `self` is alive.
    pub fn put(&self, batch: TaskBatch<V>) {
        *self.pending.count.lock() += 1;
        let _ = self.sender.send(batch);
    }

    pub fn get_timeout(&self, timeout: Duration) -> Result<TaskBatch<V>, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Acknowledge one previously fetched batch as fully processed.
    pub fn task_done(&self) {
        let mut count = self.pending.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.pending.drained.notify_all();
        }
    }

    /// Block until every enqueued batch has been acknowledged.
    pub fn join(&self) {
        let mut count = self.pending.count.lock();
        while *count > 0 {
            self.pending.drained.wait(&mut count);
        }
    }

    /// Like [`TaskQueue::join`] but gives up after `timeout`. Returns whether
    /// the queue drained.
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.pending.count.lock();
        while *count > 0 {
            if self.pending.drained.wait_for(&mut count, timeout).timed_out() {
                return *count == 0;
            }
        }
        true
    }

    /// Batches enqueued but not yet acknowledged.
    pub fn pending(&self) -> usize {
        *self.pending.count.lock()
    }

    /// Batches waiting to be fetched.
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }
}

pub type ResultSender<V> = Sender<ResultBatch<V>>;
pub type ResultReceiver<V> = Receiver<ResultBatch<V>>;

/// Unbounded channel carrying reduced per-batch results to the aggregator.
///
/// The receiver reports disconnection once every worker holding a sender has
/// exited, which the aggregator uses to stop waiting for results that can
/// no longer arrive.
pub fn result_queue<V>() -> (ResultSender<V>, ResultReceiver<V>) {
    crossbeam_channel::unbounded()
}

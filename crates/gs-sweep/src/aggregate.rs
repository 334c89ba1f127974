//! Global merge of per-batch results into the final ranking.

use gs_types::{GsError, GsResult, ScoreResult, SweepSettings};
use tracing::debug;

use crate::queue::{ResultReceiver, TaskQueue};
use crate::reduce::sort_and_reduce;
use crate::worker::ResultBatch;

/// The merged outcome of every batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate<V> {
    /// Global top-N, ascending by error.
    pub results: Vec<ScoreResult<V>>,
    pub batches: usize,
    pub scored: usize,
    pub skipped: usize,
}

/// Owns the global accumulator. Only the submitting thread touches it.
#[derive(Debug)]
pub struct Aggregator<V> {
    accumulator: Vec<ScoreResult<V>>,
    top_n: usize,
    order_every_n: usize,
    batches: usize,
    scored: usize,
    skipped: usize,
}

impl<V> Aggregator<V> {
    pub fn new(settings: &SweepSettings) -> Self {
        Self {
            accumulator: Vec::new(),
            top_n: settings.top_n,
            order_every_n: settings.order_every_n,
            batches: 0,
            scored: 0,
            skipped: 0,
        }
    }

    /// Append one batch's results, re-bounding once the accumulator grows
    /// past `order_every_n`.
    pub fn absorb(&mut self, batch: ResultBatch<V>) {
        self.batches += 1;
        self.scored += batch.scored;
        self.skipped += batch.skipped;
        self.accumulator.extend(batch.results);
        if self.accumulator.len() > self.order_every_n {
            sort_and_reduce(&mut self.accumulator, self.top_n);
        }
    }

    /// Pull exactly `task_count` result batches, then wait for the task queue
    /// to drain. `on_batch` is called with `(received, task_count)` before
    /// the first pull and after each one.
    ///
    /// Fails with [`GsError::WorkersExhausted`] if every worker has gone away
    /// before all batches arrived.
    pub fn collect(
        mut self,
        results: &ResultReceiver<V>,
        task_count: usize,
        tasks: &TaskQueue<V>,
        mut on_batch: impl FnMut(usize, usize),
    ) -> GsResult<Aggregate<V>> {
        on_batch(0, task_count);
        for received in 0..task_count {
            let batch = results.recv().map_err(|_| GsError::WorkersExhausted {
                received,
                expected: task_count,
            })?;
            debug!(task_id = batch.task_id, "aggregating batch");
            self.absorb(batch);
            on_batch(received + 1, task_count);
        }

        let aggregate = self.finish();
        tasks.join();
        Ok(aggregate)
    }

    /// Final reduction of whatever has been absorbed so far.
    pub fn finish(mut self) -> Aggregate<V> {
        sort_and_reduce(&mut self.accumulator, self.top_n);
        Aggregate {
            results: self.accumulator,
            batches: self.batches,
            scored: self.scored,
            skipped: self.skipped,
        }
    }
}

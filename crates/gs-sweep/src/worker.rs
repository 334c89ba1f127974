//! Worker loop: fetch a batch, score it, publish its reduced results.

use crossbeam_channel::RecvTimeoutError;
use gs_types::{
    worker_reduce_threshold, ParamCombination, ScoreError, ScoreResult, Scorer, WorkerError,
};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::partition::TaskBatch;
use crate::queue::{ResultSender, TaskQueue};
use crate::reduce::TopN;

/// One batch's best results, sorted ascending by error.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBatch<V> {
    pub task_id: usize,
    pub results: Vec<ScoreResult<V>>,
    /// Combinations scored successfully.
    pub scored: usize,
    /// Combinations dropped because the scorer failed on them.
    pub skipped: usize,
}

/// What a worker did before it ran out of work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub batches: usize,
    pub combinations: usize,
    pub skipped: usize,
}

pub struct Worker<V, T, S: ?Sized> {
    id: usize,
    tasks: TaskQueue<V>,
    results: ResultSender<V>,
    dataset: Dataset<T>,
    scorer: Arc<S>,
    fetch_timeout: Duration,
}

impl<V, T, S> Worker<V, T, S>
where
    V: Clone + Send + 'static,
    T: Send + Sync + 'static,
    S: Scorer<V, T> + ?Sized + 'static,
{
    pub fn new(
        id: usize,
        tasks: TaskQueue<V>,
        results: ResultSender<V>,
        dataset: Dataset<T>,
        scorer: Arc<S>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            id,
            tasks,
            results,
            dataset,
            scorer,
            fetch_timeout,
        }
    }

    /// Run the worker on its own named OS thread.
    pub fn spawn(self) -> io::Result<JoinHandle<WorkerStats>> {
        thread::Builder::new()
            .name(format!("gs-worker-{}", self.id))
            .spawn(move || self.run())
    }

    /// Process batches until two consecutive fetches time out.
    pub fn run(self) -> WorkerStats {
        let mut stats = WorkerStats {
            worker_id: self.id,
            ..WorkerStats::default()
        };
        let mut grace = true;

        loop {
            let batch = match self.fetch() {
                Ok(batch) => {
                    grace = true;
                    batch
                }
                Err(err @ WorkerError::Timeout { .. }) if grace => {
                    debug!("{err}, retrying once");
                    grace = false;
                    continue;
                }
                Err(_) => {
                    let done = WorkerError::Exhausted {
                        worker_id: self.id,
                        batches: stats.batches,
                    };
                    debug!("{done}, exiting");
                    break;
                }
            };

            let task_id = batch.id;
            let reduced = score_batch(batch, &self.dataset, &*self.scorer);
            stats.batches += 1;
            stats.combinations += reduced.scored + reduced.skipped;
            stats.skipped += reduced.skipped;

            let published = self.results.send(reduced).is_ok();
            self.tasks.task_done();
            if !published {
                warn!(worker = self.id, task_id, "result queue closed, stopping worker");
                break;
            }
        }

        stats
    }

    fn fetch(&self) -> Result<TaskBatch<V>, WorkerError> {
        match self.tasks.get_timeout(self.fetch_timeout) {
            Ok(batch) => Ok(batch),
            Err(RecvTimeoutError::Timeout) => Err(WorkerError::Timeout {
                worker_id: self.id,
                timeout_ms: self.fetch_timeout.as_millis(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Exhausted {
                worker_id: self.id,
                batches: 0,
            }),
        }
    }
}

/// Score every combination of `batch`, keeping only the batch's `top_n`
/// best. The running list is re-bounded whenever it reaches
/// `max(top_n * 5, order_every_n)` entries.
///
/// A combination whose scorer errs, panics or predicts a non-finite value
/// is skipped and counted. Panics still reach the installed panic hook.
pub fn score_batch<V, T, S>(batch: TaskBatch<V>, dataset: &Dataset<T>, scorer: &S) -> ResultBatch<V>
where
    S: Scorer<V, T> + ?Sized,
{
    let threshold = worker_reduce_threshold(batch.top_n, batch.order_every_n);
    let mut top = TopN::new(batch.top_n, threshold);
    let mut scored = 0;
    let mut skipped = 0;
    let mut first_failure = None;

    for params in batch.combinations {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            combination_error(&params, dataset, scorer)
        }))
        .unwrap_or_else(|payload| {
            Err(ScoreError::Panicked {
                message: panic_message(payload.as_ref()),
            })
        });

        match outcome {
            Ok(error) => {
                scored += 1;
                top.push(ScoreResult::new(error, params));
            }
            Err(err) => {
                skipped += 1;
                debug!(task_id = batch.id, %err, "skipping combination");
                first_failure.get_or_insert(err);
            }
        }
    }

    if let Some(err) = first_failure {
        warn!(
            task_id = batch.id,
            skipped,
            "scorer failed on {skipped} combination(s), first failure: {err}"
        );
    }

    ResultBatch {
        task_id: batch.id,
        results: top.into_sorted(),
        scored,
        skipped,
    }
}

/// `Σ |score(params, t) − target(t)| / Σ target(t)` over the whole dataset.
pub fn combination_error<V, T, S>(
    params: &ParamCombination<V>,
    dataset: &Dataset<T>,
    scorer: &S,
) -> Result<f64, ScoreError>
where
    S: Scorer<V, T> + ?Sized,
{
    let mut diff = 0.0;
    for (point, target) in dataset.points().iter().zip(dataset.targets()) {
        let prediction = scorer.score(params, point)?;
        if !prediction.is_finite() {
            return Err(ScoreError::NonFinite { value: prediction });
        }
        diff += (prediction - target).abs();
    }
    Ok(diff / dataset.target_total())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::result_queue;
    use gs_types::DataPoint;
    use std::time::Instant;

    type Linear = fn(&ParamCombination<i64>, &DataPoint<i64>) -> f64;

    fn linear(p: &ParamCombination<i64>, t: &DataPoint<i64>) -> f64 {
        (p[0] * t[0] + p[1] * t[1]) as f64
    }

    fn dataset() -> Dataset<i64> {
        Dataset::new(vec![DataPoint::new(vec![1, 1, 5])]).unwrap()
    }

    fn batch(id: usize, combos: Vec<Vec<i64>>, top_n: usize, order_every_n: usize) -> TaskBatch<i64> {
        TaskBatch {
            id,
            combinations: combos.into_iter().map(ParamCombination::new).collect(),
            top_n,
            order_every_n,
        }
    }

    struct RejectNegative;

    impl Scorer<i64, i64> for RejectNegative {
        fn score(&self, p: &ParamCombination<i64>, t: &DataPoint<i64>) -> Result<f64, ScoreError> {
            if p[0] < 0 {
                return Err(ScoreError::rejected("negative weight"));
            }
            Ok(linear(p, t))
        }
    }

    #[test]
    fn error_is_normalised_absolute_difference() {
        let data = dataset();
        let f: Linear = linear;
        let err = combination_error(&ParamCombination::new(vec![1, 1]), &data, &f).unwrap();
        assert!((err - 0.6).abs() < 1e-12);
        let err = combination_error(&ParamCombination::new(vec![0, 0]), &data, &f).unwrap();
        assert!((err - 1.0).abs() < 1e-12);
    }

    #[test]
    fn batch_results_are_sorted_and_bounded() {
        let combos: Vec<Vec<i64>> = (0..6).flat_map(|a| (0..6).map(move |b| vec![a, b])).collect();
        let f: Linear = linear;
        let reduced = score_batch(batch(4, combos, 3, 2), &dataset(), &f);

        assert_eq!(reduced.task_id, 4);
        assert_eq!(reduced.scored, 36);
        assert_eq!(reduced.skipped, 0);
        assert_eq!(reduced.results.len(), 3);
        assert!(reduced.results.windows(2).all(|w| w[0].error <= w[1].error));
        // a + b == 5 is an exact fit.
        assert_eq!(reduced.results[0].error, 0.0);
        assert_eq!(reduced.results[0].params[0] + reduced.results[0].params[1], 5);
    }

    #[test]
    fn small_batch_keeps_everything() {
        let f: Linear = linear;
        let reduced = score_batch(batch(0, vec![vec![0, 0], vec![1, 1]], 10, 3), &dataset(), &f);
        assert_eq!(reduced.results.len(), 2);
        assert_eq!(reduced.results[0].params.values(), &[1, 1]);
    }

    #[test]
    fn scorer_errors_skip_only_the_offending_combination() {
        let combos = vec![vec![-1, 0], vec![1, 1], vec![-3, 3], vec![0, 0]];
        let reduced = score_batch(batch(0, combos, 5, 1), &dataset(), &RejectNegative);
        assert_eq!(reduced.scored, 2);
        assert_eq!(reduced.skipped, 2);
        assert_eq!(reduced.results.len(), 2);
        assert!(reduced.results.iter().all(|r| r.params[0] >= 0));
    }

    #[test]
    fn scorer_panics_and_non_finite_predictions_are_skipped() {
        let scorer = |p: &ParamCombination<i64>, t: &DataPoint<i64>| {
            if p[0] == 7 {
                panic!("boom");
            }
            if p[0] == 8 {
                return f64::NAN;
            }
            linear(p, t)
        };
        let combos = vec![vec![7, 0], vec![8, 0], vec![1, 1]];
        let reduced = score_batch(batch(0, combos, 5, 1), &dataset(), &scorer);
        assert_eq!(reduced.skipped, 2);
        assert_eq!(reduced.results.len(), 1);
        assert_eq!(reduced.results[0].params.values(), &[1, 1]);
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    fn spawn_worker(
        tasks: &TaskQueue<i64>,
        timeout: Duration,
    ) -> (JoinHandle<WorkerStats>, crate::queue::ResultReceiver<i64>) {
        let (tx, rx) = result_queue();
        let scorer: Arc<Linear> = Arc::new(linear);
        let worker = Worker::new(0, tasks.clone(), tx, dataset(), scorer, timeout);
        (worker.spawn().unwrap(), rx)
    }

    #[test]
    fn worker_processes_queued_batches_then_exits() {
        let tasks = TaskQueue::new(None);
        tasks.put(batch(0, vec![vec![0, 0], vec![1, 1]], 1, 1));
        tasks.put(batch(1, vec![vec![2, 2]], 1, 1));

        let (handle, rx) = spawn_worker(&tasks, Duration::from_millis(50));
        tasks.join();

        let mut received: Vec<_> = rx.iter().collect();
        received.sort_by_key(|r| r.task_id);
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].results[0].params.values(), &[1, 1]);

        let stats = handle.join().unwrap();
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.combinations, 3);
        assert_eq!(stats.skipped, 0);
    }

    #[test]
    fn one_timeout_is_forgiven_when_work_arrives() {
        let timeout = Duration::from_millis(200);
        let tasks = TaskQueue::new(None);
        let (handle, rx) = spawn_worker(&tasks, timeout);

        // Past the first timeout, well before the second.
        thread::sleep(Duration::from_millis(300));
        tasks.put(batch(0, vec![vec![1, 1]], 1, 1));

        let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(result.task_id, 0);
        assert_eq!(handle.join().unwrap().batches, 1);
    }

    #[test]
    fn two_consecutive_timeouts_end_the_worker_cleanly() {
        let timeout = Duration::from_millis(60);
        let tasks: TaskQueue<i64> = TaskQueue::new(None);
        let started = Instant::now();
        let (handle, rx) = spawn_worker(&tasks, timeout);

        let stats = handle.join().unwrap();
        assert!(started.elapsed() >= timeout * 2);
        assert_eq!(stats, WorkerStats { worker_id: 0, ..WorkerStats::default() });
        assert!(rx.try_recv().is_err());
        assert_eq!(tasks.pending(), 0);
    }
}

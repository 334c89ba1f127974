//! Wiring of enumerator, partitioner, worker pool and aggregator.

use chrono::Utc;
use gs_types::{DataPoint, GsResult, Scorer, SweepConfig, SweepSettings};
use num_traits::ToPrimitive;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::Aggregator;
use crate::dataset::Dataset;
use crate::partition::TaskPartitioner;
use crate::queue::{result_queue, TaskQueue};
use crate::report::{ProgressPhase, SweepProgress, SweepReport};
use crate::space::ParamSpace;
use crate::worker::Worker;

type ProgressFn = Box<dyn FnMut(SweepProgress)>;

/// A validated sweep, ready to run.
///
/// Construction checks the axes, dataset and configuration; nothing is
/// spawned until [`SweepRunner::run`].
pub struct SweepRunner<V, T, S: ?Sized> {
    scorer: Arc<S>,
    space: ParamSpace<V>,
    dataset: Dataset<T>,
    settings: SweepSettings,
    progress: Option<ProgressFn>,
}

impl<V, T, S> SweepRunner<V, T, S>
where
    V: Clone + Send + 'static,
    T: ToPrimitive + Send + Sync + 'static,
    S: Scorer<V, T> + ?Sized + 'static,
{
    pub fn new(
        scorer: Arc<S>,
        axes: Vec<Vec<V>>,
        points: Vec<DataPoint<T>>,
        config: &SweepConfig,
    ) -> GsResult<Self> {
        let settings = config.validate()?;
        let space = ParamSpace::new(axes)?;
        let dataset = Dataset::new(points)?;
        Ok(Self {
            scorer,
            space,
            dataset,
            settings,
            progress: None,
        })
    }

    /// Receive partitioning and aggregation progress on the calling thread.
    pub fn with_progress(mut self, on_progress: impl FnMut(SweepProgress) + 'static) -> Self {
        self.progress = Some(Box::new(on_progress));
        self
    }

    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    pub fn total_combinations(&self) -> usize {
        self.space.len()
    }

    /// Start the worker pool, enqueue every batch, and block until the
    /// global top-N is known and every batch has been acknowledged.
    ///
    /// Workers are left to exit on their own once the queue stays empty for
    /// two fetch timeouts.
    pub fn run(self) -> GsResult<SweepReport<V>> {
        let Self {
            scorer,
            space,
            dataset,
            settings,
            mut progress,
        } = self;

        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = space.len();

        let tasks = TaskQueue::new(settings.task_queue_capacity);
        let (result_tx, result_rx) = result_queue();

        for worker_id in 0..settings.worker_count {
            Worker::new(
                worker_id,
                tasks.clone(),
                result_tx.clone(),
                dataset.clone(),
                Arc::clone(&scorer),
                settings.fetch_timeout,
            )
            .spawn()?;
        }
        // Only workers hold senders from here on.
        drop(result_tx);

        info!(
            sweep = %id,
            workers = settings.worker_count,
            combinations = total,
            "Started sweep"
        );

        let mut notify = |phase, completed, total| {
            let sample = SweepProgress {
                phase,
                completed,
                total,
            };
            debug!(sweep = %id, "{sample}");
            if let Some(on_progress) = progress.as_mut() {
                on_progress(sample);
            }
        };

        notify(ProgressPhase::Partitioning, 0, total);
        let mut partitioner = TaskPartitioner::new(space.iter(), &settings);
        while let Some(batch) = partitioner.next() {
            tasks.put(batch);
            notify(
                ProgressPhase::Partitioning,
                partitioner.combinations_consumed(),
                total,
            );
        }
        let task_count = partitioner.batches_emitted();
        info!(sweep = %id, task_count, "All batches enqueued");

        let aggregate = Aggregator::new(&settings).collect(
            &result_rx,
            task_count,
            &tasks,
            |done, count| notify(ProgressPhase::Aggregating, done, count),
        )?;

        if aggregate.skipped > 0 {
            warn!(
                sweep = %id,
                skipped = aggregate.skipped,
                "Some combinations could not be scored and were left out of the ranking"
            );
        }

        let finished_at = Utc::now();
        info!(
            sweep = %id,
            results = aggregate.results.len(),
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "Sweep completed"
        );

        Ok(SweepReport {
            id,
            results: aggregate.results,
            total_combinations: total,
            task_count,
            worker_count: settings.worker_count,
            skipped_combinations: aggregate.skipped,
            started_at,
            finished_at,
        })
    }
}

/// Evaluate `scorer` over every combination of `axes` against `points` and
/// return the `top_n` lowest-error combinations.
pub fn run_sweep<V, T, S>(
    scorer: S,
    axes: Vec<Vec<V>>,
    points: Vec<DataPoint<T>>,
    config: &SweepConfig,
) -> GsResult<SweepReport<V>>
where
    V: Clone + Send + 'static,
    T: ToPrimitive + Send + Sync + 'static,
    S: Scorer<V, T> + 'static,
{
    SweepRunner::new(Arc::new(scorer), axes, points, config)?.run()
}

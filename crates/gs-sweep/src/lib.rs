//! # gs-sweep
//!
//! Exhaustive parameter sweeps with a bounded, streaming top-N reduction.
//!
//! The Cartesian product of the axes is enumerated lazily, cut into batches,
//! and scored by a pool of OS-thread workers. Each worker keeps only its
//! batch's best results; the aggregator merges those into the global ranking,
//! so memory stays proportional to `top_n` and the batch size rather than to
//! the size of the search space.

mod aggregate;
mod dataset;
mod partition;
mod queue;
mod reduce;
mod report;
mod runner;
mod space;
mod worker;

pub use aggregate::{Aggregate, Aggregator};
pub use dataset::Dataset;
pub use partition::{TaskBatch, TaskPartitioner};
pub use queue::{result_queue, ResultReceiver, ResultSender, TaskQueue};
pub use reduce::{sort_and_reduce, TopN};
pub use report::{ProgressPhase, SweepId, SweepProgress, SweepReport};
pub use runner::{run_sweep, SweepRunner};
pub use space::{axis, ParamSpace, ParamSpaceIter, SharedParamSpaceIter};
pub use worker::{combination_error, score_batch, ResultBatch, Worker, WorkerStats};

pub use gs_types::{
    DataPoint, GsError, GsResult, ParamCombination, ScoreError, ScoreResult, Scorer, SweepConfig,
    SweepSettings,
};

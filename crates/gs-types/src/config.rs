use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config_error;
use crate::errors::GsResult;

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: f64 = 10.0;

/// Tuning knobs for a sweep. Every field is optional in serialized form;
/// derived defaults are filled in by [`SweepConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Size of the final result set.
    pub top_n: usize,

    /// Combinations per task batch. Defaults to `top_n * 10`.
    pub group_count: Option<usize>,

    /// Reduction cadence for workers and the aggregator. Defaults to
    /// `group_count / 3`.
    pub order_every_n: Option<usize>,

    /// How long an idle worker waits for a batch before using its grace retry.
    pub fetch_timeout_seconds: f64,

    /// Size of the worker pool. Defaults to twice the logical CPU count.
    pub worker_count: Option<usize>,

    /// Bound on queued batches; `None` leaves the task queue unbounded.
    pub task_queue_capacity: Option<usize>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            group_count: None,
            order_every_n: None,
            fetch_timeout_seconds: DEFAULT_FETCH_TIMEOUT_SECONDS,
            worker_count: None,
            task_queue_capacity: None,
        }
    }
}

impl SweepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> GsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    pub fn with_group_count(mut self, n: usize) -> Self {
        self.group_count = Some(n);
        self
    }

    pub fn with_order_every_n(mut self, n: usize) -> Self {
        self.order_every_n = Some(n);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_seconds = timeout.as_secs_f64();
        self
    }

    pub fn with_worker_count(mut self, n: usize) -> Self {
        self.worker_count = Some(n);
        self
    }

    pub fn with_task_queue_capacity(mut self, n: usize) -> Self {
        self.task_queue_capacity = Some(n);
        self
    }

    /// Resolve defaults and reject values the engine cannot run with.
    pub fn validate(&self) -> GsResult<SweepSettings> {
        if self.top_n == 0 {
            return Err(config_error!("top_n must be at least 1"));
        }

        let group_count = match self.group_count {
            Some(0) => return Err(config_error!("group_count must be at least 1")),
            Some(n) => n,
            None => self
                .top_n
                .checked_mul(10)
                .ok_or_else(|| config_error!("top_n {} is too large", self.top_n))?,
        };

        let order_every_n = self.order_every_n.unwrap_or(group_count / 3);

        if !self.fetch_timeout_seconds.is_finite() || self.fetch_timeout_seconds <= 0.0 {
            return Err(config_error!(
                "fetch_timeout_seconds must be a positive number, got {}",
                self.fetch_timeout_seconds
            ));
        }
        let fetch_timeout = Duration::try_from_secs_f64(self.fetch_timeout_seconds).map_err(|e| {
            config_error!("fetch_timeout_seconds {}: {e}", self.fetch_timeout_seconds)
        })?;

        let worker_count = match self.worker_count {
            Some(0) => return Err(config_error!("worker_count must be at least 1")),
            Some(n) => n,
            None => default_worker_count(),
        };

        if self.task_queue_capacity == Some(0) {
            return Err(config_error!("task_queue_capacity must be at least 1 when set"));
        }

        Ok(SweepSettings {
            top_n: self.top_n,
            group_count,
            order_every_n,
            fetch_timeout,
            worker_count,
            task_queue_capacity: self.task_queue_capacity,
        })
    }
}

/// Fully resolved configuration handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSettings {
    pub top_n: usize,
    pub group_count: usize,
    pub order_every_n: usize,
    pub fetch_timeout: Duration,
    pub worker_count: usize,
    pub task_queue_capacity: Option<usize>,
}

impl SweepSettings {
    /// Running-list length at which a worker sorts and truncates.
    pub fn worker_reduce_threshold(&self) -> usize {
        worker_reduce_threshold(self.top_n, self.order_every_n)
    }
}

pub fn worker_reduce_threshold(top_n: usize, order_every_n: usize) -> usize {
    top_n.saturating_mul(5).max(order_every_n)
}

fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cpus * 2
}

//! Sweep progress events and the final report.

use chrono::{DateTime, Utc};
use gs_types::ScoreResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique sweep run identifier.
pub type SweepId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Combinations cut into batches and enqueued.
    Partitioning,
    /// Batch results merged into the global ranking.
    Aggregating,
}

/// One progress sample. `completed` never decreases within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepProgress {
    pub phase: ProgressPhase,
    pub completed: usize,
    pub total: usize,
}

impl SweepProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

impl fmt::Display for SweepProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            ProgressPhase::Partitioning => write!(
                f,
                "Added {} of {} param combinations ({:.2}%)",
                self.completed,
                self.total,
                self.percent()
            ),
            ProgressPhase::Aggregating => write!(f, "Getting results {:.2}%", self.percent()),
        }
    }
}

/// Outcome of a completed sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport<V> {
    pub id: SweepId,
    /// Best combinations, ascending by error.
    pub results: Vec<ScoreResult<V>>,
    pub total_combinations: usize,
    pub task_count: usize,
    pub worker_count: usize,
    /// Combinations dropped because scoring them failed.
    pub skipped_combinations: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl<V> SweepReport<V> {
    pub fn best(&self) -> Option<&ScoreResult<V>> {
        self.results.first()
    }

    pub fn is_complete(&self) -> bool {
        self.skipped_combinations == 0
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl<V: fmt::Display> fmt::Display for SweepReport<V> {
    /// One `Error: .. \t Params: ..` line per result.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            writeln!(f, "{result}")?;
        }
        Ok(())
    }
}

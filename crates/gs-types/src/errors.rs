use thiserror::Error;

/// Main error type for gridsweep
#[derive(Error, Debug)]
pub enum GsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Scoring failed: {0}")]
    Score(#[from] ScoreError),

    #[error("Workers exhausted: received {received} of {expected} result batches")]
    WorkersExhausted { received: usize, expected: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcomes of a worker's fetch loop that are not results.
///
/// Neither variant is ever surfaced to the caller of a sweep; both are
/// logged and acted on locally by the worker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("worker {worker_id} timed out waiting for a batch after {timeout_ms} ms")]
    Timeout { worker_id: usize, timeout_ms: u128 },

    #[error("worker {worker_id} found no more work after {batches} batches")]
    Exhausted { worker_id: usize, batches: usize },
}

/// Failure raised by a scorer for a single combination and data point.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("scorer rejected input: {message}")]
    Rejected { message: String },

    #[error("scorer produced a non-finite prediction: {value}")]
    NonFinite { value: f64 },

    #[error("scorer panicked: {message}")]
    Panicked { message: String },
}

impl ScoreError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Result type alias for gridsweep operations
pub type GsResult<T> = Result<T, GsError>;

/// Macro for creating invalid input errors
#[macro_export]
macro_rules! invalid_input {
    ($($arg:tt)*) => {
        $crate::GsError::InvalidInput(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::GsError::InvalidConfiguration(format!($($arg)*))
    };
}

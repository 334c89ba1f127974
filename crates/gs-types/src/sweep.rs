use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

use crate::errors::ScoreError;

/// One concrete assignment of a value to every axis of a parameter space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamCombination<V> {
    values: Vec<V>,
}

impl<V> ParamCombination<V> {
    pub fn new(values: Vec<V>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn into_values(self) -> Vec<V> {
        self.values
    }
}

impl<V> Deref for ParamCombination<V> {
    type Target = [V];

    fn deref(&self) -> &[V] {
        &self.values
    }
}

impl<V> From<Vec<V>> for ParamCombination<V> {
    fn from(values: Vec<V>) -> Self {
        Self::new(values)
    }
}

impl<V: fmt::Display> fmt::Display for ParamCombination<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}

/// A fixed-width row of the reference dataset. The last field is the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataPoint<T> {
    fields: Vec<T>,
}

impl<T> DataPoint<T> {
    pub fn new(fields: Vec<T>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[T] {
        &self.fields
    }

    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// Fields preceding the target.
    pub fn features(&self) -> &[T] {
        match self.fields.split_last() {
            Some((_, features)) => features,
            None => &[],
        }
    }
}

impl<T: ToPrimitive> DataPoint<T> {
    /// Ground-truth value as `f64`, or `None` for an empty or unrepresentable row.
    pub fn target(&self) -> Option<f64> {
        self.fields.last().and_then(ToPrimitive::to_f64)
    }
}

impl<T> Deref for DataPoint<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.fields
    }
}

impl<T> From<Vec<T>> for DataPoint<T> {
    fn from(fields: Vec<T>) -> Self {
        Self::new(fields)
    }
}

/// Normalised absolute error of one parameter combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult<V> {
    pub error: f64,
    pub params: ParamCombination<V>,
}

impl<V> ScoreResult<V> {
    pub fn new(error: f64, params: ParamCombination<V>) -> Self {
        Self { error, params }
    }
}

impl<V: fmt::Display> fmt::Display for ScoreResult<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {} \t Params: {}", self.error, self.params)
    }
}

/// User-supplied prediction function evaluated for every combination and
/// every data point.
///
/// Implementations must be pure: workers call `score` concurrently from many
/// threads against the same shared instance. Plain closures of the shape
/// `Fn(&ParamCombination<V>, &DataPoint<T>) -> f64` are scorers already;
/// implement the trait directly when scoring can fail.
///
/// Return [`ScoreError`] rather than panicking for combinations that cannot
/// be scored. A panic is caught and the combination skipped, but the
/// process panic hook still runs first and by default prints every one to
/// stderr.
pub trait Scorer<V, T>: Send + Sync {
    fn score(&self, params: &ParamCombination<V>, point: &DataPoint<T>) -> Result<f64, ScoreError>;
}

impl<V, T, F> Scorer<V, T> for F
where
    F: Fn(&ParamCombination<V>, &DataPoint<T>) -> f64 + Send + Sync,
{
    fn score(&self, params: &ParamCombination<V>, point: &DataPoint<T>) -> Result<f64, ScoreError> {
        Ok(self(params, point))
    }
}

//! Parameter space definition and lazy mixed-radix enumeration.

use gs_types::{invalid_input, GsResult, ParamCombination};
use std::sync::Arc;

/// The full search space: an ordered list of discrete axes.
///
/// Combinations are never stored; each one is rebuilt from its linear index
/// on demand, so the space costs only its axes in memory no matter how large
/// the Cartesian product grows.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpace<V> {
    axes: Vec<Vec<V>>,
    strides: Vec<usize>,
    total: usize,
}

impl<V: Clone> ParamSpace<V> {
    pub fn new(axes: Vec<Vec<V>>) -> GsResult<Self> {
        if axes.is_empty() {
            return Err(invalid_input!("parameter space needs at least one axis"));
        }
        if let Some(pos) = axes.iter().position(Vec::is_empty) {
            return Err(invalid_input!("axis {pos} has no values"));
        }

        // Last axis varies fastest.
        let mut strides = vec![1usize; axes.len()];
        let mut total: usize = 1;
        for j in (0..axes.len()).rev() {
            strides[j] = total;
            total = total.checked_mul(axes[j].len()).ok_or_else(|| {
                invalid_input!("parameter space has more than {} combinations", usize::MAX)
            })?;
        }

        Ok(Self {
            axes,
            strides,
            total,
        })
    }

    /// Total number of combinations (product of axis lengths).
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn axes(&self) -> &[Vec<V>] {
        &self.axes
    }

    /// Decode the combination at linear `index`.
    pub fn get(&self, index: usize) -> Option<ParamCombination<V>> {
        if index >= self.total {
            return None;
        }
        let values = self
            .axes
            .iter()
            .zip(&self.strides)
            .map(|(axis, stride)| axis[(index / stride) % axis.len()].clone())
            .collect();
        Some(ParamCombination::new(values))
    }

    pub fn iter(&self) -> ParamSpaceIter<'_, V> {
        ParamSpaceIter {
            space: self,
            next: 0,
        }
    }

    /// Owning iterator, usable from a thread that outlives the borrow.
    pub fn into_shared_iter(self) -> SharedParamSpaceIter<V> {
        SharedParamSpaceIter {
            space: Arc::new(self),
            next: 0,
        }
    }
}

impl<'a, V: Clone> IntoIterator for &'a ParamSpace<V> {
    type Item = ParamCombination<V>;
    type IntoIter = ParamSpaceIter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpaceIter<'a, V> {
    space: &'a ParamSpace<V>,
    next: usize,
}

impl<V: Clone> Iterator for ParamSpaceIter<'_, V> {
    type Item = ParamCombination<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let combo = self.space.get(self.next)?;
        self.next += 1;
        Some(combo)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.space.total - self.next;
        (remaining, Some(remaining))
    }
}

impl<V: Clone> ExactSizeIterator for ParamSpaceIter<'_, V> {}

#[derive(Debug, Clone)]
pub struct SharedParamSpaceIter<V> {
    space: Arc<ParamSpace<V>>,
    next: usize,
}

impl<V: Clone> Iterator for SharedParamSpaceIter<V> {
    type Item = ParamCombination<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let combo = self.space.get(self.next)?;
        self.next += 1;
        Some(combo)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.space.total - self.next;
        (remaining, Some(remaining))
    }
}

impl<V: Clone> ExactSizeIterator for SharedParamSpaceIter<V> {}

/// Builders for common discrete axes.
pub mod axis {
    /// Every integer in `[low, high]`. Empty when `low > high`.
    pub fn int_range(low: i64, high: i64) -> Vec<i64> {
        (low..=high).collect()
    }

    /// `steps` evenly spaced points from `low` to `high` inclusive (at least two).
    pub fn linspace(low: f64, high: f64, steps: usize) -> Vec<f64> {
        let steps = steps.max(2);
        (0..steps)
            .map(|i| {
                let t = i as f64 / (steps - 1) as f64;
                low + t * (high - low)
            })
            .collect()
    }

    /// `steps` points evenly spaced in log-space from `low` to `high`.
    ///
    /// Returns an empty axis unless both bounds are positive and finite, so
    /// [`ParamSpace::new`](super::ParamSpace::new) rejects it instead of
    /// sweeping over NaN.
    pub fn log_space(low: f64, high: f64, steps: usize) -> Vec<f64> {
        let usable = |b: f64| b.is_finite() && b > 0.0;
        if !usable(low) || !usable(high) {
            return Vec::new();
        }
        let log_low = low.ln();
        let log_high = high.ln();
        linspace(log_low, log_high, steps)
            .into_iter()
            .map(f64::exp)
            .collect()
    }
}

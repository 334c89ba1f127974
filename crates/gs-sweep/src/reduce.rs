//! Sort-and-truncate reduction shared by workers and the aggregator.

use gs_types::ScoreResult;

/// Sort ascending by error and keep at most `top_n` entries.
///
/// The sort is stable, so reducing an already-reduced list is a no-op.
pub fn sort_and_reduce<V>(results: &mut Vec<ScoreResult<V>>, top_n: usize) {
    results.sort_by(|a, b| a.error.total_cmp(&b.error));
    results.truncate(top_n);
}

/// A running best-of-N list that re-bounds itself once it grows past a
/// threshold.
#[derive(Debug, Clone)]
pub struct TopN<V> {
    items: Vec<ScoreResult<V>>,
    top_n: usize,
    threshold: usize,
}

impl<V> TopN<V> {
    /// `threshold` is the length at which the list is reduced; it is raised
    /// to `top_n` if smaller so a reduction always shrinks the list.
    pub fn new(top_n: usize, threshold: usize) -> Self {
        Self {
            items: Vec::with_capacity(threshold.max(top_n).saturating_add(1).min(4096)),
            top_n,
            threshold: threshold.max(top_n),
        }
    }

    pub fn push(&mut self, result: ScoreResult<V>) {
        self.items.push(result);
        if self.items.len() >= self.threshold {
            sort_and_reduce(&mut self.items, self.top_n);
        }
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ScoreResult<V>>) {
        for result in results {
            self.push(result);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Final reduction; the returned list is sorted and at most `top_n` long.
    pub fn into_sorted(mut self) -> Vec<ScoreResult<V>> {
        sort_and_reduce(&mut self.items, self.top_n);
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gs_types::ParamCombination;

    fn result(error: f64, id: i32) -> ScoreResult<i32> {
        ScoreResult::new(error, ParamCombination::new(vec![id]))
    }

    fn errors(results: &[ScoreResult<i32>]) -> Vec<f64> {
        results.iter().map(|r| r.error).collect()
    }

    #[test]
    fn reduces_to_sorted_prefix() {
        let mut results = vec![result(0.9, 0), result(0.1, 1), result(0.5, 2), result(0.3, 3)];
        sort_and_reduce(&mut results, 2);
        assert_eq!(errors(&results), vec![0.1, 0.3]);
    }

    #[test]
    fn short_lists_are_only_sorted() {
        let mut results = vec![result(0.4, 0), result(0.2, 1)];
        sort_and_reduce(&mut results, 10);
        assert_eq!(errors(&results), vec![0.2, 0.4]);
    }

    #[test]
    fn reduction_is_idempotent() {
        let mut once = vec![
            result(0.7, 0),
            result(0.2, 1),
            result(0.2, 2),
            result(0.0, 3),
            result(1.5, 4),
        ];
        sort_and_reduce(&mut once, 3);
        let mut twice = once.clone();
        sort_and_reduce(&mut twice, 3);
        assert_eq!(once, twice);
    }

    #[test]
    fn nan_errors_sort_last() {
        let mut results = vec![result(f64::NAN, 0), result(0.5, 1)];
        sort_and_reduce(&mut results, 1);
        assert_eq!(errors(&results), vec![0.5]);
    }

    #[test]
    fn top_n_stays_bounded_while_streaming() {
        let mut top = TopN::new(3, 8);
        for i in 0..100 {
            top.push(result(((i * 37) % 100) as f64, i));
            assert!(top.len() < 8);
        }
        let best = top.into_sorted();
        assert_eq!(errors(&best), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn threshold_below_top_n_is_raised() {
        let mut top = TopN::new(4, 1);
        top.extend((0..4).map(|i| result(i as f64, i)));
        assert_eq!(top.into_sorted().len(), 4);
    }
}

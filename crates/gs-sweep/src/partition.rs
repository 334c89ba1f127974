//! Grouping of enumerated combinations into task batches.

use gs_types::{ParamCombination, SweepSettings};

/// A contiguous run of combinations scored together by one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskBatch<V> {
    /// Position of this batch in emission order, starting at 0.
    pub id: usize,
    pub combinations: Vec<ParamCombination<V>>,
    pub top_n: usize,
    pub order_every_n: usize,
}

impl<V> TaskBatch<V> {
    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }
}

/// Iterator adapter cutting a combination stream into [`TaskBatch`]es of
/// `group_count`, with a smaller trailing batch for any remainder.
#[derive(Debug)]
pub struct TaskPartitioner<I> {
    combinations: I,
    group_count: usize,
    top_n: usize,
    order_every_n: usize,
    batches_emitted: usize,
    combinations_consumed: usize,
}

impl<I> TaskPartitioner<I> {
    pub fn new(combinations: I, settings: &SweepSettings) -> Self {
        Self {
            combinations,
            group_count: settings.group_count.max(1),
            top_n: settings.top_n,
            order_every_n: settings.order_every_n,
            batches_emitted: 0,
            combinations_consumed: 0,
        }
    }

    pub fn batches_emitted(&self) -> usize {
        self.batches_emitted
    }

    pub fn combinations_consumed(&self) -> usize {
        self.combinations_consumed
    }
}

impl<V, I> Iterator for TaskPartitioner<I>
where
    I: Iterator<Item = ParamCombination<V>>,
{
    type Item = TaskBatch<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let combinations: Vec<_> = self.combinations.by_ref().take(self.group_count).collect();
        if combinations.is_empty() {
            return None;
        }

        self.combinations_consumed += combinations.len();
        let batch = TaskBatch {
            id: self.batches_emitted,
            combinations,
            top_n: self.top_n,
            order_every_n: self.order_every_n,
        };
        self.batches_emitted += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (low, high) = self.combinations.size_hint();
        let batches = |n: usize| n.div_ceil(self.group_count);
        (batches(low), high.map(batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{axis, ParamSpace};
    use gs_types::SweepConfig;

    fn settings(top_n: usize, group_count: usize) -> SweepSettings {
        SweepConfig::new()
            .with_top_n(top_n)
            .with_group_count(group_count)
            .with_worker_count(1)
            .validate()
            .unwrap()
    }

    #[test]
    fn concatenated_batches_reproduce_enumeration() {
        let space = ParamSpace::new(vec![axis::int_range(0, 6), axis::int_range(0, 4)]).unwrap();
        let expected: Vec<_> = space.iter().collect();

        let batches: Vec<_> = TaskPartitioner::new(space.iter(), &settings(2, 4)).collect();
        let flattened: Vec<_> = batches
            .iter()
            .flat_map(|b| b.combinations.iter().cloned())
            .collect();

        assert_eq!(flattened, expected);
    }

    #[test]
    fn remainder_goes_into_final_smaller_batch() {
        let space = ParamSpace::new(vec![axis::int_range(0, 9)]).unwrap();
        let sizes: Vec<_> = TaskPartitioner::new(space.iter(), &settings(1, 4))
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let space = ParamSpace::new(vec![axis::int_range(0, 7)]).unwrap();
        let sizes: Vec<_> = TaskPartitioner::new(space.iter(), &settings(1, 4))
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![4, 4]);
    }

    #[test]
    fn batches_carry_ids_and_reduction_settings() {
        let space = ParamSpace::new(vec![axis::int_range(0, 29)]).unwrap();
        let config = settings(3, 9);
        let mut partitioner = TaskPartitioner::new(space.iter(), &config);
        assert_eq!(partitioner.size_hint(), (4, Some(4)));

        let batches: Vec<_> = partitioner.by_ref().collect();
        assert_eq!(batches.len(), 4);
        for (i, batch) in batches.iter().enumerate() {
            assert_eq!(batch.id, i);
            assert_eq!(batch.top_n, 3);
            assert_eq!(batch.order_every_n, 3);
        }
        assert_eq!(partitioner.batches_emitted(), 4);
        assert_eq!(partitioner.combinations_consumed(), 30);
    }

    #[test]
    fn default_group_count_is_ten_times_top_n() {
        let config = SweepConfig::new().with_top_n(2).with_worker_count(1).validate().unwrap();
        let space = ParamSpace::new(vec![axis::int_range(0, 44)]).unwrap();
        let sizes: Vec<_> = TaskPartitioner::new(space.iter(), &config)
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![20, 20, 5]);
    }
}

//! Read-only reference dataset shared by every worker.

use gs_types::{config_error, DataPoint, GsResult};
use num_traits::ToPrimitive;
use std::sync::Arc;

/// Validated dataset with its targets pre-extracted.
///
/// Cloning is cheap: the rows and targets live behind `Arc`s.
#[derive(Debug)]
pub struct Dataset<T> {
    points: Arc<[DataPoint<T>]>,
    targets: Arc<[f64]>,
    target_total: f64,
}

impl<T> Clone for Dataset<T> {
    fn clone(&self) -> Self {
        Self {
            points: Arc::clone(&self.points),
            targets: Arc::clone(&self.targets),
            target_total: self.target_total,
        }
    }
}

impl<T: ToPrimitive> Dataset<T> {
    /// Rejects datasets the error formula cannot normalise: no rows, rows of
    /// differing or zero width, targets not representable as `f64`, or a
    /// target sum that is not strictly positive.
    pub fn new(points: Vec<DataPoint<T>>) -> GsResult<Self> {
        let width = match points.first() {
            Some(first) => first.width(),
            None => return Err(config_error!("dataset has no data points")),
        };
        if width == 0 {
            return Err(config_error!("data points must have at least one field"));
        }

        let mut targets = Vec::with_capacity(points.len());
        for (row, point) in points.iter().enumerate() {
            if point.width() != width {
                return Err(config_error!(
                    "data point {row} has {} fields, expected {width}",
                    point.width()
                ));
            }
            let target = point
                .target()
                .filter(|t| t.is_finite())
                .ok_or_else(|| config_error!("data point {row} has a non-numeric target"))?;
            targets.push(target);
        }

        let target_total: f64 = targets.iter().sum();
        if !(target_total.is_finite() && target_total > 0.0) {
            return Err(config_error!(
                "dataset targets must sum to a positive number, got {target_total}"
            ));
        }

        Ok(Self {
            points: points.into(),
            targets: targets.into(),
            target_total,
        })
    }
}

impl<T> Dataset<T> {
    pub fn points(&self) -> &[DataPoint<T>] {
        &self.points
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Denominator of the normalised error.
    pub fn target_total(&self) -> f64 {
        self.target_total
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gs_types::GsError;

    fn rows(rows: &[&[i64]]) -> Vec<DataPoint<i64>> {
        rows.iter().map(|r| DataPoint::new(r.to_vec())).collect()
    }

    #[test]
    fn extracts_targets_and_total() {
        let dataset = Dataset::new(rows(&[&[0, 1, 11], &[1, 3, 41], &[2, 5, 71]])).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.targets(), &[11.0, 41.0, 71.0]);
        assert_eq!(dataset.target_total(), 123.0);
    }

    #[test]
    fn clones_share_rows() {
        let dataset = Dataset::new(rows(&[&[1, 1, 5]])).unwrap();
        let copy = dataset.clone();
        assert!(std::ptr::eq(dataset.points().as_ptr(), copy.points().as_ptr()));
    }

    #[test]
    fn rejects_unusable_datasets() {
        let cases: Vec<Vec<DataPoint<i64>>> = vec![
            vec![],
            rows(&[&[]]),
            rows(&[&[1, 2, 3], &[1, 2]]),
            rows(&[&[1, 0], &[2, 0]]),
            rows(&[&[1, -4], &[2, 1]]),
        ];
        for case in cases {
            assert!(matches!(
                Dataset::new(case),
                Err(GsError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn rejects_non_finite_targets() {
        let points = vec![DataPoint::new(vec![1.0, f64::INFINITY])];
        assert!(matches!(
            Dataset::new(points),
            Err(GsError::InvalidConfiguration(_))
        ));
    }
}

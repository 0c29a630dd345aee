//! Feature selection, mean imputation and standardization

use ndarray::{Array2, ArrayView1};
use tracing::{debug, warn};

use crate::data::{RecordSet, FEATURE_COLUMNS};
use crate::error::{Result, SegmentError};

/// Statistics fitted on one feature column during standardization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureStats {
    /// Mean after imputation.
    pub mean: f64,
    /// Population standard deviation after imputation.
    pub std_dev: f64,
    /// Cells that were missing and filled with the column mean.
    pub imputed: usize,
}

/// Numeric features scaled to zero mean and unit variance, row-aligned with
/// the record set they were derived from.
#[derive(Clone, Debug)]
pub struct StandardizedRecordSet {
    features: Array2<f64>,
    columns: Vec<String>,
    stats: Vec<FeatureStats>,
}

impl StandardizedRecordSet {
    /// Wrap an already standardized matrix. `columns` names the matrix columns
    /// in order.
    pub fn new(features: Array2<f64>, columns: Vec<String>) -> Result<Self> {
        if features.ncols() != columns.len() {
            return Err(SegmentError::invalid_parameter(
                "columns",
                format!(
                    "{} column names for a matrix with {} columns",
                    columns.len(),
                    features.ncols()
                ),
            ));
        }
        Ok(Self {
            features,
            columns,
            stats: Vec::new(),
        })
    }

    /// Wrap a matrix laid out in the default feature order.
    pub fn from_features(features: Array2<f64>) -> Result<Self> {
        Self::new(features, default_columns())
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Per-column statistics; empty when built with [`StandardizedRecordSet::new`].
    pub fn stats(&self) -> &[FeatureStats] {
        &self.stats
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.features.row(index)
    }

    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }
}

fn default_columns() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|name| name.to_string()).collect()
}

/// Select the feature columns, impute missing cells with the column mean and
/// scale each column to zero mean and unit variance.
///
/// Statistics are fitted on `records` itself; nothing carries over between
/// calls.
pub fn standardize(records: &RecordSet) -> Result<StandardizedRecordSet> {
    if let Some(missing) = FEATURE_COLUMNS.iter().find(|name| !records.has_column(name)) {
        return Err(SegmentError::missing_column(*missing));
    }

    let n_samples = records.len();
    let mut features = Array2::<f64>::zeros((n_samples, FEATURE_COLUMNS.len()));
    let mut stats = Vec::with_capacity(FEATURE_COLUMNS.len());

    for (index, name) in FEATURE_COLUMNS.iter().enumerate() {
        let raw = records.numeric_column(name)?;
        let (values, imputed) = impute_mean(name, &raw)?;
        let column_stats = fit_column(name, &values, imputed)?;

        features
            .column_mut(index)
            .iter_mut()
            .zip(values)
            .for_each(|(cell, value)| *cell = (value - column_stats.mean) / column_stats.std_dev);

        debug!(
            column = *name,
            mean = column_stats.mean,
            std_dev = column_stats.std_dev,
            "standardized feature"
        );
        stats.push(column_stats);
    }

    Ok(StandardizedRecordSet {
        features,
        columns: default_columns(),
        stats,
    })
}

/// Fill missing (or NaN) cells with the mean of the present cells.
fn impute_mean(name: &str, raw: &[Option<f64>]) -> Result<(Vec<f64>, usize)> {
    let present: Vec<f64> = raw
        .iter()
        .flatten()
        .copied()
        .filter(|value| !value.is_nan())
        .collect();

    if present.is_empty() {
        return Err(SegmentError::DegenerateInput {
            column: name.to_string(),
            reason: "every value is missing",
        });
    }

    let mean = present.iter().sum::<f64>() / present.len() as f64;
    let imputed = raw.len() - present.len();
    if imputed > 0 {
        warn!(column = name, imputed, fill = mean, "imputed missing values with column mean");
    }

    let values = raw
        .iter()
        .map(|value| match value {
            Some(v) if !v.is_nan() => *v,
            _ => mean,
        })
        .collect();
    Ok((values, imputed))
}

fn fit_column(name: &str, values: &[f64], imputed: usize) -> Result<FeatureStats> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    // Identical values can leave rounding noise instead of an exact zero.
    if !std_dev.is_finite() || std_dev <= 1e-12 * (1.0 + mean.abs()) {
        return Err(SegmentError::DegenerateInput {
            column: name.to_string(),
            reason: "zero variance",
        });
    }

    Ok(FeatureStats {
        mean,
        std_dev,
        imputed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AGE, ANNUAL_INCOME, SPENDING_SCORE};
    use ndarray::{array, Axis};
    use polars::prelude::*;

    fn records(frame: DataFrame) -> RecordSet {
        RecordSet::from_frame(frame)
    }

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let frame = df!(
            AGE => &[20i64, 30, 40, 50],
            ANNUAL_INCOME => &[15.0, 45.0, 75.0, 105.0],
            SPENDING_SCORE => &[10i64, 90, 30, 70],
            "Gender" => &["Male", "Female", "Female", "Male"]
        )
        .unwrap();

        let standardized = standardize(&records(frame)).unwrap();
        assert_eq!(standardized.features().shape(), &[4, 3]);
        assert_eq!(standardized.columns(), &[AGE, ANNUAL_INCOME, SPENDING_SCORE]);

        let means = standardized.features().mean_axis(Axis(0)).unwrap();
        for mean in means.iter() {
            assert!(mean.abs() < 1e-12);
        }
        for column in standardized.features().axis_iter(Axis(1)) {
            let variance = column.iter().map(|v| v * v).sum::<f64>() / column.len() as f64;
            assert!((variance - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_known_values() {
        let frame = df!(
            AGE => &[1.0, 3.0],
            ANNUAL_INCOME => &[10.0, 20.0],
            SPENDING_SCORE => &[5.0, 7.0]
        )
        .unwrap();

        let standardized = standardize(&records(frame)).unwrap();
        let expected = array![[-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]];
        for (got, want) in standardized.features().iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-12);
        }
        assert_eq!(standardized.stats()[1].mean, 15.0);
        assert_eq!(standardized.stats()[1].std_dev, 5.0);
    }

    #[test]
    fn test_missing_values_imputed_with_column_mean() {
        let frame = df!(
            AGE => &[Some(20.0), None, Some(40.0)],
            ANNUAL_INCOME => &[10.0, 20.0, 60.0],
            SPENDING_SCORE => &[1.0, 2.0, 3.0]
        )
        .unwrap();

        let standardized = standardize(&records(frame)).unwrap();
        let age_stats = standardized.stats()[0];
        assert_eq!(age_stats.imputed, 1);
        assert_eq!(age_stats.mean, 30.0);
        // The imputed cell sits exactly on the mean.
        assert!(standardized.features()[[1, 0]].abs() < 1e-12);
    }

    #[test]
    fn test_missing_feature_column() {
        let frame = df!(
            AGE => &[20.0, 30.0],
            ANNUAL_INCOME => &[10.0, 20.0]
        )
        .unwrap();

        let err = standardize(&records(frame)).unwrap_err();
        assert!(
            matches!(err, SegmentError::MissingColumn { ref column } if column == SPENDING_SCORE)
        );
    }

    #[test]
    fn test_zero_variance_is_degenerate() {
        let frame = df!(
            AGE => &[33.0, 33.0, 33.0],
            ANNUAL_INCOME => &[10.0, 20.0, 30.0],
            SPENDING_SCORE => &[1.0, 2.0, 3.0]
        )
        .unwrap();

        let err = standardize(&records(frame)).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::DegenerateInput { ref column, reason: "zero variance" } if column == AGE
        ));
    }

    #[test]
    fn test_all_missing_is_degenerate() {
        let frame = df!(
            AGE => &[20.0, 30.0],
            ANNUAL_INCOME => &[None::<f64>, None],
            SPENDING_SCORE => &[1.0, 2.0]
        )
        .unwrap();

        let err = standardize(&records(frame)).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::DegenerateInput { ref column, .. } if column == ANNUAL_INCOME
        ));
    }

    #[test]
    fn test_new_rejects_column_count_mismatch() {
        let result = StandardizedRecordSet::new(Array2::zeros((2, 3)), vec!["a".to_string()]);
        assert!(matches!(result, Err(SegmentError::InvalidParameter { .. })));
    }
}

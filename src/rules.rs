//! Threshold rules segmenting customers on raw income and spending

use polars::prelude::*;
use tracing::info;

use crate::data::{RecordSet, ANNUAL_INCOME, RULE_SEGMENT_COLUMN, SPENDING_SCORE};
use crate::error::Result;
use crate::segment::{Labeled, RuleSegment};

/// Minimum income (k$) for the high-value segment.
pub const HIGH_VALUE_MIN_INCOME: f64 = 70.0;
/// Minimum spending score for the high-value segment.
pub const HIGH_VALUE_MIN_SPENDING: f64 = 60.0;
/// Maximum income (k$) for the low-value segment.
pub const LOW_VALUE_MAX_INCOME: f64 = 40.0;
/// Maximum spending score for the low-value segment.
pub const LOW_VALUE_MAX_SPENDING: f64 = 40.0;

/// Segment of a single customer. High value is checked before low value; a
/// missing or NaN input fails both checks and yields medium value.
pub fn classify_record(income: Option<f64>, spending: Option<f64>) -> RuleSegment {
    match (income, spending) {
        (Some(income), Some(spending))
            if income >= HIGH_VALUE_MIN_INCOME && spending >= HIGH_VALUE_MIN_SPENDING =>
        {
            RuleSegment::HighValue
        }
        (Some(income), Some(spending))
            if income <= LOW_VALUE_MAX_INCOME && spending <= LOW_VALUE_MAX_SPENDING =>
        {
            RuleSegment::LowValue
        }
        _ => RuleSegment::MediumValue,
    }
}

/// Segment every record, in row order.
pub fn segment_records(records: &RecordSet) -> Result<Vec<RuleSegment>> {
    let income = records.numeric_column(ANNUAL_INCOME)?;
    let spending = records.numeric_column(SPENDING_SCORE)?;

    Ok(income
        .into_iter()
        .zip(spending)
        .map(|(income, spending)| classify_record(income, spending))
        .collect())
}

/// Attach a `Rule_Segment` column to a copy of `records`.
pub fn classify(records: &RecordSet) -> Result<Labeled<RuleSegment>> {
    let labels = segment_records(records)?;
    let names: Vec<&str> = labels.iter().map(RuleSegment::as_str).collect();
    let records = records.with_column(Series::new(RULE_SEGMENT_COLUMN, names))?;

    info!(rows = labels.len(), "rule-based segmentation complete");
    Ok(Labeled { records, labels })
}

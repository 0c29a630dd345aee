//! Human-readable descriptions of each segment

use std::collections::BTreeMap;
use std::fmt;

use crate::data::{RecordSet, AGE, ANNUAL_INCOME, SPENDING_SCORE};
use crate::error::{Result, SegmentError};

/// Coarse reading of a segment's average income and spending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentProfile {
    /// Average spending above 60 and income above 70.
    Premium,
    /// Average spending below 40 and income below 40.
    PriceSensitive,
    Balanced,
}

impl SegmentProfile {
    pub fn from_averages(income: f64, spending: f64) -> Self {
        if spending > 60.0 && income > 70.0 {
            SegmentProfile::Premium
        } else if spending < 40.0 && income < 40.0 {
            SegmentProfile::PriceSensitive
        } else {
            SegmentProfile::Balanced
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentProfile::Premium => "premium",
            SegmentProfile::PriceSensitive => "price-sensitive",
            SegmentProfile::Balanced => "balanced",
        }
    }

    pub fn commentary(&self) -> &'static str {
        match self {
            SegmentProfile::Premium => "High-value, premium customers.",
            SegmentProfile::PriceSensitive => "Low engagement, price-sensitive customers.",
            SegmentProfile::Balanced => "Medium-value, balanced customers.",
        }
    }
}

/// Averages of one segment and the profile they imply.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentExplanation {
    pub size: usize,
    pub avg_age: f64,
    pub avg_income: f64,
    pub avg_spending: f64,
    pub profile: SegmentProfile,
}

impl fmt::Display for SegmentExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Average Age: {:.1} years", self.avg_age)?;
        writeln!(f, "Average Income: ${:.1}k", self.avg_income)?;
        writeln!(f, "Average Spending Score: {:.1}", self.avg_spending)?;
        write!(f, "{}", self.profile.commentary())
    }
}

#[derive(Default)]
struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value.filter(|v| !v.is_nan()) {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Default)]
struct SegmentAccumulator {
    size: usize,
    age: RunningMean,
    income: RunningMean,
    spending: RunningMean,
}

/// Average the raw features of every segment in `label_column`.
///
/// Rows with no label are skipped; missing feature cells are left out of
/// that feature's average.
pub fn explain_segments(
    data: &RecordSet,
    label_column: &str,
) -> Result<BTreeMap<String, SegmentExplanation>> {
    if !data.has_column(label_column) {
        return Err(SegmentError::missing_column(label_column));
    }

    let labels = data.text_column(label_column)?;
    let ages = data.numeric_column(AGE)?;
    let incomes = data.numeric_column(ANNUAL_INCOME)?;
    let spendings = data.numeric_column(SPENDING_SCORE)?;

    let mut segments: BTreeMap<String, SegmentAccumulator> = BTreeMap::new();
    let rows = labels.into_iter().zip(ages).zip(incomes).zip(spendings);
    for (((label, age), income), spending) in rows {
        let Some(label) = label else { continue };
        let segment = segments.entry(label).or_default();
        segment.size += 1;
        segment.age.push(age);
        segment.income.push(income);
        segment.spending.push(spending);
    }

    Ok(segments
        .into_iter()
        .map(|(label, segment)| {
            let avg_income = segment.income.mean();
            let avg_spending = segment.spending.mean();
            let explanation = SegmentExplanation {
                size: segment.size,
                avg_age: segment.age.mean(),
                avg_income,
                avg_spending,
                profile: SegmentProfile::from_averages(avg_income, avg_spending),
            };
            (label, explanation)
        })
        .collect())
}

/// Explanation text per segment label.
pub fn generate_segment_explanations(
    data: &RecordSet,
    label_column: &str,
) -> Result<BTreeMap<String, String>> {
    Ok(explain_segments(data, label_column)?
        .into_iter()
        .map(|(label, explanation)| (label, explanation.to_string()))
        .collect())
}

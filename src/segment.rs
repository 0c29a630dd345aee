//! Segment labels and per-segment counts

use std::collections::BTreeMap;
use std::fmt;

use crate::data::RecordSet;

/// Fixed vocabulary of the rule engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleSegment {
    HighValue,
    MediumValue,
    LowValue,
}

impl RuleSegment {
    pub const ALL: [RuleSegment; 3] = [
        RuleSegment::HighValue,
        RuleSegment::MediumValue,
        RuleSegment::LowValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSegment::HighValue => "High Value",
            RuleSegment::MediumValue => "Medium Value",
            RuleSegment::LowValue => "Low Value",
        }
    }
}

impl fmt::Display for RuleSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label assigned to a record by either segmentation method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentLabel {
    Rule(RuleSegment),
    /// Cluster id in `[0, k)`.
    Cluster(usize),
}

impl From<RuleSegment> for SegmentLabel {
    fn from(segment: RuleSegment) -> Self {
        SegmentLabel::Rule(segment)
    }
}

impl From<usize> for SegmentLabel {
    fn from(cluster: usize) -> Self {
        SegmentLabel::Cluster(cluster)
    }
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentLabel::Rule(segment) => segment.fmt(f),
            SegmentLabel::Cluster(id) => write!(f, "{}", id),
        }
    }
}

/// Records with one label per row, positionally aligned.
#[derive(Clone, Debug)]
pub struct Labeled<L> {
    /// Records including the label column.
    pub records: RecordSet,
    pub labels: Vec<L>,
}

/// Count of records per segment label.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SegmentSummary {
    counts: BTreeMap<SegmentLabel, usize>,
}

impl SegmentSummary {
    pub fn from_labels<I, L>(labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<SegmentLabel>,
    {
        let mut counts: BTreeMap<SegmentLabel, usize> = BTreeMap::new();
        for label in labels {
            *counts.entry(label.into()).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Records carrying `label`; zero for labels never seen.
    pub fn count(&self, label: impl Into<SegmentLabel>) -> usize {
        let label: SegmentLabel = label.into();
        self.counts.get(&label).copied().unwrap_or(0)
    }

    /// Sum over all labels. Always equals the labeled set's row count.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Percentage of records carrying `label`.
    pub fn share(&self, label: impl Into<SegmentLabel>) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.count(label) as f64 / total as f64 * 100.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SegmentLabel, usize)> {
        self.counts.iter().map(|(label, &count)| (label, count))
    }

    /// Counts keyed by the label's display text.
    pub fn to_map(&self) -> BTreeMap<String, usize> {
        self.iter()
            .map(|(label, count)| (label.to_string(), count))
            .collect()
    }
}

impl fmt::Display for SegmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, count) in self.iter() {
            writeln!(
                f,
                "{}: {} customers ({:.1}%)",
                label,
                count,
                self.share(*label)
            )?;
        }
        Ok(())
    }
}

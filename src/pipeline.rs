//! End-to-end segmentation runs
//!
//! Two entry points share the same loading and output conventions:
//! rule-based segmentation labels raw records directly, clustering-based
//! segmentation standardizes, trains, predicts and projects before merging
//! everything back onto the raw records by row position.

use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::config::SegmentationConfig;
use crate::data::{RecordSet, PC1_COLUMN, PC2_COLUMN};
use crate::error::Result;
use crate::model::{ClusterPredictor, ClusterTrainer, ModelHandle};
use crate::preprocess::standardize;
use crate::projection::{project, Projection, DEFAULT_COMPONENTS};
use crate::rules;
use crate::segment::{RuleSegment, SegmentSummary};

/// Output of a rule-based run.
#[derive(Clone, Debug)]
pub struct RuleSegmentation {
    /// Input records plus `Rule_Segment`
    pub data: RecordSet,
    pub labels: Vec<RuleSegment>,
    pub summary: SegmentSummary,
}

/// Output of a clustering-based run.
#[derive(Clone, Debug)]
pub struct ClusterSegmentation {
    /// Input records plus `ML_Segment`, `PC1` and `PC2`
    pub data: RecordSet,
    pub labels: Vec<usize>,
    pub summary: SegmentSummary,
    pub projection: Projection,
    /// Model that produced the labels
    pub model_path: ModelHandle,
}

/// Runs segmentations against one configured model store.
///
/// Runs are synchronous and do not coordinate with each other: two
/// clustering runs sharing a store overwrite each other's model.
#[derive(Clone, Debug, Default)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Load a CSV file and segment it with the threshold rules.
    pub fn run_rule_based_segmentation(&self, path: impl AsRef<Path>) -> Result<RuleSegmentation> {
        let records = RecordSet::from_csv(path)?;
        self.run_rule_based(&records)
    }

    /// Load a CSV file and segment it into `k` clusters.
    pub fn run_ml_segmentation(
        &self,
        path: impl AsRef<Path>,
        k: usize,
    ) -> Result<ClusterSegmentation> {
        let records = RecordSet::from_csv(path)?;
        self.run_cluster_based(&records, k)
    }

    pub fn run_rule_based(&self, records: &RecordSet) -> Result<RuleSegmentation> {
        let labeled = rules::classify(records)?;
        let summary = SegmentSummary::from_labels(labeled.labels.iter().copied());

        Ok(RuleSegmentation {
            data: labeled.records,
            labels: labeled.labels,
            summary,
        })
    }

    /// Standardize, train, predict on the training set itself, then project.
    pub fn run_cluster_based(&self, records: &RecordSet, k: usize) -> Result<ClusterSegmentation> {
        info!(rows = records.len(), k, "starting clustering segmentation");

        let standardized = standardize(records)?;

        let trainer = ClusterTrainer::new(self.config.store.clone(), self.config.kmeans.clone());
        let model_path = trainer.train(&standardized, k)?;

        let predictor = ClusterPredictor::new(self.config.store.clone());
        let labeled = predictor.predict(records, &standardized, &model_path)?;

        let projection = project(&standardized, DEFAULT_COMPONENTS)?;
        let data = labeled
            .records
            .with_column(Series::new(PC1_COLUMN, projection.component_values(0)))?
            .with_column(Series::new(PC2_COLUMN, projection.component_values(1)))?;

        let summary = SegmentSummary::from_labels(labeled.labels.iter().copied());
        info!(segments = summary.len(), model = %model_path, "clustering segmentation complete");

        Ok(ClusterSegmentation {
            data,
            labels: labeled.labels,
            summary,
            projection,
            model_path,
        })
    }
}

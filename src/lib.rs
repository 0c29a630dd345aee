//! SegmentForge: customer segmentation by threshold rules or K-Means clustering
//!
//! Records are loaded from CSV into a Polars data frame. Rule-based
//! segmentation labels each customer from raw income and spending.
//! Clustering-based segmentation standardizes age, income and spending,
//! trains a K-Means model that is persisted to a single model file, assigns
//! each customer to its nearest centroid and adds a two-component PCA
//! projection for plotting.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod explain;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod projection;
pub mod rules;
pub mod segment;

// Re-export public items for easier access
pub use config::{KMeansConfig, ModelStore, SegmentationConfig};
pub use data::{
    RecordSet, AGE, ANNUAL_INCOME, FEATURE_COLUMNS, ML_SEGMENT_COLUMN, PC1_COLUMN, PC2_COLUMN,
    RULE_SEGMENT_COLUMN, SPENDING_SCORE,
};
pub use error::{Result, SegmentError};
pub use explain::{
    explain_segments, generate_segment_explanations, SegmentExplanation, SegmentProfile,
};
pub use model::{ClusterPredictor, ClusterTrainer, ClusteringModel, ModelHandle};
pub use pipeline::{ClusterSegmentation, RuleSegmentation, Segmenter};
pub use preprocess::{standardize, FeatureStats, StandardizedRecordSet};
pub use projection::{project, ProjectedPoint, Projection, DEFAULT_COMPONENTS};
pub use rules::{classify, classify_record};
pub use segment::{Labeled, RuleSegment, SegmentLabel, SegmentSummary};

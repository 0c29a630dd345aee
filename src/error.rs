//! Error taxonomy for the segmentation pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by every stage of the segmentation pipeline.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// A column the pipeline depends on is absent from the dataset.
    #[error("missing required column `{column}`")]
    MissingColumn {
        /// Name of the absent column.
        column: String,
    },

    /// A clustering model was applied to data with a different feature schema.
    #[error("feature schema mismatch: model expects {expected:?}, data has {found:?}")]
    SchemaMismatch {
        /// Feature columns recorded in the model.
        expected: Vec<String>,
        /// Feature columns of the data passed in.
        found: Vec<String>,
    },

    /// No usable model exists at the requested location.
    #[error("cannot load model from {}: {reason}", path.display())]
    ModelLoad {
        /// Location that was read.
        path: PathBuf,
        /// Why the artifact was rejected.
        reason: String,
    },

    /// A caller supplied an out-of-range parameter.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// A feature column cannot be standardized or projected.
    #[error("degenerate feature column `{column}`: {reason}")]
    DegenerateInput {
        /// Offending column.
        column: String,
        /// What makes it degenerate.
        reason: &'static str,
    },

    /// Two record sets that must be row-aligned have different lengths.
    #[error("row count mismatch: original has {original} rows, standardized has {standardized}")]
    RowCountMismatch {
        /// Rows in the unscaled set.
        original: usize,
        /// Rows in the standardized set.
        standardized: usize,
    },

    #[error("clustering failed: {0}")]
    Clustering(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data frame error: {0}")]
    Frame(#[from] polars::error::PolarsError),

    #[error("model serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SegmentError {
    pub(crate) fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    pub(crate) fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, SegmentError>;

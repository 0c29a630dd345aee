//! K-Means training, persistence and nearest-centroid prediction

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1};
use polars::prelude::{NamedFrom, Series};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{KMeansConfig, ModelStore};
use crate::data::{RecordSet, ML_SEGMENT_COLUMN};
use crate::error::{Result, SegmentError};
use crate::preprocess::StandardizedRecordSet;
use crate::segment::Labeled;

/// Smallest cluster count accepted by the trainer.
pub const MIN_CLUSTERS: usize = 2;

/// Location of a persisted clustering model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelHandle {
    path: PathBuf,
}

impl ModelHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Fitted K-Means state as stored on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusteringModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Feature columns the centroids are expressed in, in order
    pub features: Vec<String>,
    /// Cluster centroids in standardized space, one row per cluster
    pub centroids: Vec<Vec<f64>>,
    /// Within-cluster sum of squares on the training data
    pub inertia: f64,
}

impl ClusteringModel {
    /// Predict the cluster of one standardized row.
    ///
    /// Ties resolve to the lowest cluster id.
    pub fn predict_row(&self, features: ArrayView1<'_, f64>) -> usize {
        let mut min_distance = f64::INFINITY;
        let mut closest_cluster = 0;

        for (cluster_idx, centroid) in self.centroids.iter().enumerate() {
            let distance = euclidean_distance(features, centroid);
            if distance < min_distance {
                min_distance = distance;
                closest_cluster = cluster_idx;
            }
        }

        closest_cluster
    }

    /// Predict a cluster for every row. The data must carry exactly the
    /// model's feature columns.
    pub fn predict(&self, data: &StandardizedRecordSet) -> Result<Vec<usize>> {
        if data.columns() != self.features.as_slice() {
            return Err(SegmentError::SchemaMismatch {
                expected: self.features.clone(),
                found: data.columns().to_vec(),
            });
        }

        Ok(data
            .features()
            .outer_iter()
            .map(|row| self.predict_row(row))
            .collect())
    }

    /// Read and validate a model artifact.
    pub fn load(handle: &ModelHandle) -> Result<Self> {
        let path = handle.path();
        let bytes =
            fs::read(path).map_err(|err| SegmentError::model_load(path, err.to_string()))?;
        let model: ClusteringModel = serde_json::from_slice(&bytes)
            .map_err(|err| SegmentError::model_load(path, format!("corrupt artifact: {}", err)))?;
        model
            .validate()
            .map_err(|reason| SegmentError::model_load(path, reason))?;

        debug!(path = %path.display(), k = model.n_clusters, "loaded clustering model");
        Ok(model)
    }

    /// Write the artifact, replacing whatever is at `path`.
    ///
    /// The bytes go to a sibling temporary file first so a reader never sees a
    /// half-written model.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        let staging = staging_path(path);
        let written = fs::write(&staging, bytes).and_then(|()| fs::rename(&staging, path));
        if let Err(err) = written {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        Ok(())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.n_clusters < MIN_CLUSTERS {
            return Err(format!("cluster count {} is below {}", self.n_clusters, MIN_CLUSTERS));
        }
        if self.centroids.len() != self.n_clusters {
            return Err(format!(
                "expected {} centroids, found {}",
                self.n_clusters,
                self.centroids.len()
            ));
        }
        if self.features.is_empty() {
            return Err("empty feature schema".to_string());
        }
        if let Some(bad) = self
            .centroids
            .iter()
            .find(|centroid| centroid.len() != self.features.len())
        {
            return Err(format!(
                "centroid has {} coordinates for {} features",
                bad.len(),
                self.features.len()
            ));
        }
        if self.centroids.iter().flatten().any(|value| !value.is_finite()) {
            return Err("non-finite centroid coordinate".to_string());
        }
        Ok(())
    }
}

/// Fits K-Means and writes the result to the configured model store.
#[derive(Clone, Debug)]
pub struct ClusterTrainer {
    store: ModelStore,
    params: KMeansConfig,
}

impl ClusterTrainer {
    pub fn new(store: ModelStore, params: KMeansConfig) -> Self {
        Self { store, params }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Fit a model without persisting it.
    ///
    /// `n_init` seeded k-means++ initializations are run and the one with the
    /// lowest inertia is kept.
    pub fn fit(
        &self,
        data: &StandardizedRecordSet,
        n_clusters: usize,
    ) -> Result<ClusteringModel> {
        self.check_params(data, n_clusters)?;

        let n_samples = data.len();
        // Dummy targets for unsupervised learning
        let targets: Array1<usize> = Array1::zeros(n_samples);
        let dataset = Dataset::new(data.features().clone(), targets);

        let rng = StdRng::seed_from_u64(self.params.seed);
        let fitted: KMeans<f64, L2Dist> = KMeans::params_with(n_clusters, rng, L2Dist)
            .n_runs(self.params.n_init)
            .max_n_iterations(self.params.max_iterations)
            .tolerance(self.params.tolerance)
            .fit(&dataset)
            .map_err(|err| SegmentError::Clustering(err.to_string()))?;

        let centroids: Vec<Vec<f64>> = fitted
            .centroids()
            .outer_iter()
            .map(|centroid| centroid.to_vec())
            .collect();

        let mut model = ClusteringModel {
            n_clusters,
            features: data.columns().to_vec(),
            centroids,
            inertia: 0.0,
        };
        model.inertia = compute_inertia(data.features(), &model);

        info!(k = n_clusters, inertia = model.inertia, "fitted k-means model");
        Ok(model)
    }

    /// Fit a model and persist it as the active model.
    pub fn train(&self, data: &StandardizedRecordSet, n_clusters: usize) -> Result<ModelHandle> {
        let model = self.fit(data, n_clusters)?;
        self.persist(&model)
    }

    /// Write `model` to the store, creating the directory if needed.
    pub fn persist(&self, model: &ClusteringModel) -> Result<ModelHandle> {
        fs::create_dir_all(&self.store.dir)?;
        let handle = self.store.handle();
        model.save(handle.path())?;

        info!(path = %handle, "saved clustering model");
        Ok(handle)
    }

    fn check_params(&self, data: &StandardizedRecordSet, n_clusters: usize) -> Result<()> {
        if n_clusters < MIN_CLUSTERS {
            return Err(SegmentError::invalid_parameter(
                "k",
                format!("need at least {} clusters, got {}", MIN_CLUSTERS, n_clusters),
            ));
        }

        let distinct = distinct_rows(data.features());
        if n_clusters > distinct {
            return Err(SegmentError::invalid_parameter(
                "k",
                format!(
                    "{} clusters requested but only {} distinct records",
                    n_clusters, distinct
                ),
            ));
        }

        if self.params.n_init == 0 {
            return Err(SegmentError::invalid_parameter(
                "n_init",
                "at least one initialization is required",
            ));
        }
        Ok(())
    }
}

/// Assigns clusters from a persisted model. Never re-fits.
#[derive(Clone, Debug)]
pub struct ClusterPredictor {
    store: ModelStore,
}

impl ClusterPredictor {
    pub fn new(store: ModelStore) -> Self {
        Self { store }
    }

    /// Label each row of `standardized` and attach the labels to `original`
    /// as an `ML_Segment` column, matched by row position.
    pub fn predict(
        &self,
        original: &RecordSet,
        standardized: &StandardizedRecordSet,
        handle: &ModelHandle,
    ) -> Result<Labeled<usize>> {
        if original.len() != standardized.len() {
            return Err(SegmentError::RowCountMismatch {
                original: original.len(),
                standardized: standardized.len(),
            });
        }

        let model = ClusteringModel::load(handle)?;
        let labels = model.predict(standardized)?;

        let ids: Vec<u32> = labels.iter().map(|&label| label as u32).collect();
        let records = original.with_column(Series::new(ML_SEGMENT_COLUMN, ids))?;

        info!(rows = labels.len(), k = model.n_clusters, "assigned clusters");
        Ok(Labeled { records, labels })
    }

    /// Predict with the active model in this predictor's store.
    pub fn predict_active(
        &self,
        original: &RecordSet,
        standardized: &StandardizedRecordSet,
    ) -> Result<Labeled<usize>> {
        self.predict(original, standardized, &self.store.handle())
    }
}

/// Sibling of `path` with `.tmp` appended to the full file name.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(features: &Array2<f64>, model: &ClusteringModel) -> f64 {
    features
        .outer_iter()
        .map(|point| {
            let cluster = model.predict_row(point);
            euclidean_distance(point, &model.centroids[cluster]).powi(2)
        })
        .sum()
}

/// Calculate Euclidean distance between a point and a centroid
fn euclidean_distance(point: ArrayView1<'_, f64>, centroid: &[f64]) -> f64 {
    point
        .iter()
        .zip(centroid.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn distinct_rows(features: &Array2<f64>) -> usize {
    features
        .outer_iter()
        .map(|row| row.iter().map(|value| value.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}

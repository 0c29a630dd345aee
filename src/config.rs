//! Runtime configuration shared by the trainer, predictor and orchestrator

use std::path::{Path, PathBuf};

use crate::model::ModelHandle;

/// Default directory holding the persisted clustering model.
pub const DEFAULT_MODEL_DIR: &str = "models";
/// Default file name of the persisted clustering model.
pub const DEFAULT_MODEL_FILE: &str = "kmeans.json";

/// Location of the single active clustering model.
///
/// Trainer and predictor must be built from the same store to agree on the
/// artifact they exchange. Training and prediction against one store are not
/// synchronized; callers serialize them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelStore {
    /// Directory created on first save.
    pub dir: PathBuf,
    /// Artifact file name inside `dir`.
    pub file_name: String,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_MODEL_DIR),
            file_name: DEFAULT_MODEL_FILE.to_string(),
        }
    }
}

impl ModelStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Full path of the model artifact.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Handle pointing at the well-known artifact, whether or not it exists yet.
    pub fn handle(&self) -> ModelHandle {
        ModelHandle::new(self.path())
    }
}

/// K-Means fitting parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansConfig {
    /// Number of seeded initializations; the lowest-inertia run wins.
    pub n_init: usize,
    /// Iteration cap per initialization.
    pub max_iterations: u64,
    /// Centroid-shift tolerance for convergence.
    pub tolerance: f64,
    /// Seed for the initialization RNG.
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_init: 10,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

impl KMeansConfig {
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Everything the pipeline orchestrator needs to run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentationConfig {
    pub store: ModelStore,
    pub kmeans: KMeansConfig,
}

impl SegmentationConfig {
    pub fn with_store(mut self, store: ModelStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_kmeans(mut self, kmeans: KMeansConfig) -> Self {
        self.kmeans = kmeans;
        self
    }
}

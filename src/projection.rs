//! Principal component projection of standardized features
//!
//! The covariance matrix of the three features is small, so it is
//! diagonalized directly with cyclic Jacobi rotations. No random starting
//! vectors are involved and the output is fully deterministic.

use ndarray::{Array1, Array2, Axis};
use tracing::debug;

use crate::error::{Result, SegmentError};
use crate::preprocess::StandardizedRecordSet;

/// Components kept for the scatter-plot projection.
pub const DEFAULT_COMPONENTS: usize = 2;

const MAX_SWEEPS: usize = 64;
const OFF_DIAGONAL_TOLERANCE: f64 = 1e-24;

/// A row's position on the first two principal components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectedPoint {
    pub pc1: f64,
    pub pc2: f64,
}

/// Result of a principal component projection.
#[derive(Clone, Debug)]
pub struct Projection {
    /// One row per record, one column per component
    coordinates: Array2<f64>,
    /// One row per component, one column per input feature
    components: Array2<f64>,
    explained_variance_ratio: Vec<f64>,
}

impl Projection {
    pub fn coordinates(&self) -> &Array2<f64> {
        &self.coordinates
    }

    /// Unit-length component directions, strongest first.
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    /// Share of total variance captured by each kept component.
    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }

    pub fn dims(&self) -> usize {
        self.components.nrows()
    }

    pub fn len(&self) -> usize {
        self.coordinates.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of every record on component `index` (zero-based).
    pub fn component_values(&self, index: usize) -> Vec<f64> {
        self.coordinates.column(index).to_vec()
    }

    /// Column names for the kept components: `PC1`, `PC2`, ...
    pub fn component_names(&self) -> Vec<String> {
        (1..=self.dims()).map(|i| format!("PC{}", i)).collect()
    }

    /// Per-record points on the first two components. `pc2` is zero for a
    /// one-dimensional projection.
    pub fn points(&self) -> Vec<ProjectedPoint> {
        self.coordinates
            .outer_iter()
            .map(|row| ProjectedPoint {
                pc1: row[0],
                pc2: row.get(1).copied().unwrap_or(0.0),
            })
            .collect()
    }
}

/// Project `data` onto its `dims` directions of largest variance.
///
/// Each component is oriented so that its largest-magnitude loading is
/// positive.
pub fn project(data: &StandardizedRecordSet, dims: usize) -> Result<Projection> {
    let n_features = data.n_features();
    let n_samples = data.len();

    if dims == 0 || dims > n_features {
        return Err(SegmentError::invalid_parameter(
            "dims",
            format!("must be between 1 and {} features, got {}", n_features, dims),
        ));
    }
    if dims > n_samples {
        return Err(SegmentError::invalid_parameter(
            "dims",
            format!("{} components requested from {} records", dims, n_samples),
        ));
    }

    let features = data.features();
    let mean = features
        .mean_axis(Axis(0))
        .ok_or_else(|| SegmentError::invalid_parameter("dims", "no records to project"))?;
    let centered = features - &mean;

    let denominator = n_samples.saturating_sub(1).max(1) as f64;
    let covariance = centered.t().dot(&centered) / denominator;
    let (eigenvalues, eigenvectors) = symmetric_eigen(covariance);

    let mut order: Vec<usize> = (0..n_features).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

    let total_variance: f64 = eigenvalues.iter().map(|v| v.max(0.0)).sum();
    let mut components = Array2::<f64>::zeros((dims, n_features));
    let mut explained_variance_ratio = Vec::with_capacity(dims);

    for (row, &index) in order.iter().take(dims).enumerate() {
        let mut direction = eigenvectors.column(index).to_owned();
        let pivot = direction
            .iter()
            .copied()
            .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
        if pivot < 0.0 {
            direction.mapv_inplace(|v| -v);
        }
        components.row_mut(row).assign(&direction);

        let ratio = if total_variance > 0.0 {
            eigenvalues[index].max(0.0) / total_variance
        } else {
            0.0
        };
        explained_variance_ratio.push(ratio);
    }

    let coordinates = centered.dot(&components.t());
    debug!(dims, ?explained_variance_ratio, "projected features");

    Ok(Projection {
        coordinates,
        components,
        explained_variance_ratio,
    })
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues and a matrix whose columns are the matching unit
/// eigenvectors, in no particular order.
fn symmetric_eigen(mut a: Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::<f64>::eye(n);

    for _ in 0..MAX_SWEEPS {
        let off_diagonal: f64 = (0..n)
            .flat_map(|p| (0..n).filter(move |&q| q != p).map(move |q| (p, q)))
            .map(|(p, q)| a[[p, q]].powi(2))
            .sum();
        if off_diagonal < OFF_DIAGONAL_TOLERANCE {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    (a.diag().to_owned(), v)
}

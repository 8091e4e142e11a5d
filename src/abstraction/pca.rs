//! Principal component analysis over feature vectors.
//!
//! The reducer accumulates samples, freezes a [`Basis`] once, and then
//! projects any vector onto the top-K directions of maximum variance.
//!
//! Numeric policy:
//! - the covariance gets a `1e-9` ridge so constant feature columns never
//!   make the decomposition fail
//! - directions are sorted by descending eigenvalue with a stable sort, so
//!   ties keep the decomposition's order
//! - each direction is flipped so its largest-magnitude component is
//!   positive (first such component on ties)

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result, types::ReducedVector};

/// Ridge added to the covariance diagonal.
const COVARIANCE_RIDGE: f64 = 1e-9;

/// Tolerance accepted when validating an imported basis.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Frozen PCA basis: training mean plus K orthonormal directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Basis {
    mean: Vec<f64>,
    directions: Vec<Vec<f64>>,
    eigenvalues: Vec<f64>,
}

impl Basis {
    /// Assemble a basis from parts, checking shapes and orthonormality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if the directions do not match the mean's
    /// dimension or are not orthonormal within [`ORTHONORMAL_TOLERANCE`].
    pub fn from_parts(
        mean: Vec<f64>,
        directions: Vec<Vec<f64>>,
        eigenvalues: Vec<f64>,
    ) -> Result<Self> {
        let basis = Self {
            mean,
            directions,
            eigenvalues,
        };
        basis.validate()?;
        Ok(basis)
    }

    /// Number of components (K).
    pub fn components(&self) -> usize {
        self.directions.len()
    }

    /// Dimension of the input feature space.
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn directions(&self) -> &[Vec<f64>] {
        &self.directions
    }

    /// Variance captured by each direction.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Centre `vector` on the training mean and project it onto the directions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `vector` has the wrong length.
    pub fn project(&self, vector: &[f64]) -> Result<ReducedVector> {
        if vector.len() != self.mean.len() {
            return Err(Error::DimensionMismatch {
                expected: self.mean.len(),
                got: vector.len(),
            });
        }
        Ok(self
            .directions
            .iter()
            .map(|direction| {
                vector
                    .iter()
                    .zip(&self.mean)
                    .zip(direction)
                    .map(|((v, m), d)| (v - m) * d)
                    .sum()
            })
            .collect())
    }

    fn validate(&self) -> Result<()> {
        let dim = self.mean.len();
        if self.directions.iter().any(|d| d.len() != dim) {
            return Err(Error::load("basis", "direction length differs from mean"));
        }
        if self.eigenvalues.len() != self.directions.len() {
            return Err(Error::load("basis", "eigenvalue count differs from directions"));
        }
        for (i, a) in self.directions.iter().enumerate() {
            if (dot(a, a).sqrt() - 1.0).abs() > ORTHONORMAL_TOLERANCE {
                return Err(Error::load("basis", format!("direction {i} is not unit length")));
            }
            for (j, b) in self.directions.iter().enumerate().skip(i + 1) {
                if dot(a, b).abs() > ORTHONORMAL_TOLERANCE {
                    return Err(Error::load(
                        "basis",
                        format!("directions {i} and {j} are not orthogonal"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// PCA reducer with an accumulate-then-freeze lifecycle.
#[derive(Debug, Clone, Default)]
pub struct Pca {
    samples: Vec<Vec<f64>>,
    dimension: Option<usize>,
    basis: Option<Basis>,
}

impl Pca {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reducer that is already frozen on `basis`.
    pub fn from_basis(basis: Basis) -> Self {
        Self {
            samples: Vec::new(),
            dimension: Some(basis.dimension()),
            basis: Some(basis),
        }
    }

    /// Accumulate one training sample.
    ///
    /// # Errors
    ///
    /// - [`Error::Capacity`] once the basis has been computed
    /// - [`Error::DimensionMismatch`] if the length differs from earlier samples
    pub fn add_sample(&mut self, sample: &[f64]) -> Result<()> {
        if self.basis.is_some() {
            return Err(Error::Capacity {
                component: "PCA".to_string(),
                message: "samples cannot be added after the basis is computed".to_string(),
            });
        }
        match self.dimension {
            Some(expected) if expected != sample.len() => {
                return Err(Error::DimensionMismatch {
                    expected,
                    got: sample.len(),
                });
            }
            Some(_) => {}
            None => self.dimension = Some(sample.len()),
        }
        self.samples.push(sample.to_vec());
        Ok(())
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_trained(&self) -> bool {
        self.basis.is_some()
    }

    pub fn basis(&self) -> Option<&Basis> {
        self.basis.as_ref()
    }

    /// Compute and freeze the top-`k` basis from the accumulated samples.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfiguration`] if `k == 0`
    /// - [`Error::InsufficientData`] with fewer than `k + 1` samples or
    ///   `k` above the feature dimension
    /// - [`Error::Capacity`] if the basis was already computed
    pub fn compute_basis(&mut self, k: usize) -> Result<&Basis> {
        if self.basis.is_some() {
            return Err(Error::Capacity {
                component: "PCA".to_string(),
                message: "basis already computed".to_string(),
            });
        }
        if k == 0 {
            return Err(Error::invalid_config("PCA needs at least one component"));
        }
        let n = self.samples.len();
        if n < k + 1 {
            return Err(Error::InsufficientData {
                operation: "PCA basis".to_string(),
                required: k + 1,
                available: n,
            });
        }
        let dim = self.dimension.unwrap_or(0);
        if k > dim {
            return Err(Error::InsufficientData {
                operation: "PCA components".to_string(),
                required: k,
                available: dim,
            });
        }

        let mut mean = vec![0.0; dim];
        for sample in &self.samples {
            for (m, v) in mean.iter_mut().zip(sample) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n as f64);

        let centered = DMatrix::from_fn(n, dim, |i, j| self.samples[i][j] - mean[j]);
        let mut covariance = centered.transpose() * &centered / (n - 1) as f64;
        for i in 0..dim {
            covariance[(i, i)] += COVARIANCE_RIDGE;
        }

        let eigen = SymmetricEigen::new(covariance);
        let mut order: Vec<usize> = (0..dim).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut directions: Vec<Vec<f64>> = Vec::with_capacity(k);
        let mut eigenvalues = Vec::with_capacity(k);
        for &idx in order.iter().take(k) {
            let mut direction: Vec<f64> = eigen.eigenvectors.column(idx).iter().copied().collect();
            orthonormalize(&mut direction, &directions);
            fix_sign(&mut direction);
            directions.push(direction);
            eigenvalues.push((eigen.eigenvalues[idx] - COVARIANCE_RIDGE).max(0.0));
        }

        debug!(
            samples = n,
            dimension = dim,
            components = k,
            leading_variance = eigenvalues.first().copied().unwrap_or(0.0),
            "PCA basis computed"
        );

        self.samples = Vec::new();
        Ok(&*self.basis.insert(Basis {
            mean,
            directions,
            eigenvalues,
        }))
    }

    /// Project a vector onto the frozen basis.
    ///
    /// # Errors
    ///
    /// - [`Error::NotTrained`] before [`Pca::compute_basis`]
    /// - [`Error::DimensionMismatch`] on a wrong-length vector
    pub fn project(&self, vector: &[f64]) -> Result<ReducedVector> {
        self.basis
            .as_ref()
            .ok_or_else(|| Error::not_trained("PCA"))?
            .project(vector)
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Gram-Schmidt against the directions already accepted, then normalise.
fn orthonormalize(direction: &mut [f64], previous: &[Vec<f64>]) {
    for prev in previous {
        let overlap = dot(direction, prev);
        for (d, p) in direction.iter_mut().zip(prev) {
            *d -= overlap * p;
        }
    }
    let norm = dot(direction, direction).sqrt();
    if norm > 0.0 {
        direction.iter_mut().for_each(|d| *d /= norm);
    }
}

fn fix_sign(direction: &mut [f64]) {
    let mut pivot = 0;
    for (i, value) in direction.iter().enumerate() {
        if value.abs() > direction[pivot].abs() {
            pivot = i;
        }
    }
    if direction.get(pivot).is_some_and(|v| *v < 0.0) {
        direction.iter_mut().for_each(|d| *d = -*d);
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn random_samples(n: usize, dim: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| (0..dim).map(|_| rng.random::<f64>()).collect())
            .collect()
    }

    fn trained(samples: &[Vec<f64>], k: usize) -> Pca {
        let mut pca = Pca::new();
        for sample in samples {
            pca.add_sample(sample).unwrap();
        }
        pca.compute_basis(k).unwrap();
        pca
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let pca = trained(&random_samples(40, 8, 3), 5);
        let basis = pca.basis().unwrap();
        for (i, a) in basis.directions().iter().enumerate() {
            assert!((dot(a, a).sqrt() - 1.0).abs() < 1e-6);
            for b in basis.directions().iter().skip(i + 1) {
                assert!(dot(a, b).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_eigenvalues_descend() {
        let pca = trained(&random_samples(40, 6, 5), 6);
        let values = pca.basis().unwrap().eigenvalues();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_dominant_direction_recovered_with_positive_sign() {
        // Points spread along (1, 1) with tiny noise across it.
        let samples: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let t = i as f64 - 10.0;
                let noise = if i % 2 == 0 { 0.01 } else { -0.01 };
                vec![t + noise, t - noise]
            })
            .collect();
        let pca = trained(&samples, 1);
        let direction = &pca.basis().unwrap().directions()[0];
        let expected = 1.0 / 2f64.sqrt();
        assert!((direction[0] - expected).abs() < 1e-3);
        assert!((direction[1] - expected).abs() < 1e-3);
    }

    #[test]
    fn test_projection_is_deterministic() {
        let samples = random_samples(30, 7, 11);
        let pca = trained(&samples, 3);
        for sample in &samples {
            let first = pca.project(sample).unwrap();
            let second = pca.project(sample).unwrap();
            assert_eq!(
                first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
                second.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_mean_projects_to_origin() {
        let samples = random_samples(25, 4, 17);
        let pca = trained(&samples, 2);
        let mean = pca.basis().unwrap().mean().to_vec();
        let projected = pca.project(&mean).unwrap();
        assert!(projected.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_constant_column_is_regularized() {
        let mut samples = random_samples(20, 5, 23);
        for sample in &mut samples {
            sample[2] = 1.0;
        }
        let pca = trained(&samples, 5);
        assert_eq!(pca.basis().unwrap().components(), 5);
    }

    #[test]
    fn test_insufficient_samples() {
        let mut pca = Pca::new();
        for sample in random_samples(3, 5, 1) {
            pca.add_sample(&sample).unwrap();
        }
        assert!(matches!(
            pca.compute_basis(3),
            Err(Error::InsufficientData {
                required: 4,
                available: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_too_many_components() {
        let mut pca = Pca::new();
        for sample in random_samples(10, 3, 1) {
            pca.add_sample(&sample).unwrap();
        }
        assert!(matches!(
            pca.compute_basis(4),
            Err(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_add_after_freeze_is_capacity_error() {
        let samples = random_samples(10, 3, 1);
        let mut pca = trained(&samples, 2);
        assert!(matches!(
            pca.add_sample(&samples[0]),
            Err(Error::Capacity { .. })
        ));
    }

    #[test]
    fn test_project_before_training() {
        let pca = Pca::new();
        assert!(matches!(
            pca.project(&[0.0, 1.0]),
            Err(Error::NotTrained { .. })
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut pca = Pca::new();
        pca.add_sample(&[1.0, 2.0]).unwrap();
        assert!(matches!(
            pca.add_sample(&[1.0]),
            Err(Error::DimensionMismatch {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_from_parts_rejects_non_orthogonal() {
        let result = Basis::from_parts(
            vec![0.0, 0.0],
            vec![vec![1.0, 0.0], vec![1.0, 0.0]],
            vec![1.0, 1.0],
        );
        assert!(matches!(result, Err(Error::Load { .. })));
    }
}

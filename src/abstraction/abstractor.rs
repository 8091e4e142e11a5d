//! State abstraction: PCA + clustering + projection cache.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    cache::{CacheKey, CacheStats, ProjectionCache},
    clustering::{KMeans, Prototype, centroids, nearest_index},
    codebook::SavedCodebook,
    pca::{Basis, Pca},
};
use crate::{Error, Result, types::ReducedVector};

/// How projected training vectors become prototypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterMode {
    /// Every projected training vector is its own prototype.
    Exact,
    /// k-means with this many clusters.
    KMeans { clusters: usize },
}

impl ClusterMode {
    /// Negative counts select [`ClusterMode::Exact`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for a count of zero.
    pub fn from_count(count: i64) -> Result<Self> {
        match count {
            c if c < 0 => Ok(ClusterMode::Exact),
            0 => Err(Error::invalid_config(
                "cluster count must be positive, or negative for exact mode",
            )),
            c => Ok(ClusterMode::KMeans {
                clusters: c as usize,
            }),
        }
    }
}

/// State abstraction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbstractionConfig {
    /// Number of PCA components
    pub components: usize,
    /// Cluster count; negative selects exact mode
    pub clusters: i64,
    /// k-means iteration cap
    pub iterations: usize,
    /// Seed for k-means initialisation
    pub seed: Option<u64>,
    /// Bound on the projection cache; `None` keeps it unbounded
    pub cache_capacity: Option<usize>,
}

impl Default for AbstractionConfig {
    fn default() -> Self {
        Self {
            components: 8,
            clusters: 64,
            iterations: 100,
            seed: None,
            cache_capacity: None,
        }
    }
}

/// Maps feature vectors to abstract state ids.
///
/// Trained once; the basis and codebook are read-only afterwards, which is
/// what lets the projection cache stay valid for the rest of the run.
/// Re-training is not supported: build a new abstractor instead.
#[derive(Debug)]
pub struct StateAbstractor {
    config: AbstractionConfig,
    reducer: Pca,
    codebook: Vec<Prototype>,
    cache: ProjectionCache,
}

impl StateAbstractor {
    pub fn new(config: AbstractionConfig) -> Self {
        Self {
            reducer: Pca::new(),
            codebook: Vec::new(),
            cache: ProjectionCache::new(config.cache_capacity),
            config,
        }
    }

    /// Rebuild a trained abstractor from a persisted codebook.
    ///
    /// # Errors
    ///
    /// - [`Error::Load`] if the codebook fails validation
    /// - [`Error::InvalidConfiguration`] for a cache capacity of zero
    pub fn from_codebook(saved: SavedCodebook, cache_capacity: Option<usize>) -> Result<Self> {
        saved.validate()?;
        if cache_capacity == Some(0) {
            return Err(Error::invalid_config("cache capacity must be positive"));
        }
        let config = AbstractionConfig {
            components: saved.basis.components(),
            clusters: saved.prototypes.len() as i64,
            cache_capacity,
            ..AbstractionConfig::default()
        };
        Ok(Self {
            reducer: Pca::from_basis(saved.basis),
            codebook: saved.prototypes,
            cache: ProjectionCache::new(cache_capacity),
            config,
        })
    }

    pub fn config(&self) -> &AbstractionConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        !self.codebook.is_empty()
    }

    pub fn codebook(&self) -> &[Prototype] {
        &self.codebook
    }

    /// Number of abstract states.
    pub fn codebook_size(&self) -> usize {
        self.codebook.len()
    }

    pub fn basis(&self) -> Option<&Basis> {
        self.reducer.basis()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Fit PCA and the codebook on `batch`.
    ///
    /// Nothing is committed unless every stage succeeds, so an
    /// [`Error::InsufficientData`] can be retried with a larger batch.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyTrained`] on a second call
    /// - [`Error::InvalidConfiguration`] for a zero cluster count
    /// - [`Error::InsufficientData`] / [`Error::DimensionMismatch`] from the stages
    pub fn train<V: AsRef<[f64]>>(&mut self, batch: &[V]) -> Result<()> {
        if self.is_trained() {
            return Err(Error::AlreadyTrained {
                component: "state abstractor".to_string(),
            });
        }
        let mode = ClusterMode::from_count(self.config.clusters)?;

        let mut reducer = Pca::new();
        for vector in batch {
            reducer.add_sample(vector.as_ref())?;
        }
        reducer.compute_basis(self.config.components)?;

        let projections = batch
            .iter()
            .map(|vector| reducer.project(vector.as_ref()))
            .collect::<Result<Vec<ReducedVector>>>()?;

        let codebook = match mode {
            ClusterMode::Exact => projections
                .into_iter()
                .enumerate()
                .map(|(index, centroid)| Prototype { index, centroid })
                .collect(),
            ClusterMode::KMeans { clusters } => {
                let mut kmeans = KMeans::new(clusters, self.config.iterations);
                if let Some(seed) = self.config.seed {
                    kmeans = kmeans.with_seed(seed);
                }
                centroids(&kmeans.cluster(&projections)?)?
            }
        };

        info!(
            batch = batch.len(),
            components = self.config.components,
            prototypes = codebook.len(),
            exact = mode == ClusterMode::Exact,
            "state abstraction trained"
        );

        self.reducer = reducer;
        self.codebook = codebook;
        Ok(())
    }

    /// Project a feature vector into the reduced space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotTrained`] before [`StateAbstractor::train`].
    pub fn project(&self, features: &[f64]) -> Result<ReducedVector> {
        self.reducer.project(features)
    }

    /// Abstract state id of a feature vector.
    ///
    /// Each distinct quantized projection costs at most one nearest-prototype
    /// search while it stays cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotTrained`] before [`StateAbstractor::train`].
    pub fn resolve(&mut self, features: &[f64]) -> Result<usize> {
        if !self.is_trained() {
            return Err(Error::not_trained("state abstractor"));
        }
        let projection = self.reducer.project(features)?;
        let key = CacheKey::quantize(&projection);
        if let Some(index) = self.cache.get(&key) {
            return Ok(index);
        }
        let index = nearest_index(&projection, &self.codebook)?;
        debug!(state = index, cached = self.cache.len(), "resolved new projection");
        self.cache.insert(key, index);
        Ok(index)
    }

    /// Prototype a feature vector resolves to.
    ///
    /// # Errors
    ///
    /// Same as [`StateAbstractor::resolve`].
    pub fn resolve_prototype(&mut self, features: &[f64]) -> Result<&Prototype> {
        let index = self.resolve(features)?;
        Ok(&self.codebook[index])
    }

    /// Snapshot the basis and codebook for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotTrained`] before training.
    pub fn export_codebook(&self) -> Result<SavedCodebook> {
        let basis = self
            .reducer
            .basis()
            .filter(|_| self.is_trained())
            .ok_or_else(|| Error::not_trained("state abstractor"))?;
        Ok(SavedCodebook::new(basis.clone(), self.codebook.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Vec<Vec<f64>> {
        (0..30)
            .map(|i| {
                let t = (i % 3) as f64 * 5.0;
                let wiggle = (i as f64) * 0.01;
                vec![t + wiggle, t - wiggle, (i % 2) as f64, 1.0]
            })
            .collect()
    }

    fn config(clusters: i64) -> AbstractionConfig {
        AbstractionConfig {
            components: 2,
            clusters,
            iterations: 50,
            seed: Some(1),
            cache_capacity: None,
        }
    }

    #[test]
    fn test_resolve_before_train() {
        let mut abstractor = StateAbstractor::new(config(3));
        assert!(matches!(
            abstractor.resolve(&[0.0, 0.0, 0.0, 0.0]),
            Err(Error::NotTrained { .. })
        ));
    }

    #[test]
    fn test_train_twice_fails() {
        let mut abstractor = StateAbstractor::new(config(3));
        abstractor.train(&batch()).unwrap();
        assert!(matches!(
            abstractor.train(&batch()),
            Err(Error::AlreadyTrained { .. })
        ));
    }

    #[test]
    fn test_failed_train_can_retry() {
        let mut abstractor = StateAbstractor::new(config(3));
        let small = &batch()[..2];
        assert!(matches!(
            abstractor.train(small),
            Err(Error::InsufficientData { .. })
        ));
        abstractor.train(&batch()).unwrap();
        assert_eq!(abstractor.codebook_size(), 3);
    }

    #[test]
    fn test_exact_mode_codebook_is_batch_sized() {
        let mut abstractor = StateAbstractor::new(config(-1));
        let data = batch();
        abstractor.train(&data).unwrap();
        assert_eq!(abstractor.codebook_size(), data.len());
        assert_eq!(abstractor.resolve(&data[4]).unwrap(), 4);
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let mut abstractor = StateAbstractor::new(config(0));
        assert!(matches!(
            abstractor.train(&batch()),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_cache_counts_duplicates() {
        let mut abstractor = StateAbstractor::new(config(3));
        let data = batch();
        abstractor.train(&data).unwrap();
        let first = abstractor.resolve(&data[0]).unwrap();
        for _ in 0..4 {
            assert_eq!(abstractor.resolve(&data[0]).unwrap(), first);
        }
        let stats = abstractor.cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 4);
    }

    #[test]
    fn test_codebook_roundtrip_resolves_identically() {
        let mut abstractor = StateAbstractor::new(config(3));
        let data = batch();
        abstractor.train(&data).unwrap();
        let saved = abstractor.export_codebook().unwrap();
        let bytes = saved.to_bytes().unwrap();
        let mut restored =
            StateAbstractor::from_codebook(SavedCodebook::from_bytes(&bytes).unwrap(), None)
                .unwrap();
        for vector in &data {
            assert_eq!(
                abstractor.resolve(vector).unwrap(),
                restored.resolve(vector).unwrap()
            );
        }
    }

    #[test]
    fn test_export_before_train_fails() {
        let abstractor = StateAbstractor::new(config(3));
        assert!(abstractor.export_codebook().is_err());
    }
}

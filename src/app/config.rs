//! Configuration types for agent creation.

use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    abstraction::{AbstractionConfig, ClusterMode},
    adapters::LevelConfig,
    features::ExtractorConfig,
    pipeline::TrainingConfig,
    q_learning::{GreedyFloor, LearningParams},
};

/// Full configuration surface of a learning agent and its training run.
///
/// This type provides a builder-style API and loads from JSON; missing
/// fields fall back to their defaults.
///
/// # Examples
///
/// ```
/// use platformer_q::app::AgentConfig;
///
/// let config = AgentConfig::new()
///     .with_seed(42)
///     .with_components(6)
///     .with_clusters(32)
///     .with_epsilon(0.05);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Observation window and reward shaping
    pub extractor: ExtractorConfig,
    /// PCA and clustering settings
    pub abstraction: AbstractionConfig,
    /// Q-learning hyperparameters
    pub learning: LearningParams,
    /// Batch collection and episode counts
    pub training: TrainingConfig,
    /// Synthetic level used by the CLI
    pub level: LevelConfig,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl AgentConfig {
    /// Create a configuration with default values everywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|source| Error::Io {
            operation: format!("open config {}", path.as_ref().display()),
            source,
        })?;
        let config: AgentConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Write this configuration as pretty-printed JSON.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).map_err(|source| Error::Io {
            operation: format!("create config {}", path.as_ref().display()),
            source,
        })?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Check cross-field constraints before anything is built.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        self.learning.validate()?;
        let mode = ClusterMode::from_count(self.abstraction.clusters)?;
        if self.extractor.half_width == 0 {
            return Err(Error::invalid_config("observation half-width must be positive"));
        }
        let features = self.extractor.feature_len();
        if self.abstraction.components == 0 || self.abstraction.components > features {
            return Err(Error::invalid_config(format!(
                "components must be within 1..={features}, got {}",
                self.abstraction.components
            )));
        }
        if matches!(mode, ClusterMode::KMeans { .. }) && self.abstraction.iterations == 0 {
            return Err(Error::invalid_config("clustering needs at least one iteration"));
        }
        if self.abstraction.cache_capacity == Some(0) {
            return Err(Error::invalid_config(
                "cache capacity must be positive; omit it for an unbounded cache",
            ));
        }
        if self.training.batch_size <= self.abstraction.components {
            return Err(Error::invalid_config(format!(
                "batch size {} cannot fit {} components",
                self.training.batch_size, self.abstraction.components
            )));
        }
        Ok(())
    }

    /// Set the random seed for deterministic behavior.
    ///
    /// The seed is propagated to clustering, exploration, batch collection
    /// and level generation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self.abstraction.seed = Some(seed);
        self.training.seed = Some(seed);
        self.level.seed = seed;
        self
    }

    /// Set the observation window half-width.
    pub fn with_half_width(mut self, half_width: usize) -> Self {
        self.extractor.half_width = half_width;
        self
    }

    /// Set the number of PCA components.
    pub fn with_components(mut self, components: usize) -> Self {
        self.abstraction.components = components;
        self
    }

    /// Set the cluster count; negative selects exact mode.
    pub fn with_clusters(mut self, clusters: i64) -> Self {
        self.abstraction.clusters = clusters;
        self
    }

    pub fn with_cluster_iterations(mut self, iterations: usize) -> Self {
        self.abstraction.iterations = iterations;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.abstraction.cache_capacity = Some(capacity);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.learning.epsilon = epsilon;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.learning.alpha = alpha;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.learning.gamma = gamma;
        self
    }

    pub fn with_initial_value(mut self, initial_value: f64) -> Self {
        self.learning.initial_value = initial_value;
        self
    }

    pub fn with_greedy_floor(mut self, floor: GreedyFloor) -> Self {
        self.learning.greedy_floor = floor;
        self
    }

    pub fn with_episodes(mut self, episodes: usize) -> Self {
        self.training.episodes = episodes;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.training.batch_size = batch_size;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.training.max_steps = max_steps;
        self
    }
}

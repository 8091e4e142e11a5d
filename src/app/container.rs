//! Dependency injection container for the platformer agent application.
//!
//! This module provides centralized dependency management following hexagonal
//! architecture principles. The container owns infrastructure dependencies and
//! provides factory methods for creating domain objects.

use std::{path::Path, sync::Arc};

use super::config::AgentConfig;
use crate::{
    Result,
    abstraction::StateAbstractor,
    adapters::{MsgPackRepository, SyntheticLevel},
    features::FeatureExtractor,
    pipeline::LearningAgent,
    ports::AgentRepository,
    q_learning::{QLearningAgent, TrainingMetadata},
};

/// Application with dependency injection.
///
/// Centralizes creation and wiring of dependencies following hexagonal architecture.
/// All infrastructure dependencies are owned by the app and injected into
/// domain objects and use cases.
///
/// # Examples
///
/// ## Production usage
///
/// ```
/// use platformer_q::app::{App, AgentConfig};
///
/// let app = App::new();
/// let agent = app.create_agent(&AgentConfig::new().with_seed(42))?;
/// # Ok::<(), platformer_q::Error>(())
/// ```
///
/// ## Testing with dependency injection
///
/// ```
/// use platformer_q::app::App;
/// use platformer_q::adapters::InMemoryRepository;
///
/// let app = App::for_testing()
///     .with_repository(InMemoryRepository::new())
///     .with_default_seed(42)
///     .build();
/// ```
pub struct App {
    /// Repository for agent persistence
    agent_repository: Arc<dyn AgentRepository + Send + Sync>,
    /// Default random seed (None = non-deterministic)
    default_seed: Option<u64>,
}

impl App {
    /// Create a new app with production defaults.
    ///
    /// Uses:
    /// - `MsgPackRepository` for agent persistence
    /// - No default seed (non-deterministic RNG)
    pub fn new() -> Self {
        Self {
            agent_repository: Arc::new(MsgPackRepository::new()),
            default_seed: None,
        }
    }

    /// Create a builder for constructing app with custom dependencies.
    pub fn for_testing() -> AppBuilder {
        AppBuilder::new()
    }

    /// Get the agent repository.
    pub fn agent_repository(&self) -> Arc<dyn AgentRepository + Send + Sync> {
        Arc::clone(&self.agent_repository)
    }

    /// The config with the app's default seed applied if it has none.
    pub fn resolve_config(&self, config: &AgentConfig) -> AgentConfig {
        match (config.seed, self.default_seed) {
            (None, Some(seed)) => config.clone().with_seed(seed),
            _ => config.clone(),
        }
    }

    /// Create an untrained learning agent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfiguration`] if `config` fails validation.
    pub fn create_agent(&self, config: &AgentConfig) -> Result<LearningAgent> {
        let config = self.resolve_config(config);
        config.validate()?;

        let mut learner = QLearningAgent::new(config.learning)?;
        if let Some(seed) = config.seed {
            learner = learner.with_seed(seed);
        }
        Ok(LearningAgent::from_parts(
            FeatureExtractor::new(config.extractor),
            StateAbstractor::new(config.abstraction),
            learner,
        ))
    }

    /// Build the synthetic level described by `config`.
    pub fn create_level(&self, config: &AgentConfig) -> Result<SyntheticLevel> {
        SyntheticLevel::new(self.resolve_config(config).level)
    }

    /// Load a trained agent from persistent storage.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use platformer_q::app::App;
    /// use std::path::Path;
    ///
    /// let app = App::new();
    /// let agent = app.load_agent(Path::new("trained_agent.msgpack"), None)?;
    /// # Ok::<(), platformer_q::Error>(())
    /// ```
    pub fn load_agent(&self, path: &Path, cache_capacity: Option<usize>) -> Result<LearningAgent> {
        let mut saved = self.agent_repository.load(path)?;
        if saved.metadata.seed.is_none() {
            saved.metadata.seed = self.default_seed;
        }
        LearningAgent::from_saved(saved, cache_capacity)
    }

    /// Save a trained agent to persistent storage.
    pub fn save_agent(
        &self,
        agent: &LearningAgent,
        metadata: TrainingMetadata,
        path: &Path,
    ) -> Result<()> {
        let saved = agent.to_saved(metadata.stamped())?;
        self.agent_repository.save(&saved, path)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing app with custom dependencies.
///
/// Primarily used for testing to inject in-memory repositories and control
/// randomness.
pub struct AppBuilder {
    agent_repository: Option<Arc<dyn AgentRepository + Send + Sync>>,
    default_seed: Option<u64>,
}

impl AppBuilder {
    /// Create a new app builder.
    pub fn new() -> Self {
        Self {
            agent_repository: None,
            default_seed: None,
        }
    }

    /// Set a custom agent repository.
    pub fn with_repository<R: AgentRepository + Send + Sync + 'static>(mut self, repo: R) -> Self {
        self.agent_repository = Some(Arc::new(repo));
        self
    }

    /// Set a default random seed for every agent and level this app creates.
    pub fn with_default_seed(mut self, seed: u64) -> Self {
        self.default_seed = Some(seed);
        self
    }

    /// Build the app with the configured dependencies.
    ///
    /// If no repository was specified, uses `MsgPackRepository` by default.
    pub fn build(self) -> App {
        App {
            agent_repository: self
                .agent_repository
                .unwrap_or_else(|| Arc::new(MsgPackRepository::new())),
            default_seed: self.default_seed,
        }
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::EpisodePhase;

    #[test]
    fn test_app_creates_agent() {
        let app = App::new();
        let agent = app.create_agent(&AgentConfig::new()).unwrap();
        assert_eq!(agent.phase(), EpisodePhase::Idle);
        assert!(!agent.abstractor().is_trained());
    }

    #[test]
    fn test_app_applies_default_seed() {
        let app = App::for_testing().with_default_seed(42).build();
        let config = app.resolve_config(&AgentConfig::new());
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.abstraction.seed, Some(42));
    }

    #[test]
    fn test_config_seed_overrides_app_default() {
        let app = App::for_testing().with_default_seed(42).build();
        let config = app.resolve_config(&AgentConfig::new().with_seed(123));
        assert_eq!(config.seed, Some(123));
        let agent = app.create_agent(&config).unwrap();
        assert_eq!(agent.learner().seed(), Some(123));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let app = App::new();
        assert!(app.create_agent(&AgentConfig::new().with_clusters(0)).is_err());
    }

    #[test]
    fn test_saving_untrained_agent_fails() {
        let app = App::for_testing()
            .with_repository(crate::adapters::InMemoryRepository::new())
            .build();
        let agent = app.create_agent(&AgentConfig::new()).unwrap();
        assert!(
            app.save_agent(&agent, TrainingMetadata::default(), Path::new("x"))
                .is_err()
        );
    }
}

//! Per-step glue between extractor, abstractor and value learner.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Error, Result,
    abstraction::{AbstractionConfig, StateAbstractor},
    features::{ExtractorConfig, FeatureExtractor, Observation},
    ports::GameState,
    q_learning::{LearningParams, QLearningAgent, SavedAgent, TrainingMetadata},
    types::{Action, FeatureVector},
};

/// Where an agent is within its current episode.
///
/// `Idle → Acting → Updating → Acting → … → Terminal`. The first
/// observation of an episode keeps the agent idle: there is no transition
/// to learn from yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodePhase {
    /// Nothing learned yet this episode
    Idle,
    /// An action has been emitted; waiting for the resulting observation
    Acting,
    /// The latest observation is resolved and the previous transition learned
    Updating,
    /// A terminal observation ended the episode
    Terminal,
}

impl fmt::Display for EpisodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EpisodePhase::Idle => "idle",
            EpisodePhase::Acting => "acting",
            EpisodePhase::Updating => "updating",
            EpisodePhase::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

/// What [`LearningAgent::observe`] learned from one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observed {
    pub state_id: usize,
    pub reward: f64,
    pub terminal: bool,
    /// New value of the previous state-action pair, if one was updated
    pub updated_value: Option<f64>,
}

/// Extractor, abstractor and Q-learner for one controlled character.
#[derive(Debug)]
pub struct LearningAgent {
    extractor: FeatureExtractor,
    abstractor: StateAbstractor,
    learner: QLearningAgent,
    phase: EpisodePhase,
    current: Option<usize>,
    previous: Option<(usize, Action)>,
    learning: bool,
}

impl LearningAgent {
    pub fn new(
        extractor: ExtractorConfig,
        abstraction: AbstractionConfig,
        params: LearningParams,
    ) -> Result<Self> {
        Ok(Self::from_parts(
            FeatureExtractor::new(extractor),
            StateAbstractor::new(abstraction),
            QLearningAgent::new(params)?,
        ))
    }

    pub fn from_parts(
        extractor: FeatureExtractor,
        abstractor: StateAbstractor,
        learner: QLearningAgent,
    ) -> Self {
        Self {
            extractor,
            abstractor,
            learner,
            phase: EpisodePhase::Idle,
            current: None,
            previous: None,
            learning: true,
        }
    }

    /// Rebuild a trained agent from its persisted form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if any part of `saved` is inconsistent.
    pub fn from_saved(saved: SavedAgent, cache_capacity: Option<usize>) -> Result<Self> {
        saved.validate()?;
        let table = saved.value_table()?;
        let learner = QLearningAgent::with_table(saved.params, table)?;
        let learner = match saved.metadata.seed {
            Some(seed) => learner.with_seed(seed),
            None => learner,
        };
        let abstractor = StateAbstractor::from_codebook(saved.codebook, cache_capacity)?;
        Ok(Self::from_parts(
            FeatureExtractor::new(saved.extractor),
            abstractor,
            learner,
        ))
    }

    /// Snapshot for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotTrained`] before the abstraction is trained.
    pub fn to_saved(&self, metadata: TrainingMetadata) -> Result<SavedAgent> {
        Ok(SavedAgent::new(
            *self.extractor.config(),
            self.abstractor.export_codebook()?,
            self.learner.table(),
            *self.learner.params(),
            metadata,
        ))
    }

    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn abstractor(&self) -> &StateAbstractor {
        &self.abstractor
    }

    pub fn learner(&self) -> &QLearningAgent {
        &self.learner
    }

    pub fn learner_mut(&mut self) -> &mut QLearningAgent {
        &mut self.learner
    }

    pub fn is_learning(&self) -> bool {
        self.learning
    }

    /// With learning off, no values are written and actions are greedy.
    pub fn set_learning(&mut self, learning: bool) {
        self.learning = learning;
    }

    /// Fit the state abstraction on a collected feature batch.
    pub fn train_abstraction(&mut self, batch: &[FeatureVector]) -> Result<()> {
        self.abstractor.train(batch)
    }

    /// Start a new episode from [`EpisodePhase::Idle`].
    pub fn reset_episode(&mut self) {
        self.extractor.reset_episode();
        self.phase = EpisodePhase::Idle;
        self.current = None;
        self.previous = None;
    }

    /// Extract, resolve and learn from the transition that led here.
    ///
    /// # Errors
    ///
    /// - [`Error::Phase`] unless the agent is fresh from a reset or waiting
    ///   on the outcome of an action
    /// - [`Error::NotTrained`] before the abstraction is trained
    ///
    /// On error the agent is left exactly as it was.
    pub fn observe(&mut self, observation: &Observation) -> Result<Observed> {
        let ready = match self.phase {
            EpisodePhase::Idle => self.current.is_none(),
            EpisodePhase::Acting => true,
            EpisodePhase::Updating | EpisodePhase::Terminal => false,
        };
        if !ready {
            return Err(self.phase_error("observe"));
        }
        // Extract on a copy so a failed resolve leaves the episode untouched.
        let mut extractor = self.extractor.clone();
        let state = extractor.extract(observation);
        let state_id = self.abstractor.resolve(state.representation())?;
        self.extractor = extractor;
        let reward = state.reward();
        let terminal = state.is_terminal();

        let updated_value = match self.previous.take() {
            Some((prev, action)) if self.learning => {
                Some(self.learner.update(prev, action, reward, state_id))
            }
            _ => None,
        };

        self.current = Some(state_id);
        self.phase = if terminal {
            debug!(state = state_id, reward, "terminal observation");
            EpisodePhase::Terminal
        } else if self.phase == EpisodePhase::Idle {
            EpisodePhase::Idle
        } else {
            EpisodePhase::Updating
        };

        Ok(Observed {
            state_id,
            reward,
            terminal,
            updated_value,
        })
    }

    /// Choose the action for the current state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Phase`] unless called right after
    /// [`LearningAgent::observe`] on a non-terminal observation.
    pub fn act(&mut self) -> Result<Action> {
        let state = match (self.phase, self.current) {
            (EpisodePhase::Idle | EpisodePhase::Updating, Some(state)) => state,
            _ => return Err(self.phase_error("act")),
        };
        let action = if self.learning {
            self.learner.select_action(state)
        } else {
            self.learner.greedy_action(state)
        };
        self.previous = Some((state, action));
        self.phase = EpisodePhase::Acting;
        Ok(action)
    }

    /// [`LearningAgent::observe`] then, unless terminal, [`LearningAgent::act`].
    pub fn step(&mut self, observation: &Observation) -> Result<(Observed, Option<Action>)> {
        let observed = self.observe(observation)?;
        if observed.terminal {
            return Ok((observed, None));
        }
        Ok((observed, Some(self.act()?)))
    }

    fn phase_error(&self, operation: &str) -> Error {
        Error::Phase {
            operation: operation.to_string(),
            phase: self.phase.to_string(),
        }
    }
}

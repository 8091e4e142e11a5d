//! Training pipeline: batch collection, abstraction training, learning episodes

use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, info, warn};

use super::agent::LearningAgent;
use crate::{
    Error, Result,
    abstraction::CacheStats,
    features::FeatureExtractor,
    ports::{Environment, GameState, Observer},
    types::{Action, FeatureVector},
};

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Random-policy episodes used to collect the abstraction batch
    pub collection_episodes: usize,

    /// Maximum number of feature vectors in the abstraction batch
    pub batch_size: usize,

    /// Number of learning episodes
    pub episodes: usize,

    /// Step cap per episode
    pub max_steps: usize,

    /// Random seed
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            collection_episodes: 5,
            batch_size: 2000,
            episodes: 100,
            max_steps: 1000,
            seed: None,
        }
    }
}

/// Outcome of one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Episode index
    pub episode: usize,

    /// Actions taken
    pub steps: usize,

    /// Sum of observed rewards
    pub total_reward: f64,

    /// Horizontal progress from the first to the last observation
    pub distance: f64,

    /// Whether a terminal observation ended the episode
    pub terminal: bool,
}

/// Result of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingResult {
    /// Learning episodes run
    pub episodes: usize,

    /// Feature vectors the abstraction was trained on (0 if it was already trained)
    pub batch_size: usize,

    /// Number of abstract states
    pub codebook_size: usize,

    /// State-action pairs with a learned value
    pub learned_pairs: usize,

    /// Mean total reward per episode
    pub mean_reward: f64,

    /// Best distance reached
    pub best_distance: f64,

    /// Episodes ended by a terminal observation
    pub terminal_episodes: usize,

    /// Projection cache counters at the end of training
    pub cache: CacheStats,
}

impl TrainingResult {
    /// Save result to JSON file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load result from JSON file
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let result = serde_json::from_reader(file)?;
        Ok(result)
    }
}

/// Greedy-policy statistics over several episodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub episodes: usize,
    pub mean_reward: f64,
    pub reward_std_dev: f64,
    pub mean_distance: f64,
    pub distance_std_dev: f64,
    pub best_distance: f64,
    pub terminal_episodes: usize,
    pub summaries: Vec<EpisodeSummary>,
}

impl EvaluationReport {
    fn from_summaries(summaries: Vec<EpisodeSummary>) -> Self {
        let rewards: Vec<f64> = summaries.iter().map(|s| s.total_reward).collect();
        let distances: Vec<f64> = summaries.iter().map(|s| s.distance).collect();
        Self {
            episodes: summaries.len(),
            mean_reward: mean(&rewards),
            reward_std_dev: std_dev(&rewards),
            mean_distance: mean(&distances),
            distance_std_dev: std_dev(&distances),
            best_distance: distances.iter().copied().fold(0.0, f64::max),
            terminal_episodes: summaries.iter().filter(|s| s.terminal).count(),
            summaries,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().mean()
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        0.0
    } else {
        values.iter().std_dev()
    }
}

/// Training pipeline for one agent in one environment
pub struct TrainingPipeline {
    config: TrainingConfig,
    observers: Vec<Box<dyn Observer>>,
}

impl TrainingPipeline {
    /// Create a new training pipeline
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            observers: Vec::new(),
        }
    }

    /// Add an observer to the pipeline
    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train the abstraction if needed, then run the learning episodes.
    pub fn run<E: Environment>(
        &mut self,
        env: &mut E,
        agent: &mut LearningAgent,
    ) -> Result<TrainingResult> {
        if let Some(seed) = self.config.seed {
            env.set_seed(seed);
        }
        for observer in &mut self.observers {
            observer.on_training_start(self.config.episodes)?;
        }

        let mut batch_size = 0;
        if !agent.abstractor().is_trained() {
            let batch = self.collect_batch(env, &mut agent.extractor().clone())?;
            batch_size = batch.len();
            agent.train_abstraction(&batch)?;
            let codebook_size = agent.abstractor().codebook_size();
            for observer in &mut self.observers {
                observer.on_abstraction_trained(batch_size, codebook_size)?;
            }
        } else {
            debug!("abstraction already trained, skipping batch collection");
        }

        agent.set_learning(true);
        let mut total_reward = 0.0;
        let mut best_distance: f64 = 0.0;
        let mut terminal_episodes = 0;

        for episode in 0..self.config.episodes {
            let summary = self.run_episode(env, agent, episode)?;
            total_reward += summary.total_reward;
            best_distance = best_distance.max(summary.distance);
            if summary.terminal {
                terminal_episodes += 1;
            }
        }

        for observer in &mut self.observers {
            observer.on_training_end()?;
        }

        let result = TrainingResult {
            episodes: self.config.episodes,
            batch_size,
            codebook_size: agent.abstractor().codebook_size(),
            learned_pairs: agent.learner().table().len(),
            mean_reward: if self.config.episodes > 0 {
                total_reward / self.config.episodes as f64
            } else {
                0.0
            },
            best_distance,
            terminal_episodes,
            cache: agent.abstractor().cache_stats(),
        };
        info!(
            episodes = result.episodes,
            codebook = result.codebook_size,
            pairs = result.learned_pairs,
            mean_reward = result.mean_reward,
            best_distance = result.best_distance,
            "training finished"
        );
        Ok(result)
    }

    /// Collect feature vectors by playing uniformly random actions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for a zero batch size or zero
    /// collection episodes, and propagates environment errors.
    pub fn collect_batch<E: Environment>(
        &self,
        env: &mut E,
        extractor: &mut FeatureExtractor,
    ) -> Result<Vec<FeatureVector>> {
        if self.config.batch_size == 0 || self.config.collection_episodes == 0 {
            return Err(Error::invalid_config(
                "batch collection needs a positive batch size and episode count",
            ));
        }
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let mut batch = Vec::with_capacity(self.config.batch_size);
        'episodes: for episode in 0..self.config.collection_episodes {
            env.reset()?;
            extractor.reset_episode();
            for _ in 0..self.config.max_steps {
                let state = extractor.extract(&env.observe()?);
                let terminal = state.is_terminal();
                batch.push(state.into_representation());
                if batch.len() >= self.config.batch_size {
                    break 'episodes;
                }
                if terminal || env.is_finished() {
                    break;
                }
                let action = Action::ALL.choose(&mut rng).copied().unwrap_or(Action::Stay);
                env.apply(action.buttons())?;
            }
            debug!(episode, collected = batch.len(), "collection episode finished");
        }

        if batch.len() < self.config.batch_size {
            warn!(
                collected = batch.len(),
                requested = self.config.batch_size,
                "collection ended before the batch was full"
            );
        }
        Ok(batch)
    }

    /// Play one learning episode.
    pub fn run_episode<E: Environment>(
        &mut self,
        env: &mut E,
        agent: &mut LearningAgent,
        episode: usize,
    ) -> Result<EpisodeSummary> {
        for observer in &mut self.observers {
            observer.on_episode_start(episode)?;
        }
        let max_steps = self.config.max_steps;
        let observers = &mut self.observers;
        let mut notify = |step: usize, state: usize, action: Action, reward: f64| -> Result<()> {
            for observer in observers.iter_mut() {
                observer.on_step(episode, step, state, action, reward)?;
            }
            Ok(())
        };
        let summary = play_episode(env, agent, episode, max_steps, &mut notify)?;
        debug!(
            episode,
            steps = summary.steps,
            reward = summary.total_reward,
            distance = summary.distance,
            "episode finished"
        );
        for observer in &mut self.observers {
            observer.on_episode_end(episode, &summary)?;
        }
        Ok(summary)
    }

    /// Run greedy episodes without learning.
    ///
    /// The agent's learning flag is restored afterwards.
    pub fn evaluate<E: Environment>(
        &self,
        env: &mut E,
        agent: &mut LearningAgent,
        episodes: usize,
    ) -> Result<EvaluationReport> {
        if !agent.abstractor().is_trained() {
            return Err(Error::not_trained("state abstractor"));
        }
        let was_learning = agent.is_learning();
        agent.set_learning(false);
        let mut summaries = Vec::with_capacity(episodes);
        let mut outcome = Ok(());
        let mut ignore = |_: usize, _: usize, _: Action, _: f64| -> Result<()> { Ok(()) };
        for episode in 0..episodes {
            match play_episode(env, agent, episode, self.config.max_steps, &mut ignore) {
                Ok(summary) => summaries.push(summary),
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        agent.set_learning(was_learning);
        outcome?;

        let report = EvaluationReport::from_summaries(summaries);
        info!(
            episodes = report.episodes,
            mean_reward = report.mean_reward,
            mean_distance = report.mean_distance,
            "evaluation finished"
        );
        Ok(report)
    }
}

type StepHook<'a> = dyn FnMut(usize, usize, Action, f64) -> Result<()> + 'a;

fn play_episode<E: Environment>(
    env: &mut E,
    agent: &mut LearningAgent,
    episode: usize,
    max_steps: usize,
    on_step: &mut StepHook<'_>,
) -> Result<EpisodeSummary> {
    env.reset()?;
    agent.reset_episode();

    let mut steps = 0;
    let mut total_reward = 0.0;
    let mut span: Option<(f64, f64)> = None;
    let mut terminal = false;

    loop {
        let observation = env.observe()?;
        let x = observation.position.0;
        span = Some((span.map_or(x, |(start, _)| start), x));

        let observed = agent.observe(&observation)?;
        total_reward += observed.reward;
        if observed.terminal {
            terminal = true;
            break;
        }
        if env.is_finished() || steps >= max_steps {
            break;
        }

        let action = agent.act()?;
        on_step(steps, observed.state_id, action, observed.reward)?;
        env.apply(action.buttons())?;
        steps += 1;
    }

    Ok(EpisodeSummary {
        episode,
        steps,
        total_reward,
        distance: span.map_or(0.0, |(start, end)| end - start),
        terminal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_helpers() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[4.0]), 0.0);
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-12);
        assert!((std_dev(&[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_report_aggregates() {
        let summaries = vec![
            EpisodeSummary {
                episode: 0,
                steps: 10,
                total_reward: 5.0,
                distance: 12.0,
                terminal: false,
            },
            EpisodeSummary {
                episode: 1,
                steps: 3,
                total_reward: -995.0,
                distance: 2.0,
                terminal: true,
            },
        ];
        let report = EvaluationReport::from_summaries(summaries);
        assert_eq!(report.episodes, 2);
        assert_eq!(report.terminal_episodes, 1);
        assert_eq!(report.best_distance, 12.0);
        assert!((report.mean_reward + 495.0).abs() < 1e-9);
    }
}

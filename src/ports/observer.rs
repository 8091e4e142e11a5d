//! Observer port - abstraction for training observation and data collection
//!
//! This port defines the interface for observing training events,
//! allowing composable data collection without coupling the agent loop
//! to specific output formats or metrics.

use crate::{Result, pipeline::EpisodeSummary, types::Action};

/// Observer trait for monitoring training
///
/// Observers can be composed to collect different types of data during training.
/// Examples include:
/// - Progress bars for user feedback
/// - JSONL export for analysis
/// - Metrics tracking for evaluation
///
/// # Event Sequence
///
/// The observer methods are called in the following order:
/// 1. `on_training_start(total_episodes)` - Once, before batch collection
/// 2. `on_abstraction_trained(batch_size, codebook_size)` - Once the codebook is frozen
/// 3. For each learning episode:
///    - `on_episode_start(episode)`
///    - `on_step(...)` - For each agent step
///    - `on_episode_end(episode, summary)`
/// 4. `on_training_end()` - Once at the end
///
/// # Examples
///
/// ```no_run
/// use platformer_q::{pipeline::EpisodeSummary, ports::Observer};
///
/// struct DistanceObserver {
///     best: f64,
/// }
///
/// impl Observer for DistanceObserver {
///     fn on_episode_end(
///         &mut self,
///         _episode: usize,
///         summary: &EpisodeSummary,
///     ) -> platformer_q::Result<()> {
///         self.best = self.best.max(summary.distance);
///         Ok(())
///     }
/// }
/// ```
pub trait Observer: Send {
    /// Called when training starts.
    ///
    /// # Default Implementation
    ///
    /// Does nothing. Override to initialize observation state.
    fn on_training_start(&mut self, _total_episodes: usize) -> Result<()> {
        Ok(())
    }

    /// Called once the state abstraction has been trained on the collected batch.
    fn on_abstraction_trained(&mut self, _batch_size: usize, _codebook_size: usize) -> Result<()> {
        Ok(())
    }

    /// Called when a learning episode starts.
    fn on_episode_start(&mut self, _episode: usize) -> Result<()> {
        Ok(())
    }

    /// Called for each agent step, after the value update for the
    /// previous transition has been applied.
    ///
    /// # Parameters
    ///
    /// * `episode` - Index of the current episode
    /// * `step` - Step number within the episode (0-based)
    /// * `state_id` - Abstract state the agent acted from
    /// * `action` - Action selected for this step
    /// * `reward` - Reward observed on entering `state_id`
    fn on_step(
        &mut self,
        _episode: usize,
        _step: usize,
        _state_id: usize,
        _action: Action,
        _reward: f64,
    ) -> Result<()> {
        Ok(())
    }

    /// Called when an episode ends, either on a terminal observation or
    /// on the step cap.
    fn on_episode_end(&mut self, _episode: usize, _summary: &EpisodeSummary) -> Result<()> {
        Ok(())
    }

    /// Called when training completes.
    ///
    /// Use this to finalize outputs, close files, or display summaries.
    fn on_training_end(&mut self) -> Result<()> {
        Ok(())
    }
}

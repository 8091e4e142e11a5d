//! Observer pattern for training pipelines
//!
//! Observers allow composable data collection during training without coupling
//! training logic to specific output formats.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use super::training::EpisodeSummary;
use crate::{Result, ports::Observer, types::Action};

/// One agent step as recorded by [`JsonlObserver`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub state_id: usize,
    pub action: Action,
    pub reward: f64,
}

/// One episode as written by [`JsonlObserver`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRecord {
    #[serde(flatten)]
    pub summary: EpisodeSummary,
    pub trajectory: Vec<StepRecord>,
}

/// Progress bar observer - Shows training progress
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    best_distance: f64,
    deaths: usize,
}

impl ProgressObserver {
    /// Create a new progress observer
    pub fn new() -> Self {
        Self {
            progress_bar: None,
            best_distance: 0.0,
            deaths: 0,
        }
    }

    fn message(&self) -> String {
        format!("best {:.1} deaths {}", self.best_distance, self.deaths)
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_training_start(&mut self, total_episodes: usize) -> Result<()> {
        let pb = ProgressBar::new(total_episodes as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} episodes ({msg})")
                .map_err(|e| crate::Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_abstraction_trained(&mut self, batch_size: usize, codebook_size: usize) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("{codebook_size} states from {batch_size} samples"));
        }
        Ok(())
    }

    fn on_episode_end(&mut self, episode: usize, summary: &EpisodeSummary) -> Result<()> {
        self.best_distance = self.best_distance.max(summary.distance);
        if summary.terminal {
            self.deaths += 1;
        }
        if let Some(pb) = &self.progress_bar {
            pb.set_position(episode as u64 + 1);
            pb.set_message(self.message());
        }
        Ok(())
    }

    fn on_training_end(&mut self) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(self.message());
        }
        Ok(())
    }
}

/// Metrics observer - Tracks training metrics
#[derive(Debug, Default)]
pub struct MetricsObserver {
    rewards: Vec<f64>,
    distances: Vec<f64>,
    steps: Vec<usize>,
    terminal_episodes: usize,
    action_counts: [usize; Action::COUNT],
}

impl MetricsObserver {
    /// Create a new metrics observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean reward over the last `window` episodes
    pub fn recent_mean_reward(&self, window: usize) -> f64 {
        let start = self.rewards.len().saturating_sub(window);
        let recent = &self.rewards[start..];
        if recent.is_empty() {
            0.0
        } else {
            recent.iter().sum::<f64>() / recent.len() as f64
        }
    }

    /// How often each action was taken, in [`Action::ALL`] order
    pub fn action_counts(&self) -> &[usize; Action::COUNT] {
        &self.action_counts
    }

    /// Get metrics summary
    pub fn summary(&self) -> MetricsSummary {
        let episodes = self.rewards.len();
        let avg = |total: f64| {
            if episodes == 0 {
                0.0
            } else {
                total / episodes as f64
            }
        };
        MetricsSummary {
            episodes,
            terminal_episodes: self.terminal_episodes,
            mean_reward: avg(self.rewards.iter().sum()),
            mean_distance: avg(self.distances.iter().sum()),
            best_distance: self.distances.iter().copied().fold(0.0, f64::max),
            avg_episode_length: avg(self.steps.iter().sum::<usize>() as f64),
        }
    }
}

/// Summary of training metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub episodes: usize,
    pub terminal_episodes: usize,
    pub mean_reward: f64,
    pub mean_distance: f64,
    pub best_distance: f64,
    pub avg_episode_length: f64,
}

impl Observer for MetricsObserver {
    fn on_step(
        &mut self,
        _episode: usize,
        _step: usize,
        _state_id: usize,
        action: Action,
        _reward: f64,
    ) -> Result<()> {
        self.action_counts[action.id()] += 1;
        Ok(())
    }

    fn on_episode_end(&mut self, _episode: usize, summary: &EpisodeSummary) -> Result<()> {
        self.rewards.push(summary.total_reward);
        self.distances.push(summary.distance);
        self.steps.push(summary.steps);
        if summary.terminal {
            self.terminal_episodes += 1;
        }
        Ok(())
    }
}

/// JSONL observer - Exports episodes to JSON Lines format
pub struct JsonlObserver {
    writer: BufWriter<File>,
    trajectory: Vec<StepRecord>,
}

impl JsonlObserver {
    /// Create a new JSONL observer
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self {
            writer,
            trajectory: Vec::new(),
        })
    }
}

impl Observer for JsonlObserver {
    fn on_episode_start(&mut self, _episode: usize) -> Result<()> {
        self.trajectory.clear();
        Ok(())
    }

    fn on_step(
        &mut self,
        _episode: usize,
        step: usize,
        state_id: usize,
        action: Action,
        reward: f64,
    ) -> Result<()> {
        self.trajectory.push(StepRecord {
            step,
            state_id,
            action,
            reward,
        });
        Ok(())
    }

    fn on_episode_end(&mut self, _episode: usize, summary: &EpisodeSummary) -> Result<()> {
        let record = EpisodeRecord {
            summary: summary.clone(),
            trajectory: std::mem::take(&mut self.trajectory),
        };

        // One JSON object per line
        serde_json::to_writer(&mut self.writer, &record)?;
        writeln!(&mut self.writer)?;
        self.writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(episode: usize, reward: f64, distance: f64, terminal: bool) -> EpisodeSummary {
        EpisodeSummary {
            episode,
            steps: 4,
            total_reward: reward,
            distance,
            terminal,
        }
    }

    #[test]
    fn test_metrics_summary() {
        let mut metrics = MetricsObserver::new();
        metrics.on_step(0, 0, 1, Action::Right, 1.0).unwrap();
        metrics.on_step(0, 1, 1, Action::Right, 1.0).unwrap();
        metrics.on_episode_end(0, &summary(0, 10.0, 20.0, false)).unwrap();
        metrics.on_episode_end(1, &summary(1, -990.0, 5.0, true)).unwrap();

        let s = metrics.summary();
        assert_eq!(s.episodes, 2);
        assert_eq!(s.terminal_episodes, 1);
        assert_eq!(s.best_distance, 20.0);
        assert!((s.mean_reward + 490.0).abs() < 1e-9);
        assert_eq!(metrics.recent_mean_reward(1), -990.0);
        assert_eq!(metrics.action_counts()[Action::Right.id()], 2);
    }

    #[test]
    fn test_jsonl_writes_one_line_per_episode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.jsonl");
        let mut observer = JsonlObserver::new(&path).unwrap();
        for episode in 0..2 {
            observer.on_episode_start(episode).unwrap();
            observer.on_step(episode, 0, 3, Action::Jump, 0.5).unwrap();
            observer
                .on_episode_end(episode, &summary(episode, 0.5, 1.0, false))
                .unwrap();
        }
        drop(observer);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let record: EpisodeRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(record.summary.episode, 1);
        assert_eq!(record.trajectory.len(), 1);
        assert_eq!(record.trajectory[0].action, Action::Jump);
    }
}

//! Observation to feature-vector conversion and reward shaping.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    observation::{KillCounters, Observation},
    state::PlatformerState,
};
use crate::types::FeatureVector;

/// Number of status scalars appended after the two occupancy layers.
pub const STATUS_FEATURES: usize = 4;

/// Reward shaping weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    /// Reward per unit of horizontal progress
    pub distance: f64,
    pub stomp: f64,
    pub fire: f64,
    pub shell: f64,
    /// Reward applied on the step the power mode drops
    pub collision: f64,
    /// Subtracted every step
    pub living_cost: f64,
    /// Replaces the whole reward when the agent falls out of the level
    pub fall_penalty: f64,
    /// Vertical coordinate beyond which the agent counts as falling
    pub fall_threshold: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            distance: 1.0,
            stomp: 0.0,
            fire: 1.0,
            shell: 1.0,
            collision: -50.0,
            living_cost: 0.5,
            fall_penalty: -1000.0,
            fall_threshold: 225.0,
        }
    }
}

/// Extractor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Window half-width; the window spans `-half_width..half_width`.
    pub half_width: usize,
    pub weights: RewardWeights,
    /// Horizontal position the agent starts each episode at
    pub start_x: f64,
    /// Power mode the agent starts each episode in
    pub start_mode: u8,
}

impl ExtractorConfig {
    /// Side length of the sampled window.
    pub fn window_side(&self) -> usize {
        2 * self.half_width
    }

    /// Length of every feature vector produced with this configuration.
    pub fn feature_len(&self) -> usize {
        let side = self.window_side();
        2 * side * side + STATUS_FEATURES
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            half_width: 3,
            weights: RewardWeights::default(),
            start_x: 32.0,
            start_mode: 2,
        }
    }
}

/// Per-agent memory of the previous step, needed for reward deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractorState {
    pub last_x: f64,
    pub last_mode: u8,
    pub last_kills: KillCounters,
}

impl ExtractorState {
    pub fn new(start_x: f64, start_mode: u8) -> Self {
        Self {
            last_x: start_x,
            last_mode: start_mode,
            last_kills: KillCounters::default(),
        }
    }
}

/// Stateful feature extractor owned by one agent.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: ExtractorConfig,
    state: ExtractorState,
}

impl FeatureExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            state: ExtractorState::new(config.start_x, config.start_mode),
            config,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn state(&self) -> &ExtractorState {
        &self.state
    }

    /// Forget the previous step; call between episodes.
    pub fn reset_episode(&mut self) {
        self.state = ExtractorState::new(self.config.start_x, self.config.start_mode);
    }

    /// Reset with an explicit starting power mode.
    pub fn reset_episode_with_mode(&mut self, mode: u8) {
        self.state = ExtractorState::new(self.config.start_x, mode);
    }

    /// Build the feature vector, reward and terminal flag for one observation.
    pub fn extract(&mut self, observation: &Observation) -> PlatformerState {
        let features = self.representation(observation);
        let (reward, terminal) = self.reward(observation);
        PlatformerState::new(features, reward, terminal)
    }

    fn representation(&self, observation: &Observation) -> FeatureVector {
        let h = self.config.half_width as isize;
        let mut values = Vec::with_capacity(self.config.feature_len());

        for layer in [&observation.terrain, &observation.enemies] {
            for row in -h..h {
                for col in -h..h {
                    values.push(if layer.occupied_at_offset(row, col) {
                        1.0
                    } else {
                        0.0
                    });
                }
            }
        }

        let status = observation.status;
        values.push(f64::from(status.mode));
        values.push(bool_feature(status.can_jump));
        values.push(bool_feature(status.on_ground));
        values.push(bool_feature(status.can_shoot));

        FeatureVector::new(values)
    }

    fn reward(&mut self, observation: &Observation) -> (f64, bool) {
        let weights = &self.config.weights;
        let (x, y) = observation.position;
        let kills = observation.kills;
        let mode = observation.status.mode;

        let distance = x - self.state.last_x;
        let stomp = kills.stomp.saturating_sub(self.state.last_kills.stomp);
        let fire = kills.fire.saturating_sub(self.state.last_kills.fire);
        let shell = kills.shell.saturating_sub(self.state.last_kills.shell);
        let collided = if mode < self.state.last_mode { 1.0 } else { 0.0 };

        self.state.last_x = x;
        self.state.last_kills = kills;
        self.state.last_mode = mode;

        if y > weights.fall_threshold {
            debug!(x, y, "agent fell out of the level");
            return (weights.fall_penalty, true);
        }

        let reward = distance * weights.distance
            + f64::from(stomp) * weights.stomp
            + f64::from(fire) * weights.fire
            + f64::from(shell) * weights.shell
            + collided * weights.collision
            - weights.living_cost;
        (reward, false)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

fn bool_feature(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        features::{AgentStatus, OccupancyGrid},
        ports::GameState,
    };

    fn observation(x: f64, y: f64) -> Observation {
        Observation {
            terrain: OccupancyGrid::new(22, 22),
            enemies: OccupancyGrid::new(22, 22),
            status: AgentStatus::default(),
            position: (x, y),
            kills: KillCounters::default(),
        }
    }

    #[test]
    fn test_feature_length_matches_config() {
        let mut extractor = FeatureExtractor::default();
        let state = extractor.extract(&observation(32.0, 100.0));
        assert_eq!(state.representation().len(), 76);
        assert_eq!(extractor.config().feature_len(), 76);
    }

    #[test]
    fn test_window_layout() {
        let mut obs = observation(32.0, 100.0);
        // Agent at (11, 11); the window's first cell is offset (-3, -3).
        obs.terrain.set(8, 8, 1);
        obs.enemies.set(11, 11, 3);
        obs.status = AgentStatus {
            mode: 1,
            can_jump: false,
            on_ground: true,
            can_shoot: false,
        };
        let mut extractor = FeatureExtractor::default();
        let state = extractor.extract(&obs);
        let values = state.representation();

        assert_eq!(values[0], 1.0);
        assert_eq!(values[1..36].iter().sum::<f64>(), 0.0);
        // Offset (0, 0) is row 3, column 3 of the 6x6 enemy layer.
        assert_eq!(values[36 + 3 * 6 + 3], 1.0);
        assert_eq!(&values[72..], &[1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_distance_reward_minus_living_cost() {
        let mut extractor = FeatureExtractor::default();
        let first = extractor.extract(&observation(34.0, 100.0));
        assert!((first.reward() - 1.5).abs() < 1e-12);
        let second = extractor.extract(&observation(34.0, 100.0));
        assert!((second.reward() + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_kill_deltas_are_clamped() {
        let mut extractor = FeatureExtractor::default();
        let mut obs = observation(32.0, 100.0);
        obs.kills = KillCounters {
            stomp: 2,
            fire: 3,
            shell: 1,
        };
        let state = extractor.extract(&obs);
        // 3 fire + 1 shell - 0.5
        assert!((state.reward() - 3.5).abs() < 1e-12);

        // Counters going backwards never produce negative kills.
        obs.kills = KillCounters::default();
        let state = extractor.extract(&obs);
        assert!((state.reward() + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_collision_only_on_mode_drop() {
        let mut extractor = FeatureExtractor::default();
        let mut obs = observation(32.0, 100.0);
        obs.status.mode = 1;
        let hit = extractor.extract(&obs);
        assert!((hit.reward() - (-50.5)).abs() < 1e-12);

        let steady = extractor.extract(&obs);
        assert!((steady.reward() + 0.5).abs() < 1e-12);

        obs.status.mode = 2;
        let powered_up = extractor.extract(&obs);
        assert!((powered_up.reward() + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_falling_overrides_reward() {
        let mut extractor = FeatureExtractor::default();
        let state = extractor.extract(&observation(80.0, 230.0));
        assert!(state.is_terminal());
        assert_eq!(state.reward(), -1000.0);
    }

    #[test]
    fn test_reset_episode_restores_start() {
        let mut extractor = FeatureExtractor::default();
        let mut obs = observation(90.0, 100.0);
        obs.kills.fire = 4;
        obs.status.mode = 0;
        extractor.extract(&obs);

        extractor.reset_episode();
        assert_eq!(*extractor.state(), ExtractorState::new(32.0, 2));

        extractor.reset_episode_with_mode(0);
        assert_eq!(extractor.state().last_mode, 0);
    }
}

//! Concrete [`GameState`] produced by the platformer extractor.

use serde::{Deserialize, Serialize};

use crate::{ports::GameState, types::FeatureVector};

/// Feature vector, reward and terminal flag of one platformer step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformerState {
    representation: FeatureVector,
    reward: f64,
    terminal: bool,
}

impl PlatformerState {
    pub fn new(representation: FeatureVector, reward: f64, terminal: bool) -> Self {
        Self {
            representation,
            reward,
            terminal,
        }
    }

    pub fn into_representation(self) -> FeatureVector {
        self.representation
    }
}

impl GameState for PlatformerState {
    fn representation(&self) -> &FeatureVector {
        &self.representation
    }

    fn reward(&self) -> f64 {
        self.reward
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn reset(&mut self) {
        self.representation = FeatureVector::new(vec![0.0; self.representation.len()]);
        self.reward = 0.0;
        self.terminal = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_zeroes_representation() {
        let mut state = PlatformerState::new(FeatureVector::new(vec![1.0, 0.0, 2.0]), 3.5, true);
        let snapshot = state.clone();
        state.reset();
        assert_eq!(state.representation().as_slice(), &[0.0, 0.0, 0.0]);
        assert_eq!(state.reward(), 0.0);
        assert!(!state.is_terminal());
        assert_eq!(snapshot.reward(), 3.5);
    }
}

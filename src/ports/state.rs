//! Game-state capability consumed by the agent loop.

use crate::types::FeatureVector;

/// Capability set of one observed game state.
///
/// The agent loop only needs the feature representation, the reward for
/// entering the state and whether the episode ended. One concrete type per
/// game implements it; cloning snapshots the state.
pub trait GameState: Clone {
    /// Feature vector fed to the state abstraction.
    fn representation(&self) -> &FeatureVector;

    /// Reward observed on entering this state.
    fn reward(&self) -> f64;

    /// Whether the episode ended on this state.
    fn is_terminal(&self) -> bool;

    /// Clear the state to its "no information" form.
    fn reset(&mut self);
}

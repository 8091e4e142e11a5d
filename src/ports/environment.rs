//! Environment port - the boundary to the host game engine.

use crate::{Result, features::Observation, types::ButtonVector};

/// A game the agent can observe and act in.
///
/// The engine's sensor format, rendering and process wiring stay behind this
/// trait; the agent only ever sees [`Observation`]s and emits
/// [`ButtonVector`]s.
pub trait Environment {
    /// Start a new episode.
    fn reset(&mut self) -> Result<()>;

    /// Observation of the current step.
    fn observe(&self) -> Result<Observation>;

    /// Apply one action and advance the simulation by one step.
    fn apply(&mut self, buttons: ButtonVector) -> Result<()>;

    /// Whether the episode is over (level finished or agent lost).
    fn is_finished(&self) -> bool;

    /// Seed any internal randomness. Deterministic environments ignore it.
    fn set_seed(&mut self, _seed: u64) {}
}

//! Feature extraction from raw environment observations.
//!
//! The extractor turns one [`Observation`] into a [`PlatformerState`]: a
//! fixed-length [`FeatureVector`](crate::types::FeatureVector), the scalar
//! reward for the step and a terminal flag.
//!
//! ## Vector layout
//!
//! For half-width `h` the window covers rows and columns `-h..h` around the
//! agent cell, so each layer contributes `(2h)²` cells:
//!
//! | Range | Content |
//! |-------|---------|
//! | `0..(2h)²` | terrain occupancy, row-major |
//! | `(2h)²..2·(2h)²` | adversary occupancy, row-major |
//! | last 4 | power mode, can-jump, on-ground, can-shoot |

pub mod extractor;
pub mod observation;
pub mod state;

pub use extractor::{ExtractorConfig, ExtractorState, FeatureExtractor, RewardWeights};
pub use observation::{AgentStatus, KillCounters, Observation, OccupancyGrid};
pub use state::PlatformerState;

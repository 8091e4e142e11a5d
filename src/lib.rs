//! Q-learning agent for side-scrolling platformers
//!
//! This crate provides:
//! - Feature extraction from terrain/enemy grids and agent status
//! - State abstraction by PCA projection and prototype clustering
//! - Tabular Q-learning over the abstract states
//! - An episode loop tying observation, update and action together
//! - A synthetic level, persistence adapters and a CLI

pub mod abstraction;
pub mod adapters;
pub mod app;
pub mod cli;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod ports;
pub mod q_learning;
pub mod types;

pub use abstraction::{AbstractionConfig, StateAbstractor};
pub use error::{Error, Result};
pub use features::{ExtractorConfig, FeatureExtractor, Observation};
pub use pipeline::{EpisodePhase, LearningAgent, TrainingConfig, TrainingPipeline};
pub use q_learning::{LearningParams, QLearningAgent, ValueTable};
pub use types::{Action, ButtonVector, FeatureVector};

//! Agent loop, training and evaluation pipelines
//!
//! This module provides:
//! - The per-step agent glue ([`LearningAgent`])
//! - Batch collection, abstraction training and learning episodes
//! - Greedy evaluation
//! - Recording observations during training

pub mod agent;
pub mod observers;
pub mod training;

pub use agent::{EpisodePhase, LearningAgent, Observed};
pub use observers::{
    EpisodeRecord, JsonlObserver, MetricsObserver, MetricsSummary, ProgressObserver, StepRecord,
};
pub use training::{
    EpisodeSummary, EvaluationReport, TrainingConfig, TrainingPipeline, TrainingResult,
};

pub use crate::ports::Observer;

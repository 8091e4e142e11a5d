//! Common test utilities for the platformer-q test suite.
//!
//! Builders for observations, feature batches and trained agents shared by the
//! integration tests.

#![allow(dead_code)]

use platformer_q::{
    AbstractionConfig, ExtractorConfig, FeatureVector, LearningAgent, LearningParams, Observation,
    features::{AgentStatus, KillCounters, OccupancyGrid},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Default feature length (half-width 3).
pub const FEATURE_LEN: usize = 76;

/// An observation at `(x, y)` with empty grids and default status.
pub fn observation_at(x: f64, y: f64) -> Observation {
    Observation {
        terrain: OccupancyGrid::new(19, 19),
        enemies: OccupancyGrid::new(19, 19),
        status: AgentStatus::default(),
        position: (x, y),
        kills: KillCounters::default(),
    }
}

/// An observation whose terrain has random blocks around the agent.
pub fn random_observation(rng: &mut StdRng, x: f64) -> Observation {
    let mut obs = observation_at(x, 100.0);
    for row in 0..19 {
        for col in 0..19 {
            if rng.random::<f64>() < 0.3 {
                obs.terrain.set(row, col, 1);
            }
            if rng.random::<f64>() < 0.05 {
                obs.enemies.set(row, col, 1);
            }
        }
    }
    obs
}

/// `n` random binary-ish feature vectors of the default length.
pub fn random_batch(n: usize, seed: u64) -> Vec<FeatureVector> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let values = (0..FEATURE_LEN)
                .map(|_| if rng.random::<f64>() < 0.3 { 1.0 } else { 0.0 })
                .collect();
            FeatureVector::new(values)
        })
        .collect()
}

pub fn small_abstraction(clusters: i64, seed: u64) -> AbstractionConfig {
    AbstractionConfig {
        components: 4,
        clusters,
        iterations: 50,
        seed: Some(seed),
        cache_capacity: None,
    }
}

/// Agent with a trained abstraction over `random_batch(n, seed)`.
pub fn trained_agent(n: usize, clusters: i64, seed: u64) -> LearningAgent {
    let mut agent = LearningAgent::new(
        ExtractorConfig::default(),
        small_abstraction(clusters, seed),
        LearningParams::default(),
    )
    .unwrap();
    agent.train_abstraction(&random_batch(n, seed)).unwrap();
    agent
}

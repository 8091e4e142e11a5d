//! End-to-end tests: extractor rewards, one learning step, full training runs

mod common;

use platformer_q::{
    Action, EpisodePhase, FeatureExtractor, TrainingPipeline,
    adapters::{InMemoryRepository, LevelConfig, SyntheticLevel},
    app::{AgentConfig, App},
    ports::{Environment, GameState},
    q_learning::TrainingMetadata,
};
use rand::{SeedableRng, rngs::StdRng};

use common::{observation_at, random_observation, trained_agent};

#[test]
fn test_steady_walk_rewards_distance_minus_living_cost() {
    let mut extractor = FeatureExtractor::default();
    let weights = extractor.config().weights;
    let mut x = extractor.config().start_x;

    for step in 0..10 {
        let dx = 1.0 + step as f64 * 0.5;
        x += dx;
        let state = extractor.extract(&observation_at(x, 150.0));
        let expected = dx * weights.distance - weights.living_cost;
        assert!(
            (state.reward() - expected).abs() < 1e-9,
            "step {step}: got {}, expected {expected}",
            state.reward()
        );
        assert!(!state.is_terminal());
        assert_eq!(state.representation().len(), common::FEATURE_LEN);
    }
}

#[test]
fn test_one_update_moves_towards_target() {
    let mut agent = trained_agent(50, 3, 5);
    assert_eq!(agent.abstractor().codebook_size(), 3);

    let mut rng = StdRng::seed_from_u64(5);
    let start_x = agent.extractor().config().start_x;
    let initial = agent.learner().params().initial_value;
    let gamma = agent.learner().params().gamma;
    let alpha = agent.learner().params().alpha;

    let first = agent.observe(&random_observation(&mut rng, start_x + 2.0)).unwrap();
    let action = agent.act().unwrap();
    let second = agent.observe(&random_observation(&mut rng, start_x + 5.0)).unwrap();

    let reward = second.reward;
    assert!((reward - 2.5).abs() < 1e-9);
    let target = reward + gamma * initial;
    let value = second.updated_value.unwrap();

    assert_eq!(agent.learner().value(first.state_id, action), value);
    assert!((value - target).abs() < (initial - target).abs());
    assert!((value - (initial + alpha * (target - initial))).abs() < 1e-12);
    assert_eq!(agent.phase(), EpisodePhase::Updating);
}

#[test]
fn test_training_run_on_synthetic_level() {
    let config = AgentConfig::new()
        .with_seed(3)
        .with_components(4)
        .with_clusters(12)
        .with_episodes(4)
        .with_batch_size(150)
        .with_max_steps(120);
    let app = App::for_testing()
        .with_repository(InMemoryRepository::new())
        .build();

    let mut agent = app.create_agent(&config).unwrap();
    let mut level = app.create_level(&config).unwrap();
    let mut pipeline = TrainingPipeline::new(config.training.clone());

    let result = pipeline.run(&mut level, &mut agent).unwrap();
    assert_eq!(result.episodes, 4);
    assert_eq!(result.codebook_size, 12);
    assert!(result.batch_size > 12);
    assert!(result.learned_pairs > 0);
    assert!(result.cache.hits + result.cache.misses > 0);

    let learned_before = agent.learner().table().clone();
    let report = pipeline.evaluate(&mut level, &mut agent, 2).unwrap();
    assert_eq!(report.episodes, 2);
    assert_eq!(agent.learner().table(), &learned_before);
    assert!(agent.is_learning());
}

#[test]
fn test_trained_agent_survives_save_and_load() {
    let config = AgentConfig::new()
        .with_seed(8)
        .with_components(3)
        .with_clusters(6)
        .with_episodes(2)
        .with_batch_size(80)
        .with_max_steps(60);
    let app = App::for_testing()
        .with_repository(InMemoryRepository::new())
        .build();

    let mut agent = app.create_agent(&config).unwrap();
    let mut level = app.create_level(&config).unwrap();
    TrainingPipeline::new(config.training.clone())
        .run(&mut level, &mut agent)
        .unwrap();

    let path = std::path::Path::new("agents/run.msgpack");
    app.save_agent(&agent, TrainingMetadata::default(), path)
        .unwrap();
    let mut loaded = app.load_agent(path, None).unwrap();

    assert_eq!(loaded.learner().table(), agent.learner().table());
    assert_eq!(
        loaded.abstractor().codebook(),
        agent.abstractor().codebook()
    );

    level.reset().unwrap();
    let observation = level.observe().unwrap();
    agent.reset_episode();
    loaded.reset_episode();
    assert_eq!(
        loaded.observe(&observation).unwrap().state_id,
        agent.observe(&observation).unwrap().state_id
    );
}

#[test]
fn test_synthetic_level_ends_within_time_limit() {
    let mut level = SyntheticLevel::new(LevelConfig {
        time_limit: 30,
        ..LevelConfig::default()
    })
    .unwrap();
    level.reset().unwrap();
    let mut steps = 0;
    while !level.is_finished() {
        level.apply(Action::Stay.buttons()).unwrap();
        steps += 1;
        assert!(steps <= 30);
    }
}

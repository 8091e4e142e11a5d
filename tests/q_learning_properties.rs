//! Properties of the value learner: contraction, exploration bounds, persistence

use platformer_q::{
    Action, Error, LearningParams, QLearningAgent, ValueTable, q_learning::GreedyFloor,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn learner(epsilon: f64, seed: u64) -> QLearningAgent {
    QLearningAgent::new(LearningParams {
        epsilon,
        ..LearningParams::default()
    })
    .unwrap()
    .with_seed(seed)
}

#[test]
fn test_update_contracts_towards_target() {
    let mut agent = learner(0.0, 1);
    // State 1 never gets values, so its best value stays at the initial 20.
    let reward = 3.0;
    let target = reward + 0.9 * 20.0;

    let mut gap = (agent.value(0, Action::Right) - target).abs();
    for _ in 0..30 {
        let value = agent.update(0, Action::Right, reward, 1);
        let next_gap = (value - target).abs();
        assert!(next_gap < gap);
        gap = next_gap;
    }
    assert!(gap < 1e-3);
}

#[test]
fn test_epsilon_zero_is_always_greedy() {
    let mut agent = learner(0.0, 7);
    agent.table_mut().set(4, Action::Jump, 50.0);
    for _ in 0..1000 {
        assert_eq!(agent.select_action(4), Action::Jump);
    }
}

#[test]
fn test_epsilon_one_never_picks_greedy() {
    let mut agent = learner(1.0, 7);
    agent.table_mut().set(4, Action::Jump, 50.0);
    let mut seen = std::collections::HashSet::new();
    for _ in 0..2000 {
        let action = agent.select_action(4);
        assert_ne!(action, Action::Jump);
        seen.insert(action);
    }
    assert_eq!(seen.len(), Action::COUNT - 1);
}

#[test]
fn test_legacy_floor_masks_values_below_zero() {
    let mut table = ValueTable::new(-5.0);
    table.set(0, Action::Left, -1.0);
    assert_eq!(table.greedy_action(0, GreedyFloor::Zero), Action::Stay);
    assert_eq!(table.max_value(0, GreedyFloor::Zero), 0.0);
    assert_eq!(table.greedy_action(0, GreedyFloor::Unbounded), Action::Left);
    assert_eq!(table.max_value(0, GreedyFloor::Unbounded), -1.0);
}

#[test]
fn test_round_trip_is_bit_exact() {
    let mut rng = StdRng::seed_from_u64(21);
    let mut table = ValueTable::new(20.0);
    for _ in 0..200 {
        let state = rng.random_range(0..64);
        let action = Action::ALL[rng.random_range(0..Action::COUNT)];
        table.set(state, action, rng.random_range(-1000.0..1000.0));
    }
    table.set(63, Action::Stay, f64::MIN_POSITIVE);
    table.set(62, Action::Stay, -0.0);

    let restored = ValueTable::import(&table.export().unwrap()).unwrap();
    assert_eq!(restored.len(), table.len());
    for (a, b) in table.records().iter().zip(restored.records()) {
        assert_eq!((a.state_id, a.action_id), (b.state_id, b.action_id));
        assert_eq!(a.value.to_bits(), b.value.to_bits());
    }
    assert_eq!(restored.initial_value(), 20.0);
}

#[test]
fn test_failed_import_keeps_prior_table() {
    let mut table = ValueTable::new(20.0);
    table.set(2, Action::JumpSpeed, 4.5);
    let before = table.clone();

    assert!(matches!(
        table.import_into(b"definitely not msgpack"),
        Err(Error::Load { .. })
    ));
    assert_eq!(table, before);
}

#[test]
fn test_same_seed_same_choices() {
    let mut a = learner(0.5, 99);
    let mut b = learner(0.5, 99);
    let first: Vec<Action> = (0..100).map(|s| a.select_action(s % 5)).collect();
    let second: Vec<Action> = (0..100).map(|s| b.select_action(s % 5)).collect();
    assert_eq!(first, second);
}

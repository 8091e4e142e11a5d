//! Value table for abstracted state-action pairs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Action, StateActionKey};

/// Where the greedy search starts its running best value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GreedyFloor {
    /// Start at −∞: the greedy action is always the true argmax.
    #[default]
    Unbounded,
    /// Start at 0 with `Stay` as fallback. An action only wins if its
    /// value is strictly positive, so a table of all-negative values
    /// selects `Stay` and reports a best value of 0.
    Zero,
}

impl GreedyFloor {
    fn start(self) -> f64 {
        match self {
            GreedyFloor::Unbounded => f64::NEG_INFINITY,
            GreedyFloor::Zero => 0.0,
        }
    }
}

/// One persisted `(state, action) -> value` entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub state_id: usize,
    pub action_id: usize,
    pub value: f64,
}

/// Action values keyed by abstract state and action.
///
/// Unseen keys read as the optimistic `initial_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable {
    values: HashMap<StateActionKey, f64>,
    initial_value: f64,
}

impl ValueTable {
    pub fn new(initial_value: f64) -> Self {
        Self {
            values: HashMap::new(),
            initial_value,
        }
    }

    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    /// Change the default for keys not yet written. Stored values are kept.
    pub fn set_initial_value(&mut self, initial_value: f64) {
        self.initial_value = initial_value;
    }

    pub fn get(&self, state: usize, action: Action) -> f64 {
        self.values
            .get(&StateActionKey::new(state, action))
            .copied()
            .unwrap_or(self.initial_value)
    }

    pub fn set(&mut self, state: usize, action: Action, value: f64) {
        self.values.insert(StateActionKey::new(state, action), value);
    }

    pub fn contains(&self, state: usize, action: Action) -> bool {
        self.values.contains_key(&StateActionKey::new(state, action))
    }

    /// Greedy action and its value; ties keep the earlier action in
    /// [`Action::ALL`].
    pub fn best(&self, state: usize, floor: GreedyFloor) -> (Action, f64) {
        let mut best_action = Action::ALL[0];
        let mut best_value = floor.start();
        for action in Action::ALL {
            let value = self.get(state, action);
            if value > best_value {
                best_value = value;
                best_action = action;
            }
        }
        (best_action, best_value)
    }

    pub fn greedy_action(&self, state: usize, floor: GreedyFloor) -> Action {
        self.best(state, floor).0
    }

    pub fn max_value(&self, state: usize, floor: GreedyFloor) -> f64 {
        self.best(state, floor).1
    }

    /// Number of explicitly written pairs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest state id with a stored value.
    pub fn max_state(&self) -> Option<usize> {
        self.values.keys().map(|key| key.state).max()
    }

    /// Stored entries sorted by `(state_id, action_id)`.
    pub fn records(&self) -> Vec<ValueRecord> {
        let mut records: Vec<ValueRecord> = self
            .values
            .iter()
            .map(|(key, &value)| ValueRecord {
                state_id: key.state,
                action_id: key.action.id(),
                value,
            })
            .collect();
        records.sort_by_key(|r| (r.state_id, r.action_id));
        records
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub(crate) fn from_parts(initial_value: f64, values: HashMap<StateActionKey, f64>) -> Self {
        Self {
            values,
            initial_value,
        }
    }
}

impl Default for ValueTable {
    fn default() -> Self {
        Self::new(20.0)
    }
}

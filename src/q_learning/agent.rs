//! Q-learning agent over abstract states
//!
//! Epsilon-greedy selection here explores among the *non-greedy* actions
//! only: with probability ε one of the eleven actions other than the current
//! argmax is drawn uniformly, otherwise the argmax is played.

use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    Error, Result,
    q_learning::q_table::{GreedyFloor, ValueTable},
    types::Action,
};

/// Learning hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningParams {
    /// Exploration rate ε
    pub epsilon: f64,
    /// Learning rate α
    pub alpha: f64,
    /// Discount factor γ
    pub gamma: f64,
    /// Value read for unseen state-action pairs
    pub initial_value: f64,
    /// Starting point of the greedy search
    pub greedy_floor: GreedyFloor,
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            epsilon: 0.1,
            alpha: 0.3,
            gamma: 0.9,
            initial_value: 20.0,
            greedy_floor: GreedyFloor::Unbounded,
        }
    }
}

impl LearningParams {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if ε, α or γ leave `[0, 1]`
    /// or the initial value is not finite.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("epsilon", self.epsilon),
            ("alpha", self.alpha),
            ("gamma", self.gamma),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::invalid_config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !self.initial_value.is_finite() {
            return Err(Error::invalid_config("initial value must be finite"));
        }
        Ok(())
    }
}

fn build_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

/// Tabular Q-learning agent (off-policy TD control).
#[derive(Debug, Clone)]
pub struct QLearningAgent {
    table: ValueTable,
    params: LearningParams,
    rng: StdRng,
    rng_seed: Option<u64>,
}

impl QLearningAgent {
    /// # Errors
    ///
    /// See [`LearningParams::validate`].
    pub fn new(params: LearningParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            table: ValueTable::new(params.initial_value),
            params,
            rng: build_rng(None),
            rng_seed: None,
        })
    }

    /// Resume learning on an existing table.
    ///
    /// The table's stored values are kept; its default for unseen pairs is
    /// replaced by `params.initial_value`.
    pub fn with_table(params: LearningParams, mut table: ValueTable) -> Result<Self> {
        params.validate()?;
        table.set_initial_value(params.initial_value);
        Ok(Self {
            table,
            params,
            rng: build_rng(None),
            rng_seed: None,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.rng_seed = Some(seed);
        self
    }

    pub fn params(&self) -> &LearningParams {
        &self.params
    }

    pub fn seed(&self) -> Option<u64> {
        self.rng_seed
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut ValueTable {
        &mut self.table
    }

    pub fn into_table(self) -> ValueTable {
        self.table
    }

    /// Replace all hyperparameters; takes effect on the next call.
    pub fn set_params(&mut self, params: LearningParams) -> Result<()> {
        params.validate()?;
        self.table.set_initial_value(params.initial_value);
        self.params = params;
        Ok(())
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<()> {
        self.set_params(LearningParams {
            epsilon,
            ..self.params
        })
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        self.set_params(LearningParams {
            alpha,
            ..self.params
        })
    }

    pub fn set_gamma(&mut self, gamma: f64) -> Result<()> {
        self.set_params(LearningParams {
            gamma,
            ..self.params
        })
    }

    pub fn set_initial_value(&mut self, initial_value: f64) -> Result<()> {
        self.set_params(LearningParams {
            initial_value,
            ..self.params
        })
    }

    pub fn set_greedy_floor(&mut self, greedy_floor: GreedyFloor) {
        self.params.greedy_floor = greedy_floor;
    }

    pub fn value(&self, state: usize, action: Action) -> f64 {
        self.table.get(state, action)
    }

    pub fn greedy_action(&self, state: usize) -> Action {
        self.table.greedy_action(state, self.params.greedy_floor)
    }

    /// ε-greedy choice; exploration never returns the greedy action.
    pub fn select_action(&mut self, state: usize) -> Action {
        let greedy = self.greedy_action(state);
        if self.rng.random::<f64>() >= self.params.epsilon {
            return greedy;
        }
        let others: Vec<Action> = Action::ALL
            .into_iter()
            .filter(|&action| action != greedy)
            .collect();
        others.choose(&mut self.rng).copied().unwrap_or(greedy)
    }

    /// Q-learning update; returns the new value of `(prev, action)`.
    ///
    /// Q(s,a) ← Q(s,a) + α[r + γ max_a' Q(s',a') − Q(s,a)]
    pub fn update(&mut self, prev: usize, action: Action, reward: f64, next: usize) -> f64 {
        let old = self.table.get(prev, action);
        let best_next = self.table.max_value(next, self.params.greedy_floor);
        let target = reward + self.params.gamma * best_next;
        let new = old + self.params.alpha * (target - old);
        self.table.set(prev, action, new);
        trace!(prev, next, %action, reward, old, new, "value update");
        new
    }
}

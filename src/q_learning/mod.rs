//! Q-learning over abstract states
//!
//! Temporal-difference control on the discrete state space produced by
//! [`crate::abstraction::StateAbstractor`]. Each step bootstraps the value of
//! the previous state-action pair from the best value of the next state:
//!
//! ```text
//! Q(s,a) ← Q(s,a) + α[r + γ max_a' Q(s',a') − Q(s,a)]
//! ```
//!
//! Unseen pairs read as an optimistic initial value (20 by default), which
//! pushes early greedy play toward untried actions.
//!
//! ## Usage Example
//!
//! ```no_run
//! use platformer_q::q_learning::{LearningParams, QLearningAgent};
//!
//! # fn main() -> platformer_q::Result<()> {
//! let mut agent = QLearningAgent::new(LearningParams::default())?.with_seed(7);
//! let action = agent.select_action(0);
//! agent.update(0, action, 1.5, 3);
//! let blob = agent.table().export()?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod q_table;
pub mod serialization;

pub use agent::{LearningParams, QLearningAgent};
pub use q_table::{GreedyFloor, ValueRecord, ValueTable};
pub use serialization::{SavedAgent, SavedValueTable, TrainingMetadata};

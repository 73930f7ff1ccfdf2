//! Tabular Q-learning core: state encoding, reward shaping, value table and
//! epsilon-greedy policy.

pub mod action;
pub mod policy;
pub mod q_table;
pub mod reward;
pub mod state;

pub use action::Action;
pub use policy::Policy;
pub use q_table::{ActionValues, QLearningConfig, QTable};
pub use reward::{checkpoint_passed, RewardModel};
pub use state::{encode, StateEncoder, StateKey};

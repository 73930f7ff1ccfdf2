//! Tabular action-value store.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use tracing::debug;

use super::action::Action;
use super::state::StateKey;

/// Hyper-parameters of the temporal-difference update (JSON/TOML-loadable).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QLearningConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.95,
        }
    }
}

/// One value per action, indexed by [`Action::index`].
pub type ActionValues = [f64; Action::COUNT];

/// Maps each visited state to the estimated value of every action.
///
/// A row always holds all actions: rows are created whole, at 0.0, the first
/// time a state is looked up or updated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    config: QLearningConfig,
    rows: BTreeMap<StateKey, ActionValues>,
}

impl QTable {
    pub fn new(config: QLearningConfig) -> Self {
        Self {
            config,
            rows: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> QLearningConfig {
        self.config
    }

    pub fn set_config(&mut self, config: QLearningConfig) {
        self.config = config;
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, state: &StateKey) -> bool {
        self.rows.contains_key(state)
    }

    /// Read-only access; does not create the row.
    pub fn row(&self, state: &StateKey) -> Option<&ActionValues> {
        self.rows.get(state)
    }

    pub fn ensure_row(&mut self, state: &StateKey) -> &mut ActionValues {
        self.rows.entry(*state).or_insert([0.0; Action::COUNT])
    }

    pub fn value(&mut self, state: &StateKey, action: Action) -> f64 {
        self.ensure_row(state)[action.index()]
    }

    pub fn set_value(&mut self, state: &StateKey, action: Action, value: f64) {
        self.ensure_row(state)[action.index()] = value;
    }

    /// Highest-valued action; on an exact tie the earliest in [`Action::ALL`].
    pub fn best_action(&mut self, state: &StateKey) -> Action {
        let row = self.ensure_row(state);
        let mut best = Action::ALL[0];
        for action in Action::ALL.into_iter().skip(1) {
            if row[action.index()] > row[best.index()] {
                best = action;
            }
        }
        best
    }

    pub fn max_value(&mut self, state: &StateKey) -> f64 {
        let best = self.best_action(state);
        self.value(state, best)
    }

    /// Q-learning update:
    /// `Q(s,a) = (1-α)·Q(s,a) + α·(r + γ·max_a' Q(s',a'))`.
    pub fn update(&mut self, state: &StateKey, action: Action, reward: f64, next_state: &StateKey) {
        self.ensure_row(state);
        let next_max = self.max_value(next_state);

        let QLearningConfig {
            learning_rate,
            discount_factor,
        } = self.config;
        let old = self.value(state, action);
        let new = (1.0 - learning_rate) * old
            + learning_rate * (reward + discount_factor * next_max);
        self.set_value(state, action, new);

        debug!(
            ?state,
            %action,
            reward,
            old,
            new,
            "q-update"
        );
    }

    /// Rows in state order.
    pub fn iter(&self) -> btree_map::Iter<'_, StateKey, ActionValues> {
        self.rows.iter()
    }

    /// Every `(state, action, value)` triple, ordered by state then action.
    pub fn entries(&self) -> impl Iterator<Item = (StateKey, Action, f64)> + '_ {
        self.rows.iter().flat_map(|(state, values)| {
            Action::ALL
                .into_iter()
                .map(move |action| (*state, action, values[action.index()]))
        })
    }

    /// Rows holding at least one non-zero estimate.
    pub fn trained_rows(&self) -> usize {
        self.rows
            .values()
            .filter(|values| values.iter().any(|v| *v != 0.0))
            .count()
    }
}

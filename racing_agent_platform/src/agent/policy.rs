use rand::Rng;

use super::action::Action;
use super::q_table::QTable;
use super::state::StateKey;

/// Epsilon-greedy action selection.
///
/// Epsilon is passed on every call so decay schedules stay with the caller.
#[derive(Debug, Clone)]
pub struct Policy<R> {
    rng: R,
}

impl<R: Rng> Policy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Uniformly random action with probability `epsilon`, otherwise the
    /// table's best action for `state`.
    pub fn choose_action(&mut self, table: &mut QTable, state: &StateKey, epsilon: f64) -> Action {
        if self.rng.gen::<f64>() < epsilon {
            Action::ALL[self.rng.gen_range(0..Action::COUNT)]
        } else {
            table.best_action(state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn state() -> StateKey {
        StateKey::new(0.0, 0.0, 0.0, 10.0, 0)
    }

    #[test]
    fn zero_epsilon_is_greedy() {
        let mut table = QTable::default();
        table.set_value(&state(), Action::Right, 1.0);
        let mut policy = Policy::new(StdRng::seed_from_u64(7));
        for _ in 0..100 {
            assert_eq!(policy.choose_action(&mut table, &state(), 0.0), Action::Right);
        }
    }

    #[test]
    fn full_epsilon_explores_every_action() {
        let mut table = QTable::default();
        table.set_value(&state(), Action::Right, 1.0);
        let mut policy = Policy::new(StdRng::seed_from_u64(7));
        let seen: HashSet<_> = (0..500)
            .map(|_| policy.choose_action(&mut table, &state(), 1.0))
            .collect();
        assert_eq!(seen.len(), Action::COUNT);
    }

    #[test]
    fn same_seed_same_choices() {
        let mut table = QTable::default();
        let mut a = Policy::new(StdRng::seed_from_u64(42));
        let mut b = Policy::new(StdRng::seed_from_u64(42));
        let xs: Vec<_> = (0..50).map(|_| a.choose_action(&mut table, &state(), 0.5)).collect();
        let ys: Vec<_> = (0..50).map(|_| b.choose_action(&mut table, &state(), 0.5)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn exploitation_touches_the_row() {
        let mut table = QTable::default();
        let mut policy = Policy::new(StdRng::seed_from_u64(1));
        policy.choose_action(&mut table, &state(), 0.0);
        assert!(table.contains(&state()));
    }
}

use serde::{Deserialize, Serialize};

use super::state::StateKey;

/// Reward shaping for one transition between discretised states.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardModel {
    pub checkpoint_bonus: f64,
    pub stationary_penalty: f64,
    /// Bucket distance under which the car counts as not having moved.
    pub stationary_distance: f64,
}

impl Default for RewardModel {
    fn default() -> Self {
        Self {
            checkpoint_bonus: 1000.0,
            stationary_penalty: 50.0,
            stationary_distance: 0.1,
        }
    }
}

impl RewardModel {
    /// Progress reward: distance covered scaled by speed, plus a bonus for a
    /// new checkpoint and a penalty for standing still.
    ///
    /// The first sample of an episode has no predecessor and scores 0.
    pub fn reward(
        &self,
        current: &StateKey,
        previous: Option<&StateKey>,
        checkpoint_passed: bool,
    ) -> f64 {
        let Some(previous) = previous else {
            return 0.0;
        };

        let distance = current.distance_to(previous);
        let mut reward = distance * (current.speed / 100.0);

        if checkpoint_passed {
            reward += self.checkpoint_bonus;
        }
        if distance < self.stationary_distance {
            reward -= self.stationary_penalty;
        }
        reward
    }
}

/// Strict increase only. Respawns that lower the counter or laps that wrap it
/// are not recognised.
pub fn checkpoint_passed(previous: Option<i64>, current: i64) -> bool {
    previous.is_some_and(|p| current > p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(x: f64, speed: f64, cp: i64) -> StateKey {
        StateKey::new(x, 0.0, 0.0, speed, cp)
    }

    #[test]
    fn first_sample_scores_zero() {
        let model = RewardModel::default();
        assert_eq!(model.reward(&key(10.0, 50.0, 0), None, false), 0.0);
        assert_eq!(model.reward(&key(10.0, 50.0, 0), None, true), 0.0);
    }

    #[test]
    fn distance_scaled_by_speed() {
        let model = RewardModel::default();
        let r = model.reward(&key(10.0, 50.0, 0), Some(&key(0.0, 0.0, 0)), false);
        assert_eq!(r, 5.0);
    }

    #[test]
    fn standing_still_is_penalised() {
        let model = RewardModel::default();
        let r = model.reward(&key(10.0, 50.0, 1), Some(&key(10.0, 50.0, 0)), true);
        assert_eq!(r, 950.0);
    }

    #[test]
    fn checkpoint_detection_is_strict() {
        assert!(!checkpoint_passed(None, 3));
        assert!(!checkpoint_passed(Some(3), 3));
        assert!(!checkpoint_passed(Some(3), 0));
        assert!(checkpoint_passed(Some(3), 5));
    }
}

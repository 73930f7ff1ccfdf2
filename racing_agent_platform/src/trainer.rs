//! Offline Q-learning over recorded telemetry.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::agent::{checkpoint_passed, Policy, QTable, RewardModel, StateEncoder, StateKey};
use crate::report::TrainingReport;
use crate::telemetry::TelemetrySample;

/// Exploration schedule. Epsilon decays once per episode and never resets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplorationConfig {
    pub initial_epsilon: f64,
    pub min_epsilon: f64,
    pub decay_rate: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            initial_epsilon: 0.3,
            min_epsilon: 0.01,
            decay_rate: 0.995,
        }
    }
}

impl ExplorationConfig {
    pub fn decay(&self, epsilon: f64) -> f64 {
        (epsilon * self.decay_rate).max(self.min_epsilon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub episodes: usize,
    /// Log a progress line every this many frames.
    pub progress_interval: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 100,
            progress_interval: 100,
        }
    }
}

/// Replays a telemetry sequence as episodes, updating a borrowed Q-table.
pub struct Trainer<R> {
    config: TrainingConfig,
    exploration: ExplorationConfig,
    encoder: StateEncoder,
    reward_model: RewardModel,
    policy: Policy<R>,
    epsilon: f64,
}

impl<R: Rng> Trainer<R> {
    pub fn new(config: TrainingConfig, exploration: ExplorationConfig, rng: R) -> Self {
        Self {
            config,
            exploration,
            encoder: StateEncoder::default(),
            reward_model: RewardModel::default(),
            policy: Policy::new(rng),
            epsilon: exploration.initial_epsilon,
        }
    }

    pub fn with_encoder(mut self, encoder: StateEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_reward_model(mut self, reward_model: RewardModel) -> Self {
        self.reward_model = reward_model;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Run the configured number of episodes.
    pub fn train(&mut self, table: &mut QTable, samples: &[TelemetrySample]) -> TrainingReport {
        self.train_episodes(table, samples, self.config.episodes)
    }

    #[instrument(skip(self, table, samples), fields(frames = samples.len()))]
    pub fn train_episodes(
        &mut self,
        table: &mut QTable,
        samples: &[TelemetrySample],
        episodes: usize,
    ) -> TrainingReport {
        info!(episodes, epsilon = self.epsilon, "training started");

        let mut episode_rewards = Vec::with_capacity(episodes);
        for episode in 0..episodes {
            let total = self.run_episode(table, samples);
            episode_rewards.push(total);
            info!(
                episode = episode + 1,
                episodes,
                total_reward = total,
                epsilon = self.epsilon,
                states = table.len(),
                "episode finished"
            );
            self.epsilon = self.exploration.decay(self.epsilon);
        }

        info!(states = table.len(), epsilon = self.epsilon, "training finished");
        TrainingReport {
            episode_rewards,
            final_epsilon: self.epsilon,
        }
    }

    /// One pass over `samples`. Each transition updates the *previous* state
    /// with an action chosen for it at the current epsilon. Epsilon itself is
    /// left untouched.
    pub fn run_episode(&mut self, table: &mut QTable, samples: &[TelemetrySample]) -> f64 {
        let mut previous_state: Option<StateKey> = None;
        let mut previous_checkpoint: Option<i64> = None;
        let mut total = 0.0;

        for (frame, sample) in samples.iter().enumerate() {
            let current_state = self.encoder.encode(sample);
            let passed = checkpoint_passed(previous_checkpoint, sample.checkpoint);

            if let Some(previous) = previous_state {
                let reward = self
                    .reward_model
                    .reward(&current_state, Some(&previous), passed);
                let action = self.policy.choose_action(table, &previous, self.epsilon);
                table.update(&previous, action, reward, &current_state);
                total += reward;
            }

            previous_state = Some(current_state);
            previous_checkpoint = Some(sample.checkpoint);

            if self.config.progress_interval > 0 && frame % self.config.progress_interval == 0 {
                debug!(frame, frames = samples.len(), "training progress");
            }
        }

        total
    }
}

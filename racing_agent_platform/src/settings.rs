//! Layered configuration: embedded defaults, optional files, environment.

use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::actuator::KeyBindings;
use crate::agent::{QLearningConfig, RewardModel, StateEncoder};
use crate::model_store::ModelStoreConfig;
use crate::run_loop::RunConfig;
use crate::stagnation::StagnationConfig;
use crate::trainer::{ExplorationConfig, TrainingConfig};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            enable_target: false,
        }
    }
}

/// Where telemetry sessions are looked up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub root: PathBuf,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

/// Main settings structure with all configuration sections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub learning: QLearningConfig,
    pub exploration: ExplorationConfig,
    pub reward: RewardModel,
    pub encoder: StateEncoder,
    pub training: TrainingConfig,
    pub stagnation: StagnationConfig,
    pub run: RunConfig,
    pub keys: KeyBindings,
    pub model: ModelStoreConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from the embedded defaults, `racer.toml` in the working
    /// directory, an explicit file if given, and `RACER__*` variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            // Start with default settings
            .add_source(File::from_str(
                include_str!("../config.toml"),
                FileFormat::Toml,
            ))
            // Add local config file if it exists
            .add_source(File::with_name("racer").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // Environment variables, e.g. RACER__RUN__EPSILON=0.05
            .add_source(
                Environment::with_prefix("RACER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;

        Self::apply_env_overrides(&mut settings)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Short-form overrides for the settings changed most often.
    fn apply_env_overrides(settings: &mut Settings) -> Result<()> {
        if let Ok(dir) = std::env::var("RACER_MODEL_DIR") {
            settings.model.directory = PathBuf::from(dir);
        }
        if let Ok(level) = std::env::var("RACER_LOG_LEVEL") {
            settings.logging.level = level;
        }
        if let Ok(episodes) = std::env::var("RACER_EPISODES") {
            settings.training.episodes = episodes.parse()?;
        }
        Ok(())
    }

    /// Validate settings for consistency
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| -> Result<()> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(anyhow!("{} must be within [0, 1], got {}", name, v))
            }
        };
        let positive = |name: &str, v: f64| -> Result<()> {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(anyhow!("{} must be positive, got {}", name, v))
            }
        };
        let non_negative = |name: &str, v: f64| -> Result<()> {
            if v >= 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(anyhow!("{} cannot be negative, got {}", name, v))
            }
        };

        // Learning
        positive("learning.learning_rate", self.learning.learning_rate)?;
        unit("learning.learning_rate", self.learning.learning_rate)?;
        unit("learning.discount_factor", self.learning.discount_factor)?;

        // Exploration
        unit("exploration.initial_epsilon", self.exploration.initial_epsilon)?;
        unit("exploration.min_epsilon", self.exploration.min_epsilon)?;
        positive("exploration.decay_rate", self.exploration.decay_rate)?;
        unit("exploration.decay_rate", self.exploration.decay_rate)?;
        if self.exploration.min_epsilon > self.exploration.initial_epsilon {
            warn!(
                "min_epsilon {} is above initial_epsilon {}; exploration will not decay",
                self.exploration.min_epsilon, self.exploration.initial_epsilon
            );
        }

        // Encoding and reward
        positive("encoder.position_grid", self.encoder.position_grid)?;
        positive("encoder.speed_grid", self.encoder.speed_grid)?;
        non_negative("reward.stationary_distance", self.reward.stationary_distance)?;

        // Stagnation and run loop
        non_negative("stagnation.movement_threshold", self.stagnation.movement_threshold)?;
        positive(
            "stagnation.stagnation_threshold_secs",
            self.stagnation.stagnation_threshold_secs,
        )?;
        unit("run.epsilon", self.run.epsilon)?;
        non_negative("run.start_delay_secs", self.run.start_delay_secs)?;
        non_negative("run.settle_delay_secs", self.run.settle_delay_secs)?;
        non_negative("run.restart_pulse_secs", self.run.restart_pulse_secs)?;
        non_negative("run.reset_wait_secs", self.run.reset_wait_secs)?;

        if self.model.file_prefix.is_empty() {
            return Err(anyhow!("model.file_prefix cannot be empty"));
        }

        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => return Err(anyhow!("Unknown logging format '{}'", other)),
        }

        if !self.telemetry.root.exists() {
            warn!("Telemetry root does not exist: {:?}", self.telemetry.root);
        }

        Ok(())
    }
}

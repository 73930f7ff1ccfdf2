//! The train / run / analyze workflows behind the CLI.

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::actuator::{KeyboardActuator, TracingKeySink};
use crate::agent::QTable;
use crate::analysis::PerformanceSummary;
use crate::clock::SystemClock;
use crate::model_store::ModelStore;
use crate::report::DEFAULT_ROLLING_WINDOW;
use crate::run_loop::{RunLoop, RunOutcome};
use crate::settings::Settings;
use crate::telemetry::{CsvTelemetrySource, TelemetrySample, TelemetrySource};
use crate::trainer::{Trainer, TrainingConfig};

#[derive(Debug, Clone, Default)]
pub struct TrainOptions {
    pub session: String,
    pub episodes: Option<usize>,
    pub load: Option<PathBuf>,
    pub seed: Option<u64>,
    pub report: Option<PathBuf>,
    pub test: bool,
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn read_session(settings: &Settings, session: &str) -> Result<Vec<TelemetrySample>> {
    let source = CsvTelemetrySource::new(&settings.telemetry.root);
    let samples = source
        .read_session(session)
        .with_context(|| format!("reading telemetry session '{}'", session))?;
    if samples.is_empty() {
        warn!(session, "telemetry session has no usable rows");
    }
    Ok(samples)
}

/// Train on a recording, save the model, optionally export the reward
/// history and replay the result.
#[instrument(skip(settings, options), fields(session = %options.session))]
pub fn train(settings: &Settings, options: TrainOptions) -> Result<PathBuf> {
    let samples = read_session(settings, &options.session)?;
    let store = ModelStore::new(settings.model.clone());

    let mut table = match &options.load {
        Some(path) => {
            let mut table = store
                .load(path)
                .with_context(|| format!("loading model {}", path.display()))?;
            table.set_config(settings.learning);
            table
        }
        None => QTable::new(settings.learning),
    };

    let config = TrainingConfig {
        episodes: options.episodes.unwrap_or(settings.training.episodes),
        ..settings.training
    };
    let mut trainer = Trainer::new(config, settings.exploration, rng(options.seed))
        .with_encoder(settings.encoder)
        .with_reward_model(settings.reward);
    let report = trainer.train(&mut table, &samples);

    if let Some((episode, reward)) = report.best_episode() {
        info!(best_episode = episode + 1, best_reward = reward, "training summary");
    }

    let model_path = store.save(&table).context("saving model")?;

    if let Some(path) = &options.report {
        report.write_json(path, DEFAULT_ROLLING_WINDOW)?;
        info!(path = %path.display(), "training report written");
    }

    if options.test {
        let outcome = drive(settings, &mut table, &samples, options.seed);
        log_outcome(&outcome);
        analyze_samples(&samples);
    }

    Ok(model_path)
}

/// Replay a saved model against a recording.
#[instrument(skip(settings))]
pub fn run(settings: &Settings, session: &str, model: Option<&Path>, seed: Option<u64>) -> Result<RunOutcome> {
    let store = ModelStore::new(settings.model.clone());
    let model_path = match model {
        Some(path) => path.to_path_buf(),
        None => store
            .latest()?
            .ok_or_else(|| anyhow!("no saved model in {}", store.directory().display()))?,
    };

    let mut table = store
        .load(&model_path)
        .with_context(|| format!("loading model {}", model_path.display()))?;
    let samples = read_session(settings, session)?;

    let outcome = drive(settings, &mut table, &samples, seed);
    log_outcome(&outcome);
    Ok(outcome)
}

/// Summarise a recording.
pub fn analyze(settings: &Settings, session: &str) -> Result<PerformanceSummary> {
    let samples = read_session(settings, session)?;
    analyze_samples(&samples).ok_or_else(|| anyhow!("session '{}' is empty", session))
}

fn analyze_samples(samples: &[TelemetrySample]) -> Option<PerformanceSummary> {
    let summary = PerformanceSummary::from_samples(samples)?;
    summary.log();
    Some(summary)
}

fn drive(settings: &Settings, table: &mut QTable, samples: &[TelemetrySample], seed: Option<u64>) -> RunOutcome {
    let actuator = KeyboardActuator::new(TracingKeySink, settings.keys);
    let mut run_loop = RunLoop::new(
        table,
        actuator,
        SystemClock,
        rng(seed),
        settings.run,
        settings.stagnation,
    )
    .with_encoder(settings.encoder);
    run_loop.run(samples)
}

fn log_outcome(outcome: &RunOutcome) {
    if outcome.restarted {
        warn!(frames = outcome.frames, "run stopped after a restart");
    } else {
        info!(
            frames = outcome.frames,
            elapsed_secs = outcome.elapsed.as_secs_f64(),
            "run completed"
        );
    }
}

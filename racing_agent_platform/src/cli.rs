//! Command-line interface definitions using clap derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Q-learning driver for racing telemetry
#[derive(Parser)]
#[command(name = "racer-cli")]
#[command(about = "Train a tabular driving policy from telemetry and replay it")]
#[command(version)]
pub struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train on a telemetry recording and save the model
    Train {
        /// Telemetry CSV (path or session name under the telemetry root)
        #[arg(long)]
        csv: String,
        /// Number of training episodes (defaults to the configured value)
        #[arg(long)]
        episodes: Option<usize>,
        /// Continue from an existing model
        #[arg(long)]
        load: Option<PathBuf>,
        /// Seed the exploration RNG for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
        /// Write per-episode rewards and rolling mean as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        /// Replay the trained policy on the recording afterwards
        #[arg(long)]
        test: bool,
    },
    /// Replay a saved model against a telemetry recording in real time
    Run {
        #[arg(long)]
        csv: String,
        /// Model to drive with (defaults to the newest saved model)
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print performance statistics of a recording
    Analyze {
        #[arg(long)]
        csv: String,
    },
}

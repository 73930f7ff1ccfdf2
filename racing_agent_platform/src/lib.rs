//! Racing Agent Platform - Core Library
//!
//! Learns a tabular driving policy for a racing simulator from recorded
//! telemetry and replays it in real time, restarting the race when the car
//! gets stuck.

pub mod actuator;
pub mod agent;
pub mod analysis;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod error;
pub mod logging;
pub mod model_store;
pub mod report;
pub mod run_loop;
pub mod settings;
pub mod stagnation;
pub mod telemetry;
pub mod trainer;

pub use agent::{Action, Policy, QTable, StateKey};
pub use error::AgentError;
pub use model_store::ModelStore;
pub use run_loop::RunLoop;
pub use stagnation::StagnationMonitor;
pub use telemetry::TelemetrySample;
pub use trainer::Trainer;

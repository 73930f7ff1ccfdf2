//! Main entry point for the racer CLI.

use anyhow::Result;
use clap::Parser;
use racing_agent_platform::{
    cli, commands, logging, settings::Settings,
};
use tracing::info;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = cli::Cli::parse();

    // Load settings
    let settings = Settings::load(args.config.as_deref())?;

    // Initialize logging
    logging::init(&settings.logging)?;

    // Execute the requested command
    match args.command {
        cli::Commands::Train {
            csv,
            episodes,
            load,
            seed,
            report,
            test,
        } => {
            let model = commands::train(
                &settings,
                commands::TrainOptions {
                    session: csv,
                    episodes,
                    load,
                    seed,
                    report,
                    test,
                },
            )?;
            info!("model saved to {}", model.display());
            Ok(())
        }
        cli::Commands::Run { csv, model, seed } => {
            commands::run(&settings, &csv, model.as_deref(), seed)?;
            Ok(())
        }
        cli::Commands::Analyze { csv } => {
            commands::analyze(&settings, &csv)?;
            Ok(())
        }
    }
}

//! Tempo command line interface.
//!
//! The CLI reads a synthesis problem (plant, MTL specification, action
//! partition and maximal constant) from a JSON file, runs the tree search
//! and reports whether a controller exists; the controller and the labelled
//! search tree can be exported in DOT format. See `tempo --help` for all
//! commands and options.

use human_panic::setup_panic;
use log::info;

use clap::Parser;

use cli::{initialize_logger, Cli, Commands};

mod cli;
mod problem;
mod tempo_config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_panic!();

    let cli = Cli::parse();
    initialize_logger(&cli.log_config)?;
    match cli.command {
        Commands::Synthesize {
            input,
            config_file,
            heuristic,
            incremental,
            terminate_early,
            multi_threaded,
            controller_out,
            tree_out,
        } => {
            cli::synthesize(
                input,
                config_file,
                heuristic,
                incremental,
                terminate_early,
                multi_threaded,
                controller_out,
                tree_out,
            )?;
        }
        Commands::Translate { input } => {
            cli::translate_specification(input)?;
        }
        Commands::Visualize { input, output } => {
            cli::visualize_plant(input, output)?;
        }
    }
    info!("Done.");
    Ok(())
}

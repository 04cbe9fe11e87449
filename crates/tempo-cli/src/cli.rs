//! Command definitions and command implementations.
//!
//! The CLI is built with `clap`; every command reads a JSON problem file
//! (see [`crate::problem`]) and drives the synthesis crates.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{debug, info, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use tempo_search::controller::create_controller;
use tempo_search::heuristics::{
    BfsHeuristic, CompositeHeuristic, DfsHeuristic, Heuristic, NumCanonicalWordsHeuristic,
    PreferEnvironmentActionHeuristic, TimeHeuristic,
};
use tempo_search::search_tree::NodeLabel;
use tempo_search::visualization::{search_tree_to_graphviz, ta_to_graphviz};
use tempo_search::TreeSearch;
use tempo_translation::translate_with_alphabet;

use crate::problem::Problem;
use crate::tempo_config::{HeuristicKind, TempoConfig};

/// Controller synthesis for timed automata against MTL specifications.
///
/// Reads a synthesis problem from a JSON file, builds the search tree over
/// the joint plant/specification state space, and reports whether the
/// specification of undesired behaviors can be avoided by the controller.
#[derive(Parser, Debug)]
#[command(version, name = "tempo", about, long_about)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) log_config: LoggerConfig,
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run the synthesis and report whether a controller exists.
    Synthesize {
        /// The problem file.
        #[arg(value_name = "PROBLEM_FILE")]
        input: PathBuf,

        /// Configuration file with synthesis settings.
        #[arg(short, long, value_name = "CONFIG_FILE")]
        config_file: Option<PathBuf>,

        /// Override the expansion heuristic.
        #[arg(long, value_enum)]
        heuristic: Option<HeuristicKind>,

        /// Label nodes while the tree is being built.
        #[arg(short, long, default_value_t = false)]
        incremental: bool,

        /// Cancel descendants of labelled nodes; implies --incremental.
        #[arg(short, long, default_value_t = false)]
        terminate_early: bool,

        /// Expand nodes on parallel worker threads.
        #[arg(short, long, default_value_t = false)]
        multi_threaded: bool,

        /// Write the extracted controller as a DOT graph.
        #[arg(long, value_name = "DOT_FILE")]
        controller_out: Option<PathBuf>,

        /// Write the labelled search tree as a DOT graph.
        #[arg(long, value_name = "DOT_FILE")]
        tree_out: Option<PathBuf>,
    },
    /// Print the alternating timed automaton of the specification.
    Translate {
        /// The problem file.
        #[arg(value_name = "PROBLEM_FILE")]
        input: PathBuf,
    },
    /// Write the plant automaton as a DOT graph.
    Visualize {
        /// The problem file.
        #[arg(value_name = "PROBLEM_FILE")]
        input: PathBuf,
        /// The output DOT file.
        #[arg(value_name = "DOT_FILE")]
        output: PathBuf,
    },
}

/// Verbosity options shared by all commands.
#[derive(Args, Debug)]
pub(crate) struct LoggerConfig {
    /// Increase the log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

/// Initialize the console logger with the requested verbosity.
pub(crate) fn initialize_logger(config: &LoggerConfig) -> anyhow::Result<()> {
    let level = if config.quiet {
        LevelFilter::Error
    } else {
        match config.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{h({l:<5})} {m}{n}")))
        .build();
    let log_config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .context("failed to assemble the logger configuration")?;
    log4rs::init_config(log_config).context("failed to initialize the logger")?;
    Ok(())
}

fn load_problem(input: &PathBuf) -> anyhow::Result<Problem> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("failed to read the problem file '{}'", input.display()))?;
    Problem::from_json(&content)
}

fn load_config(config_file: Option<PathBuf>) -> anyhow::Result<TempoConfig> {
    let mut settings = config::Config::builder();
    if let Some(config_file) = config_file {
        if !config_file.exists() {
            anyhow::bail!(
                "the configuration file '{}' does not exist",
                config_file.display()
            );
        }
        settings = settings.add_source(config::File::from(config_file));
    }
    settings = settings.add_source(config::Environment::with_prefix("TEMPO"));
    settings
        .build()
        .context("failed to read the configuration")?
        .try_deserialize::<TempoConfig>()
        .context("failed to interpret the configuration")
}

fn build_heuristic(
    kind: HeuristicKind,
    config: &TempoConfig,
    environment_actions: &BTreeSet<String>,
) -> Box<dyn Heuristic<String, String>> {
    match kind {
        HeuristicKind::Bfs => Box::new(BfsHeuristic::default()),
        HeuristicKind::Dfs => Box::new(DfsHeuristic::default()),
        HeuristicKind::Time => Box::new(TimeHeuristic),
        HeuristicKind::PreferEnvironment => Box::new(PreferEnvironmentActionHeuristic::new(
            environment_actions.clone(),
        )),
        HeuristicKind::NumWords => Box::new(NumCanonicalWordsHeuristic),
        HeuristicKind::Composite => {
            let parts: Vec<(i64, Box<dyn Heuristic<String, String>>)> = vec![
                (config.time_weight, Box::new(TimeHeuristic)),
                (
                    config.environment_weight,
                    Box::new(PreferEnvironmentActionHeuristic::new(
                        environment_actions.clone(),
                    )),
                ),
            ];
            Box::new(CompositeHeuristic::new(parts))
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn synthesize(
    input: PathBuf,
    config_file: Option<PathBuf>,
    heuristic: Option<HeuristicKind>,
    incremental: bool,
    terminate_early: bool,
    multi_threaded: bool,
    controller_out: Option<PathBuf>,
    tree_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_file)?;
    config.incremental_labeling |= incremental || terminate_early;
    config.terminate_early |= terminate_early;
    config.multi_threaded |= multi_threaded;
    if let Some(heuristic) = heuristic {
        config.heuristic = heuristic;
    }

    let problem = load_problem(&input)?;
    let plant = Arc::new(problem.to_plant()?);
    info!(
        "Parsed a plant with {} locations and {} transitions",
        plant.get_locations().len(),
        plant.get_transitions().count()
    );
    debug!("Plant:\n{plant}");

    let formula = problem.specification.to_formula();
    info!("Specification of undesired behaviors: {formula}");
    let ata = Arc::new(
        translate_with_alphabet(&formula, problem.specification_alphabet())
            .context("failed to translate the specification")?,
    );
    debug!("Specification automaton:\n{ata}");

    let search = TreeSearch::with_options(
        plant,
        ata,
        problem.controller_actions.clone(),
        problem.environment_actions.clone(),
        problem.max_constant,
        config.incremental_labeling,
        config.terminate_early,
        build_heuristic(config.heuristic, &config, &problem.environment_actions),
    )
    .context("failed to initialize the search")?;

    info!("Building the search tree");
    search.build_tree(config.multi_threaded);
    if !config.incremental_labeling {
        search.label();
    }
    info!("Search tree has {} nodes", search.get_size());

    let root = search.get_root();
    match root.label() {
        NodeLabel::Top => info!("A controller exists."),
        NodeLabel::Bottom => info!("No controller exists."),
        NodeLabel::Unlabeled | NodeLabel::Canceled => {
            anyhow::bail!("the search finished without labelling the root")
        }
    }

    if let Some(path) = tree_out {
        fs::write(&path, search_tree_to_graphviz(root))
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        info!("Wrote the labelled search tree to '{}'", path.display());
    }
    if let Some(path) = controller_out {
        if root.label() == NodeLabel::Top {
            let controller = create_controller(root, problem.max_constant)
                .context("failed to extract the controller")?;
            fs::write(&path, ta_to_graphviz(&controller))
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            info!("Wrote the controller to '{}'", path.display());
        } else {
            info!("Skipping the controller output, the root is not TOP");
        }
    }
    Ok(())
}

pub(crate) fn translate_specification(input: PathBuf) -> anyhow::Result<()> {
    let problem = load_problem(&input)?;
    let formula = problem.specification.to_formula();
    let ata = translate_with_alphabet(&formula, problem.specification_alphabet())
        .context("failed to translate the specification")?;
    println!("{ata}");
    Ok(())
}

pub(crate) fn visualize_plant(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let problem = load_problem(&input)?;
    let plant = problem.to_plant()?;
    fs::write(&output, ta_to_graphviz(&plant))
        .with_context(|| format!("failed to write '{}'", output.display()))?;
    info!("Wrote the plant to '{}'", output.display());
    Ok(())
}

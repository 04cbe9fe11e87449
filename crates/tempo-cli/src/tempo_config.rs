//! Configuration file and environment settings of the CLI.
//!
//! Settings can be provided through an optional configuration file (any
//! format the `config` crate understands) and are overridden by
//! `TEMPO_`-prefixed environment variables and the command line, in that
//! order.

use serde::Deserialize;

/// Settings of the synthesis run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TempoConfig {
    /// Label nodes while the tree is being built.
    pub incremental_labeling: bool,
    /// Cancel descendants of labelled nodes; implies incremental labelling.
    pub terminate_early: bool,
    /// Expand nodes on parallel worker threads.
    pub multi_threaded: bool,
    /// The default expansion heuristic.
    pub heuristic: HeuristicKind,
    /// Weight of the time heuristic in the composite heuristic.
    pub time_weight: i64,
    /// Weight of the environment-preference heuristic in the composite
    /// heuristic.
    pub environment_weight: i64,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            incremental_labeling: false,
            terminate_early: false,
            multi_threaded: false,
            heuristic: HeuristicKind::Bfs,
            time_weight: 1,
            environment_weight: 1,
        }
    }
}

/// The available expansion heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HeuristicKind {
    /// Breadth-first expansion.
    Bfs,
    /// Depth-first expansion.
    Dfs,
    /// Expand nodes reachable early first.
    Time,
    /// Prefer nodes reached by environment actions.
    PreferEnvironment,
    /// Prefer nodes with few canonical words.
    NumWords,
    /// Weighted combination of the time and environment heuristics.
    Composite,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_breadth_first_and_batch_labelled() {
        let config = TempoConfig::default();
        assert!(!config.incremental_labeling);
        assert!(!config.terminate_early);
        assert!(!config.multi_threaded);
        assert_eq!(config.heuristic, HeuristicKind::Bfs);
    }

    #[test]
    fn partial_configurations_deserialize() {
        let config: TempoConfig =
            serde_json::from_str(r#"{"heuristic": "prefer-environment", "time_weight": 3}"#)
                .unwrap();
        assert_eq!(config.heuristic, HeuristicKind::PreferEnvironment);
        assert_eq!(config.time_weight, 3);
        assert_eq!(config.environment_weight, 1);
    }
}

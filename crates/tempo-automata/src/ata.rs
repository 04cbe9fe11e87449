//! Alternating timed automata with a single clock.
//!
//! The specification side of the synthesis problem is an alternating timed
//! automaton: its transition function maps a location and an input symbol to
//! a [`formula::Formula`] over locations, clock constraints and clock
//! resets. A run maintains a *configuration* — a set of active locations,
//! each with its own copy of the single clock — and symbol steps branch over
//! the minimal models of the transition formulas.
//!
//! The automaton carries a dedicated sink location: a branch whose
//! transition formula is missing or unsatisfiable moves to the sink with the
//! clock reset. The sink is absorbing and non-accepting, so such a branch
//! can never accept.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use itertools::Itertools;

use tempo_display_utils::join_iterator;

use crate::{Label, Time};

pub mod formula;

use formula::Formula;

/// One active branch of an ATA run: a location and its clock value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct State<L> {
    /// The active location.
    pub location: L,
    /// The clock value of this branch.
    pub clock: Time,
}

impl<L: Label> State<L> {
    /// Create a state.
    pub fn new(location: L, clock: Time) -> Self {
        Self { location, clock }
    }
}

impl<L: Label> Display for State<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.location, self.clock)
    }
}

/// A configuration of an ATA: the set of currently active states.
///
/// The empty configuration carries no obligations and accepts.
pub type Configuration<L> = BTreeSet<State<L>>;

/// A transition of an ATA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<L, S> {
    source: L,
    symbol: S,
    formula: Formula<L>,
}

impl<L: Label, S: Label> Transition<L, S> {
    /// Create a transition `δ(source, symbol) = formula`.
    pub fn new(source: L, symbol: S, formula: Formula<L>) -> Self {
        Self {
            source,
            symbol,
            formula,
        }
    }
}

impl<L: Label, S: Label> Display for Transition<L, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "δ({}, {}) = {}", self.source, self.symbol, self.formula)
    }
}

/// An alternating timed automaton with a single clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternatingTimedAutomaton<L, S> {
    alphabet: BTreeSet<S>,
    initial_location: L,
    final_locations: BTreeSet<L>,
    transitions: BTreeMap<L, BTreeMap<S, Formula<L>>>,
    sink_location: L,
}

impl<L: Label, S: Label> AlternatingTimedAutomaton<L, S> {
    /// Create an ATA from its transitions.
    pub fn new(
        alphabet: impl IntoIterator<Item = S>,
        initial_location: L,
        final_locations: impl IntoIterator<Item = L>,
        transitions: impl IntoIterator<Item = Transition<L, S>>,
        sink_location: L,
    ) -> Self {
        let mut transition_map: BTreeMap<L, BTreeMap<S, Formula<L>>> = BTreeMap::new();
        for transition in transitions {
            transition_map
                .entry(transition.source)
                .or_default()
                .insert(transition.symbol, transition.formula);
        }
        Self {
            alphabet: alphabet.into_iter().collect(),
            initial_location,
            final_locations: final_locations.into_iter().collect(),
            transitions: transition_map,
            sink_location,
        }
    }

    /// The alphabet of the automaton.
    pub fn get_alphabet(&self) -> &BTreeSet<S> {
        &self.alphabet
    }

    /// The initial location.
    pub fn get_initial_location(&self) -> &L {
        &self.initial_location
    }

    /// The accepting locations.
    pub fn get_final_locations(&self) -> &BTreeSet<L> {
        &self.final_locations
    }

    /// The absorbing, non-accepting sink location.
    pub fn get_sink_location(&self) -> &L {
        &self.sink_location
    }

    /// The locations of the automaton: every location with an outgoing
    /// transition, the initial location, the final locations and the sink.
    pub fn get_locations(&self) -> BTreeSet<&L> {
        let mut locations: BTreeSet<&L> = self.transitions.keys().collect();
        locations.insert(&self.initial_location);
        locations.extend(self.final_locations.iter());
        locations.insert(&self.sink_location);
        locations
    }

    /// The transition formula for a location and symbol, if one is defined.
    pub fn get_transition(&self, location: &L, symbol: &S) -> Option<&Formula<L>> {
        self.transitions
            .get(location)
            .and_then(|by_symbol| by_symbol.get(symbol))
    }

    /// The number of defined transitions.
    pub fn transition_count(&self) -> usize {
        self.transitions.values().map(BTreeMap::len).sum()
    }

    /// The initial configuration: the initial location with the clock at 0.
    pub fn get_initial_configuration(&self) -> Configuration<L> {
        BTreeSet::from([State::new(self.initial_location.clone(), Time::from(0.0))])
    }

    /// Check whether a configuration accepts, i.e. every active location is
    /// accepting. The empty configuration accepts.
    pub fn is_accepting_configuration(&self, configuration: &Configuration<L>) -> bool {
        configuration
            .iter()
            .all(|state| self.final_locations.contains(&state.location))
    }

    /// All successor configurations when reading `symbol`.
    ///
    /// Every active state independently picks one minimal model of its
    /// transition formula; the successor configuration is the union of the
    /// picked models. A state without a satisfiable transition formula moves
    /// to the sink with the clock reset.
    pub fn make_symbol_step(
        &self,
        configuration: &Configuration<L>,
        symbol: &S,
    ) -> BTreeSet<Configuration<L>> {
        if configuration.is_empty() {
            return BTreeSet::from([Configuration::new()]);
        }
        let state_choices: Vec<Vec<Configuration<L>>> = configuration
            .iter()
            .map(|state| {
                let models = self
                    .get_transition(&state.location, symbol)
                    .map(|formula| formula.get_minimal_models(state.clock))
                    .unwrap_or_default();
                if models.is_empty() {
                    vec![BTreeSet::from([State::new(
                        self.sink_location.clone(),
                        Time::from(0.0),
                    )])]
                } else {
                    models.into_iter().collect()
                }
            })
            .collect();
        state_choices
            .into_iter()
            .multi_cartesian_product()
            .map(|choice| choice.into_iter().flatten().collect())
            .collect()
    }

    /// The configuration reached by letting `delta` time units pass.
    pub fn make_time_step(&self, configuration: &Configuration<L>, delta: Time) -> Configuration<L> {
        configuration
            .iter()
            .map(|state| State::new(state.location.clone(), state.clock + delta))
            .collect()
    }

    /// Check whether the automaton accepts the given timed word.
    ///
    /// The word is a sequence of symbols with nondecreasing absolute
    /// timestamps. Acceptance of the finite word requires some run whose
    /// final configuration is accepting.
    pub fn accepts_word(&self, word: &[(S, f64)]) -> bool {
        let mut configurations = BTreeSet::from([self.get_initial_configuration()]);
        let mut now = 0.0;
        for (symbol, time) in word {
            if *time < now {
                return false;
            }
            let delta = Time::from(time - now);
            now = *time;
            configurations = configurations
                .iter()
                .map(|configuration| self.make_time_step(configuration, delta))
                .flat_map(|configuration| self.make_symbol_step(&configuration, symbol))
                .collect();
        }
        configurations
            .iter()
            .any(|configuration| self.is_accepting_configuration(configuration))
    }
}

impl<L: Label, S: Label> Display for AlternatingTimedAutomaton<L, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Alphabet: {{{}}}", join_iterator(self.alphabet.iter(), ", "))?;
        writeln!(f, "Initial location: {}", self.initial_location)?;
        writeln!(
            f,
            "Final locations: {{{}}}",
            join_iterator(self.final_locations.iter(), ", ")
        )?;
        writeln!(f, "Sink location: {}", self.sink_location)?;
        writeln!(f, "Transitions:")?;
        for (source, by_symbol) in &self.transitions {
            for (symbol, formula) in by_symbol {
                writeln!(f, "    δ({source}, {symbol}) = {formula}")?;
            }
        }
        Ok(())
    }
}

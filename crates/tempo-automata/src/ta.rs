//! Timed automata with named clocks.
//!
//! A [`TimedAutomaton`] is the model of the plant: a set of locations over a
//! finite alphabet, a set of real-valued clocks, and nondeterministic
//! transitions guarded by conjunctions of atomic clock constraints that may
//! reset a subset of the clocks.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use tempo_display_utils::{indent_all, join_iterator};

use crate::{ClockConstraint, Label, Time};

/// A location of a timed automaton.
///
/// The wrapper keeps location labels apart from other values of the same
/// underlying type, e.g. action symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location<L>(pub L);

impl<L: Label> Display for Location<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A guarded transition of a timed automaton.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Transition<L, A> {
    source: Location<L>,
    symbol: A,
    target: Location<L>,
    clock_constraints: BTreeSet<(String, ClockConstraint)>,
    clock_resets: BTreeSet<String>,
}

impl<L: Label, A: Label> Transition<L, A> {
    /// Create an unguarded, non-resetting transition.
    pub fn new(source: Location<L>, symbol: A, target: Location<L>) -> Self {
        Self {
            source,
            symbol,
            target,
            clock_constraints: BTreeSet::new(),
            clock_resets: BTreeSet::new(),
        }
    }

    /// Add a guard conjunct `clock ⊙ constant` to the transition.
    pub fn with_clock_constraint(
        mut self,
        clock: impl Into<String>,
        constraint: ClockConstraint,
    ) -> Self {
        self.clock_constraints.insert((clock.into(), constraint));
        self
    }

    /// Add clocks that are reset to zero when the transition is taken.
    pub fn with_clock_resets(
        mut self,
        clocks: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.clock_resets
            .extend(clocks.into_iter().map(Into::into));
        self
    }

    /// The source location.
    pub fn source(&self) -> &Location<L> {
        &self.source
    }

    /// The symbol the transition is taken on.
    pub fn symbol(&self) -> &A {
        &self.symbol
    }

    /// The target location.
    pub fn target(&self) -> &Location<L> {
        &self.target
    }

    /// The guard conjuncts of the transition.
    pub fn clock_constraints(&self) -> impl Iterator<Item = &(String, ClockConstraint)> {
        self.clock_constraints.iter()
    }

    /// The clocks reset by the transition.
    pub fn clock_resets(&self) -> impl Iterator<Item = &String> {
        self.clock_resets.iter()
    }

    /// Check whether the guard is satisfied by the given clock valuations.
    pub fn is_enabled(&self, clock_valuations: &BTreeMap<String, Time>) -> bool {
        self.clock_constraints.iter().all(|(clock, constraint)| {
            clock_valuations
                .get(clock)
                .is_some_and(|&value| constraint.is_satisfied(value))
        })
    }
}

impl<L: Label, A: Label> Display for Transition<L, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.source, self.symbol, self.target)?;
        if !self.clock_constraints.is_empty() {
            let guard = join_iterator(
                self.clock_constraints
                    .iter()
                    .map(|(clock, constraint)| format!("{clock} {constraint}")),
                " ∧ ",
            );
            write!(f, " [{guard}]")?;
        }
        if !self.clock_resets.is_empty() {
            write!(f, " / {{{}}}", join_iterator(self.clock_resets.iter(), ", "))?;
        }
        Ok(())
    }
}

/// A configuration of a timed automaton: the current location together with
/// a valuation for every clock.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Configuration<L> {
    /// The current location.
    pub location: Location<L>,
    /// The current value of every clock.
    pub clock_valuations: BTreeMap<String, Time>,
}

impl<L: Label> Configuration<L> {
    /// Create a configuration.
    pub fn new(
        location: Location<L>,
        clock_valuations: impl IntoIterator<Item = (impl Into<String>, Time)>,
    ) -> Self {
        Self {
            location,
            clock_valuations: clock_valuations
                .into_iter()
                .map(|(clock, value)| (clock.into(), value))
                .collect(),
        }
    }

    /// The configuration reached by letting `delta` time units pass.
    pub fn make_time_step(&self, delta: Time) -> Self {
        Self {
            location: self.location.clone(),
            clock_valuations: self
                .clock_valuations
                .iter()
                .map(|(clock, &value)| (clock.clone(), value + delta))
                .collect(),
        }
    }
}

impl<L: Label> Display for Configuration<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let valuations = join_iterator(
            self.clock_valuations
                .iter()
                .map(|(clock, value)| format!("{clock} = {value}")),
            ", ",
        );
        write!(f, "({}, {{{valuations}}})", self.location)
    }
}

/// A timed automaton.
///
/// Locations referenced by transitions must be declared beforehand, either
/// through the constructor (initial and final locations are declared
/// implicitly) or with [`TimedAutomaton::add_location`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedAutomaton<L, A> {
    alphabet: BTreeSet<A>,
    locations: BTreeSet<Location<L>>,
    initial_location: Location<L>,
    final_locations: BTreeSet<Location<L>>,
    clocks: BTreeSet<String>,
    transitions: Vec<Transition<L, A>>,
}

impl<L: Label, A: Label> TimedAutomaton<L, A> {
    /// Create a timed automaton without clocks or transitions.
    pub fn new(
        alphabet: impl IntoIterator<Item = A>,
        initial_location: Location<L>,
        final_locations: impl IntoIterator<Item = Location<L>>,
    ) -> Self {
        let final_locations: BTreeSet<_> = final_locations.into_iter().collect();
        let mut locations = final_locations.clone();
        locations.insert(initial_location.clone());
        Self {
            alphabet: alphabet.into_iter().collect(),
            locations,
            initial_location,
            final_locations,
            clocks: BTreeSet::new(),
            transitions: Vec::new(),
        }
    }

    /// Declare a location.
    pub fn add_location(&mut self, location: Location<L>) {
        self.locations.insert(location);
    }

    /// Declare a final location.
    pub fn add_final_location(&mut self, location: Location<L>) {
        self.locations.insert(location.clone());
        self.final_locations.insert(location);
    }

    /// Declare a clock.
    pub fn add_clock(&mut self, clock: impl Into<String>) {
        self.clocks.insert(clock.into());
    }

    /// Add a symbol to the alphabet.
    pub fn add_action(&mut self, symbol: A) {
        self.alphabet.insert(symbol);
    }

    /// Add a transition.
    ///
    /// Both endpoint locations, the symbol and all referenced clocks must
    /// have been declared.
    pub fn add_transition(&mut self, transition: Transition<L, A>) {
        assert!(
            self.locations.contains(transition.source())
                && self.locations.contains(transition.target()),
            "transition endpoints must be declared locations"
        );
        assert!(
            self.alphabet.contains(transition.symbol()),
            "transition symbol must be part of the alphabet"
        );
        assert!(
            transition
                .clock_constraints()
                .map(|(clock, _)| clock)
                .chain(transition.clock_resets())
                .all(|clock| self.clocks.contains(clock)),
            "transition clocks must be declared"
        );
        self.transitions.push(transition);
    }

    /// The alphabet of the automaton.
    pub fn get_alphabet(&self) -> &BTreeSet<A> {
        &self.alphabet
    }

    /// The declared locations.
    pub fn get_locations(&self) -> &BTreeSet<Location<L>> {
        &self.locations
    }

    /// The initial location.
    pub fn get_initial_location(&self) -> &Location<L> {
        &self.initial_location
    }

    /// The final locations.
    pub fn get_final_locations(&self) -> &BTreeSet<Location<L>> {
        &self.final_locations
    }

    /// The declared clocks.
    pub fn get_clocks(&self) -> &BTreeSet<String> {
        &self.clocks
    }

    /// The transitions of the automaton.
    pub fn get_transitions(&self) -> impl Iterator<Item = &Transition<L, A>> {
        self.transitions.iter()
    }

    /// The initial configuration: the initial location with all clocks at 0.
    pub fn get_initial_configuration(&self) -> Configuration<L> {
        Configuration {
            location: self.initial_location.clone(),
            clock_valuations: self
                .clocks
                .iter()
                .map(|clock| (clock.clone(), Time::from(0.0)))
                .collect(),
        }
    }

    /// Check whether the configuration's location is final.
    pub fn is_accepting_configuration(&self, configuration: &Configuration<L>) -> bool {
        self.final_locations.contains(&configuration.location)
    }

    /// All configurations reachable from `configuration` by taking an
    /// enabled transition on `symbol`.
    pub fn make_symbol_step(
        &self,
        configuration: &Configuration<L>,
        symbol: &A,
    ) -> Vec<Configuration<L>> {
        self.transitions
            .iter()
            .filter(|transition| {
                transition.source() == &configuration.location
                    && transition.symbol() == symbol
                    && transition.is_enabled(&configuration.clock_valuations)
            })
            .map(|transition| Configuration {
                location: transition.target().clone(),
                clock_valuations: configuration
                    .clock_valuations
                    .iter()
                    .map(|(clock, &value)| {
                        if transition.clock_resets.contains(clock) {
                            (clock.clone(), Time::from(0.0))
                        } else {
                            (clock.clone(), value)
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    /// Check whether the automaton accepts the given timed word.
    ///
    /// The word is a sequence of symbols with nondecreasing absolute
    /// timestamps; a word with decreasing timestamps is rejected.
    pub fn accepts_word(&self, word: &[(A, f64)]) -> bool {
        let mut configurations = vec![self.get_initial_configuration()];
        let mut now = 0.0;
        for (symbol, time) in word {
            if *time < now {
                return false;
            }
            let delta = Time::from(time - now);
            now = *time;
            configurations = configurations
                .iter()
                .map(|configuration| configuration.make_time_step(delta))
                .flat_map(|configuration| self.make_symbol_step(&configuration, symbol))
                .collect();
            if configurations.is_empty() {
                return false;
            }
        }
        configurations
            .iter()
            .any(|configuration| self.is_accepting_configuration(configuration))
    }
}

impl<L: Label, A: Label> Display for TimedAutomaton<L, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Alphabet: {{{}}}", join_iterator(self.alphabet.iter(), ", "))?;
        writeln!(
            f,
            "Locations: {{{}}}",
            join_iterator(self.locations.iter(), ", ")
        )?;
        writeln!(f, "Initial location: {}", self.initial_location)?;
        writeln!(
            f,
            "Final locations: {{{}}}",
            join_iterator(self.final_locations.iter(), ", ")
        )?;
        writeln!(f, "Clocks: {{{}}}", join_iterator(self.clocks.iter(), ", "))?;
        writeln!(
            f,
            "Transitions:\n{}",
            indent_all(join_iterator(self.transitions.iter(), "\n"))
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn loc(name: &str) -> Location<String> {
        Location(name.to_string())
    }

    fn word(entries: &[(&str, f64)]) -> Vec<(String, f64)> {
        entries
            .iter()
            .map(|(symbol, time)| (symbol.to_string(), *time))
            .collect()
    }

    #[test]
    fn simple_automaton_accepts_untimed_loops() {
        let mut ta = TimedAutomaton::new(["a".to_string()], loc("s0"), [loc("s0")]);
        ta.add_transition(Transition::new(loc("s0"), "a".to_string(), loc("s0")));
        assert!(ta.accepts_word(&[]));
        assert!(ta.accepts_word(&word(&[("a", 0.0)])));
        assert!(ta.accepts_word(&word(&[("a", 1.0)])));
        assert!(ta.accepts_word(&word(&[("a", 1.0), ("a", 1.0), ("a", 1.0)])));
        assert!(!ta.accepts_word(&word(&[("b", 0.0)])));
        // Time must not run backwards.
        assert!(!ta.accepts_word(&word(&[("a", 1.0), ("a", 0.0)])));
    }

    #[test]
    fn guards_restrict_acceptance() {
        let mut ta = TimedAutomaton::new(["a".to_string()], loc("s0"), [loc("s0")]);
        ta.add_clock("x");
        ta.add_transition(
            Transition::new(loc("s0"), "a".to_string(), loc("s0"))
                .with_clock_constraint("x", ClockConstraint::less_than(1)),
        );
        assert!(!ta.accepts_word(&word(&[("a", 2.0)])));
        assert!(ta.accepts_word(&word(&[("a", 0.5)])));
        assert!(!ta.accepts_word(&word(&[("a", 1.0)])));
    }

    #[test]
    fn clock_resets_restart_the_guard() {
        let mut ta = TimedAutomaton::new(["a".to_string()], loc("s0"), [loc("s0")]);
        ta.add_clock("x");
        ta.add_transition(
            Transition::new(loc("s0"), "a".to_string(), loc("s0"))
                .with_clock_constraint("x", ClockConstraint::less_than(2))
                .with_clock_resets(["x"]),
        );
        assert!(ta.accepts_word(&word(&[("a", 1.0), ("a", 2.0), ("a", 3.0)])));
        assert!(!ta.accepts_word(&word(&[("a", 1.0), ("a", 3.0), ("a", 3.0)])));
    }

    #[test]
    fn nondeterministic_choice_of_targets() {
        let mut ta = TimedAutomaton::new(
            ["a".to_string(), "b".to_string()],
            loc("s0"),
            [loc("s2")],
        );
        ta.add_location(loc("s1"));
        ta.add_transition(Transition::new(loc("s0"), "a".to_string(), loc("s1")));
        ta.add_transition(Transition::new(loc("s0"), "a".to_string(), loc("s2")));
        ta.add_transition(Transition::new(loc("s1"), "b".to_string(), loc("s1")));
        ta.add_transition(Transition::new(loc("s2"), "b".to_string(), loc("s2")));
        assert!(ta.accepts_word(&word(&[("a", 1.0), ("b", 2.0)])));
    }

    #[test]
    fn nondeterminism_with_clocks() {
        let mut ta = TimedAutomaton::new(
            ["a".to_string(), "b".to_string()],
            loc("s0"),
            [loc("s1"), loc("s2")],
        );
        ta.add_clock("x");
        ta.add_transition(Transition::new(loc("s0"), "a".to_string(), loc("s1")));
        ta.add_transition(Transition::new(loc("s0"), "a".to_string(), loc("s2")));
        ta.add_transition(
            Transition::new(loc("s1"), "b".to_string(), loc("s1"))
                .with_clock_constraint("x", ClockConstraint::less_than(2)),
        );
        assert!(ta.accepts_word(&word(&[("a", 1.0), ("b", 1.0)])));
        assert!(!ta.accepts_word(&word(&[("a", 1.0), ("b", 3.0)])));

        ta.add_transition(
            Transition::new(loc("s2"), "b".to_string(), loc("s2"))
                .with_clock_constraint("x", ClockConstraint::greater_than(2)),
        );
        assert!(ta.accepts_word(&word(&[("a", 1.0), ("b", 1.0)])));
        assert!(ta.accepts_word(&word(&[("a", 1.0), ("b", 3.0)])));
    }

    #[test]
    fn initial_configuration_has_all_clocks_at_zero() {
        let mut ta = TimedAutomaton::new(["a".to_string()], loc("s0"), [loc("s0")]);
        ta.add_clock("x");
        ta.add_clock("y");
        let configuration = ta.get_initial_configuration();
        assert_eq!(configuration.location, loc("s0"));
        assert_eq!(
            configuration.clock_valuations,
            BTreeMap::from([
                ("x".to_string(), Time::from(0.0)),
                ("y".to_string(), Time::from(0.0))
            ])
        );
    }

    #[test]
    fn symbol_step_applies_resets() {
        let mut ta = TimedAutomaton::new(["a".to_string()], loc("s0"), [loc("s1")]);
        ta.add_clock("x");
        ta.add_clock("y");
        ta.add_transition(
            Transition::new(loc("s0"), "a".to_string(), loc("s1"))
                .with_clock_constraint("x", ClockConstraint::greater_than(1))
                .with_clock_resets(["x"]),
        );
        let configuration = ta
            .get_initial_configuration()
            .make_time_step(Time::from(1.5));
        let successors = ta.make_symbol_step(&configuration, &"a".to_string());
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].location, loc("s1"));
        assert_eq!(
            successors[0].clock_valuations,
            BTreeMap::from([
                ("x".to_string(), Time::from(0.0)),
                ("y".to_string(), Time::from(1.5))
            ])
        );
    }

    #[test]
    fn transition_display_shows_guard_and_resets() {
        let transition = Transition::new(loc("l0"), "a".to_string(), loc("l1"))
            .with_clock_constraint("x", ClockConstraint::greater_than(1))
            .with_clock_resets(["x"]);
        assert_eq!(transition.to_string(), "l0 --a--> l1 [x > 1] / {x}");
    }
}

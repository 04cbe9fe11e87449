//! The JSON problem format consumed by the CLI.
//!
//! A problem file carries the plant automaton, the MTL specification of
//! undesired behaviors, the partition of the alphabet into controller and
//! environment actions, and the maximal constant of all clock constraints.

use std::collections::BTreeSet;

use anyhow::{bail, Context};
use serde::Deserialize;

use tempo_automata::regions::RegionIndex;
use tempo_automata::ta::{Location, TimedAutomaton, Transition};
use tempo_automata::{ClockConstraint, ComparisonOp};
use tempo_logic::{AtomicProposition, BoundType, MtlFormula, TimeInterval};

/// A synthesis problem.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Problem {
    /// The plant automaton.
    pub plant: PlantSpec,
    /// The MTL formula describing the undesired behaviors.
    pub specification: FormulaSpec,
    /// The actions the controller may take.
    pub controller_actions: BTreeSet<String>,
    /// The actions under the environment's control.
    pub environment_actions: BTreeSet<String>,
    /// The maximal constant of all clock constraints of plant and
    /// specification.
    pub max_constant: RegionIndex,
}

/// The plant automaton of a problem file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlantSpec {
    pub alphabet: BTreeSet<String>,
    #[serde(default)]
    pub locations: BTreeSet<String>,
    pub initial_location: String,
    pub final_locations: BTreeSet<String>,
    #[serde(default)]
    pub clocks: BTreeSet<String>,
    pub transitions: Vec<TransitionSpec>,
}

/// One plant transition.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionSpec {
    pub source: String,
    pub symbol: String,
    pub target: String,
    #[serde(default)]
    pub guard: Vec<GuardSpec>,
    #[serde(default)]
    pub resets: BTreeSet<String>,
}

/// One atomic guard conjunct.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardSpec {
    pub clock: String,
    pub comparison: ComparisonSpec,
    pub constant: u32,
}

/// The comparison operator of a guard conjunct.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonSpec {
    Less,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    Greater,
}

impl From<ComparisonSpec> for ComparisonOp {
    fn from(spec: ComparisonSpec) -> Self {
        match spec {
            ComparisonSpec::Less => ComparisonOp::Less,
            ComparisonSpec::LessEqual => ComparisonOp::LessEqual,
            ComparisonSpec::Equal => ComparisonOp::Equal,
            ComparisonSpec::NotEqual => ComparisonOp::NotEqual,
            ComparisonSpec::GreaterEqual => ComparisonOp::GreaterEqual,
            ComparisonSpec::Greater => ComparisonOp::Greater,
        }
    }
}

/// An MTL formula in the problem file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaSpec {
    True,
    False,
    Ap(String),
    Neg(Box<FormulaSpec>),
    And(Box<FormulaSpec>, Box<FormulaSpec>),
    Or(Box<FormulaSpec>, Box<FormulaSpec>),
    Until {
        lhs: Box<FormulaSpec>,
        rhs: Box<FormulaSpec>,
        #[serde(default)]
        interval: IntervalSpec,
    },
    DualUntil {
        lhs: Box<FormulaSpec>,
        rhs: Box<FormulaSpec>,
        #[serde(default)]
        interval: IntervalSpec,
    },
}

/// A time interval; omitted bounds are `[0, ∞)`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntervalSpec {
    #[serde(default)]
    pub lower: u32,
    #[serde(default = "BoundSpec::weak")]
    pub lower_bound: BoundSpec,
    #[serde(default)]
    pub upper: u32,
    #[serde(default = "BoundSpec::infinite")]
    pub upper_bound: BoundSpec,
}

impl Default for IntervalSpec {
    fn default() -> Self {
        Self {
            lower: 0,
            lower_bound: BoundSpec::Weak,
            upper: 0,
            upper_bound: BoundSpec::Infinite,
        }
    }
}

/// The kind of an interval bound.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundSpec {
    Weak,
    Strict,
    Infinite,
}

impl BoundSpec {
    fn weak() -> Self {
        Self::Weak
    }

    fn infinite() -> Self {
        Self::Infinite
    }
}

impl From<BoundSpec> for BoundType {
    fn from(spec: BoundSpec) -> Self {
        match spec {
            BoundSpec::Weak => BoundType::Weak,
            BoundSpec::Strict => BoundType::Strict,
            BoundSpec::Infinite => BoundType::Infinite,
        }
    }
}

impl From<&IntervalSpec> for TimeInterval {
    fn from(spec: &IntervalSpec) -> Self {
        TimeInterval::new(
            spec.lower,
            spec.lower_bound.into(),
            spec.upper,
            spec.upper_bound.into(),
        )
    }
}

impl FormulaSpec {
    /// Build the MTL formula described by the specification.
    pub fn to_formula(&self) -> MtlFormula<String> {
        match self {
            FormulaSpec::True => MtlFormula::True,
            FormulaSpec::False => MtlFormula::False,
            FormulaSpec::Ap(symbol) => MtlFormula::ap(symbol.clone()),
            FormulaSpec::Neg(inner) => !inner.to_formula(),
            FormulaSpec::And(lhs, rhs) => lhs.to_formula() & rhs.to_formula(),
            FormulaSpec::Or(lhs, rhs) => lhs.to_formula() | rhs.to_formula(),
            FormulaSpec::Until { lhs, rhs, interval } => {
                lhs.to_formula().until(rhs.to_formula(), interval.into())
            }
            FormulaSpec::DualUntil { lhs, rhs, interval } => {
                lhs.to_formula().dual_until(rhs.to_formula(), interval.into())
            }
        }
    }
}

impl Problem {
    /// Parse a problem from its JSON representation.
    pub fn from_json(input: &str) -> anyhow::Result<Self> {
        let problem: Problem =
            serde_json::from_str(input).context("failed to parse the problem file")?;
        problem.validate()?;
        Ok(problem)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for action in self
            .controller_actions
            .iter()
            .chain(&self.environment_actions)
        {
            if !self.plant.alphabet.contains(action) {
                bail!("the action '{action}' is not part of the plant's alphabet");
            }
        }
        for symbol in &self.plant.alphabet {
            if !self.controller_actions.contains(symbol)
                && !self.environment_actions.contains(symbol)
            {
                bail!("the symbol '{symbol}' is neither a controller nor an environment action");
            }
        }
        Ok(())
    }

    /// Build the plant automaton.
    pub fn to_plant(&self) -> anyhow::Result<TimedAutomaton<String, String>> {
        let spec = &self.plant;
        let mut ta = TimedAutomaton::new(
            spec.alphabet.iter().cloned(),
            Location(spec.initial_location.clone()),
            spec.final_locations.iter().cloned().map(Location),
        );
        for location in &spec.locations {
            ta.add_location(Location(location.clone()));
        }
        for clock in &spec.clocks {
            ta.add_clock(clock.clone());
        }
        for transition in &spec.transitions {
            for endpoint in [&transition.source, &transition.target] {
                if !ta.get_locations().contains(&Location(endpoint.clone())) {
                    bail!("the transition location '{endpoint}' is not declared");
                }
            }
            if !spec.alphabet.contains(&transition.symbol) {
                bail!(
                    "the transition symbol '{}' is not part of the alphabet",
                    transition.symbol
                );
            }
            for clock in transition
                .guard
                .iter()
                .map(|guard| &guard.clock)
                .chain(&transition.resets)
            {
                if !spec.clocks.contains(clock) {
                    bail!("the clock '{clock}' is not declared");
                }
            }
            let mut built = Transition::new(
                Location(transition.source.clone()),
                transition.symbol.clone(),
                Location(transition.target.clone()),
            )
            .with_clock_resets(transition.resets.iter().cloned());
            for guard in &transition.guard {
                built = built.with_clock_constraint(
                    guard.clock.clone(),
                    ClockConstraint::new(guard.comparison.into(), guard.constant),
                );
            }
            ta.add_transition(built);
        }
        Ok(ta)
    }

    /// The alphabet the specification is translated over: the plant's
    /// symbols as atomic propositions.
    pub fn specification_alphabet(&self) -> BTreeSet<AtomicProposition<String>> {
        self.plant
            .alphabet
            .iter()
            .cloned()
            .map(AtomicProposition)
            .collect()
    }
}

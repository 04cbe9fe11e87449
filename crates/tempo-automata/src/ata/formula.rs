//! Formulas over ATA locations.
//!
//! A transition of an alternating timed automaton maps to a positive boolean
//! formula whose leaves are locations, clock constraints on the single
//! clock, and clock resets of subformulas. The central operation is
//! [`Formula::get_minimal_models`]: the minimal sets of successor states
//! that make the formula true under the current clock value.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use itertools::Itertools;

use crate::{ClockConstraint, Label, Time};

use super::State;

/// A minimal model: a set of states that makes a formula true.
pub type Model<L> = BTreeSet<State<L>>;

/// A positive boolean formula over locations, clock constraints and clock
/// resets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Formula<L> {
    /// The constant true formula.
    True,
    /// The constant false formula.
    False,
    /// A reference to a location; satisfied by moving there with the
    /// current clock value.
    Location(L),
    /// A constraint on the current clock value.
    ClockConstraint(ClockConstraint),
    /// The subformula evaluated with the clock reset to zero.
    Reset(Box<Formula<L>>),
    /// Conjunction.
    And(Box<Formula<L>>, Box<Formula<L>>),
    /// Disjunction.
    Or(Box<Formula<L>>, Box<Formula<L>>),
}

/// Create the conjunction of two formulas, short-circuiting the identity
/// and absorbing elements.
pub fn create_conjunction<L: Label>(lhs: Formula<L>, rhs: Formula<L>) -> Formula<L> {
    match (lhs, rhs) {
        (Formula::False, _) | (_, Formula::False) => Formula::False,
        (Formula::True, other) | (other, Formula::True) => other,
        (lhs, rhs) => Formula::And(Box::new(lhs), Box::new(rhs)),
    }
}

/// Create the disjunction of two formulas, short-circuiting the identity
/// and absorbing elements.
pub fn create_disjunction<L: Label>(lhs: Formula<L>, rhs: Formula<L>) -> Formula<L> {
    match (lhs, rhs) {
        (Formula::True, _) | (_, Formula::True) => Formula::True,
        (Formula::False, other) | (other, Formula::False) => other,
        (lhs, rhs) => Formula::Or(Box::new(lhs), Box::new(rhs)),
    }
}

impl<L: Label> Formula<L> {
    /// Enumerate the minimal models of the formula under the given clock
    /// value.
    ///
    /// A model is a set of successor [`State`]s; making all of them active
    /// satisfies the formula. The result contains no model that is a strict
    /// superset of another. An unsatisfiable formula has no models; a
    /// formula satisfied without obligations (e.g. a fulfilled clock
    /// constraint) has the single empty model.
    pub fn get_minimal_models(&self, clock: Time) -> BTreeSet<Model<L>> {
        match self {
            Formula::True => BTreeSet::from([Model::new()]),
            Formula::False => BTreeSet::new(),
            Formula::Location(location) => {
                BTreeSet::from([Model::from([State::new(location.clone(), clock)])])
            }
            Formula::ClockConstraint(constraint) => {
                if constraint.is_satisfied(clock) {
                    BTreeSet::from([Model::new()])
                } else {
                    BTreeSet::new()
                }
            }
            Formula::Reset(subformula) => subformula.get_minimal_models(Time::from(0.0)),
            Formula::And(lhs, rhs) => {
                let lhs_models = lhs.get_minimal_models(clock);
                let rhs_models = rhs.get_minimal_models(clock);
                filter_minimal_models(
                    lhs_models
                        .iter()
                        .cartesian_product(rhs_models.iter())
                        .map(|(m1, m2)| m1.union(m2).cloned().collect())
                        .collect(),
                )
            }
            Formula::Or(lhs, rhs) => {
                let mut models = lhs.get_minimal_models(clock);
                models.extend(rhs.get_minimal_models(clock));
                filter_minimal_models(models)
            }
        }
    }

    /// Evaluate the formula against a set of active states and the current
    /// clock value.
    pub fn is_satisfied(&self, states: &BTreeSet<State<L>>, clock: Time) -> bool {
        match self {
            Formula::True => true,
            Formula::False => false,
            Formula::Location(location) => {
                states.contains(&State::new(location.clone(), clock))
            }
            Formula::ClockConstraint(constraint) => constraint.is_satisfied(clock),
            Formula::Reset(subformula) => subformula.is_satisfied(states, Time::from(0.0)),
            Formula::And(lhs, rhs) => {
                lhs.is_satisfied(states, clock) && rhs.is_satisfied(states, clock)
            }
            Formula::Or(lhs, rhs) => {
                lhs.is_satisfied(states, clock) || rhs.is_satisfied(states, clock)
            }
        }
    }
}

/// Drop every model that is a strict superset of another model.
fn filter_minimal_models<L: Label>(models: BTreeSet<Model<L>>) -> BTreeSet<Model<L>> {
    models
        .iter()
        .filter(|model| {
            !models
                .iter()
                .any(|other| other.len() < model.len() && other.is_subset(model))
        })
        .cloned()
        .collect()
}

impl<L: Label> Display for Formula<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "⊤"),
            Formula::False => write!(f, "⊥"),
            Formula::Location(location) => write!(f, "{location}"),
            Formula::ClockConstraint(constraint) => write!(f, "x {constraint}"),
            Formula::Reset(subformula) => write!(f, "x.{subformula}"),
            Formula::And(lhs, rhs) => write!(f, "({lhs} ∧ {rhs})"),
            Formula::Or(lhs, rhs) => write!(f, "({lhs} ∨ {rhs})"),
        }
    }
}

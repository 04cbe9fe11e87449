//! Timed automata and alternating timed automata.
//!
//! This crate defines the two automaton models the synthesis pipeline runs
//! on:
//! - [`ta::TimedAutomaton`]: the plant, a nondeterministic timed automaton
//!   with named real-valued clocks, guarded and resetting transitions,
//! - [`ata::AlternatingTimedAutomaton`]: the specification automaton, an
//!   alternating timed automaton with a single clock whose transitions map to
//!   [`ata::formula::Formula`]s over locations, clock constraints and clock
//!   resets.
//!
//! The [`regions`] module provides the standard region encoding of clock
//! values that the symbolic search uses to quotient configurations into
//! finitely many classes.

use std::fmt::{self, Debug, Display};
use std::hash::Hash;

use ordered_float::OrderedFloat;

pub mod ata;
pub mod regions;
pub mod ta;

/// A point in time or a clock value.
///
/// Clock values are kept totally ordered so that configurations can live in
/// ordered collections.
pub type Time = OrderedFloat<f64>;

/// Common trait for location and action label types.
///
/// This is a convenience alias for the bounds required throughout the crate;
/// it is implemented automatically for every suitable type.
pub trait Label: Clone + Ord + Hash + Debug + Display {}

impl<T: Clone + Ord + Hash + Debug + Display> Label for T {}

/// The comparison operator of an atomic clock constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComparisonOp {
    /// Strictly less than.
    Less,
    /// Less than or equal.
    LessEqual,
    /// Equal.
    Equal,
    /// Not equal.
    NotEqual,
    /// Greater than or equal.
    GreaterEqual,
    /// Strictly greater than.
    Greater,
}

impl Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonOp::Less => write!(f, "<"),
            ComparisonOp::LessEqual => write!(f, "≤"),
            ComparisonOp::Equal => write!(f, "="),
            ComparisonOp::NotEqual => write!(f, "≠"),
            ComparisonOp::GreaterEqual => write!(f, "≥"),
            ComparisonOp::Greater => write!(f, ">"),
        }
    }
}

/// An atomic clock constraint `clock ⊙ constant`.
///
/// The clock itself is not part of the constraint; guards attach constraints
/// to clock names and the single-clock specification automaton applies them
/// to its only clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockConstraint {
    comparison: ComparisonOp,
    constant: u32,
}

impl ClockConstraint {
    /// Create the constraint `clock ⊙ constant`.
    pub fn new(comparison: ComparisonOp, constant: u32) -> Self {
        Self {
            comparison,
            constant,
        }
    }

    /// Create the constraint `clock < constant`.
    pub fn less_than(constant: u32) -> Self {
        Self::new(ComparisonOp::Less, constant)
    }

    /// Create the constraint `clock ≤ constant`.
    pub fn less_equal(constant: u32) -> Self {
        Self::new(ComparisonOp::LessEqual, constant)
    }

    /// Create the constraint `clock = constant`.
    pub fn equal(constant: u32) -> Self {
        Self::new(ComparisonOp::Equal, constant)
    }

    /// Create the constraint `clock ≠ constant`.
    pub fn not_equal(constant: u32) -> Self {
        Self::new(ComparisonOp::NotEqual, constant)
    }

    /// Create the constraint `clock ≥ constant`.
    pub fn greater_equal(constant: u32) -> Self {
        Self::new(ComparisonOp::GreaterEqual, constant)
    }

    /// Create the constraint `clock > constant`.
    pub fn greater_than(constant: u32) -> Self {
        Self::new(ComparisonOp::Greater, constant)
    }

    /// The comparison operator of the constraint.
    pub fn comparison(&self) -> ComparisonOp {
        self.comparison
    }

    /// The constant of the constraint.
    pub fn constant(&self) -> u32 {
        self.constant
    }

    /// Check whether a clock value satisfies the constraint.
    pub fn is_satisfied(&self, value: Time) -> bool {
        let constant = Time::from(f64::from(self.constant));
        match self.comparison {
            ComparisonOp::Less => value < constant,
            ComparisonOp::LessEqual => value <= constant,
            ComparisonOp::Equal => value == constant,
            ComparisonOp::NotEqual => value != constant,
            ComparisonOp::GreaterEqual => value >= constant,
            ComparisonOp::Greater => value > constant,
        }
    }
}

impl Display for ClockConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.comparison, self.constant)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clock_constraints_with_integer_values() {
        assert!(ClockConstraint::less_than(1).is_satisfied(0.0.into()));
        assert!(!ClockConstraint::less_than(1).is_satisfied(1.0.into()));
        assert!(!ClockConstraint::less_than(1).is_satisfied(2.0.into()));
        assert!(ClockConstraint::less_equal(1).is_satisfied(0.0.into()));
        assert!(ClockConstraint::less_equal(1).is_satisfied(1.0.into()));
        assert!(!ClockConstraint::less_equal(1).is_satisfied(2.0.into()));
        assert!(!ClockConstraint::equal(1).is_satisfied(0.0.into()));
        assert!(ClockConstraint::equal(1).is_satisfied(1.0.into()));
        assert!(!ClockConstraint::equal(1).is_satisfied(2.0.into()));
        assert!(ClockConstraint::not_equal(1).is_satisfied(0.0.into()));
        assert!(!ClockConstraint::not_equal(1).is_satisfied(1.0.into()));
        assert!(!ClockConstraint::greater_equal(1).is_satisfied(0.0.into()));
        assert!(ClockConstraint::greater_equal(1).is_satisfied(1.0.into()));
        assert!(ClockConstraint::greater_equal(1).is_satisfied(2.0.into()));
        assert!(!ClockConstraint::greater_than(1).is_satisfied(0.0.into()));
        assert!(!ClockConstraint::greater_than(1).is_satisfied(1.0.into()));
        assert!(ClockConstraint::greater_than(1).is_satisfied(2.0.into()));
    }

    #[test]
    fn clock_constraints_with_fractional_values() {
        assert!(ClockConstraint::less_than(1).is_satisfied(0.9.into()));
        assert!(!ClockConstraint::greater_than(1).is_satisfied(1.0.into()));
        assert!(ClockConstraint::greater_than(1).is_satisfied(1.1.into()));
        assert!(ClockConstraint::less_equal(2).is_satisfied(1.999.into()));
        assert!(!ClockConstraint::equal(2).is_satisfied(1.999.into()));
    }

    #[test]
    fn constraint_display() {
        assert_eq!(ClockConstraint::less_than(1).to_string(), "< 1");
        assert_eq!(ClockConstraint::less_equal(2).to_string(), "≤ 2");
        assert_eq!(ClockConstraint::equal(3).to_string(), "= 3");
        assert_eq!(ClockConstraint::not_equal(4).to_string(), "≠ 4");
        assert_eq!(ClockConstraint::greater_equal(5).to_string(), "≥ 5");
        assert_eq!(ClockConstraint::greater_than(6).to_string(), "> 6");
    }
}

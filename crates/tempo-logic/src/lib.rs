//! Metric Temporal Logic (MTL) formulas and their algebra.
//!
//! This crate defines the [`MtlFormula`] tree over atomic propositions with
//! time-constrained until and dual-until operators, together with the
//! operations the rest of the toolsuite builds on:
//! - rewriting into positive normal form
//!   ([`MtlFormula::to_positive_normal_form`]),
//! - collecting subformulas by top-level operator
//!   ([`MtlFormula::get_subformulas_of_type`]),
//! - extracting the alphabet of atomic propositions
//!   ([`MtlFormula::get_alphabet`]).
//!
//! Formulas have a derived total order so that they can serve as keys in
//! ordered sets and maps; the synthesis pipeline uses them directly as
//! locations of the specification automaton.

use std::collections::BTreeSet;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::ops;

pub mod interval;

pub use interval::{BoundType, TimeInterval};

/// Common trait for the symbol types formulas are built over.
///
/// This is a convenience alias for the bounds required throughout the crate;
/// it is implemented automatically for every suitable type.
pub trait Symbol: Clone + Ord + Hash + Debug + Display {}

impl<T: Clone + Ord + Hash + Debug + Display> Symbol for T {}

/// An atomic proposition over the symbol type `S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomicProposition<S>(pub S);

impl<S: Symbol> Display for AtomicProposition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The top-level operator of an [`MtlFormula`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicOp {
    /// The constant true formula.
    True,
    /// The constant false formula.
    False,
    /// An atomic proposition.
    Ap,
    /// Negation.
    Neg,
    /// Binary conjunction.
    And,
    /// Binary disjunction.
    Or,
    /// Time-constrained until.
    Until,
    /// Time-constrained dual until (the De Morgan dual of until).
    DualUntil,
}

/// An MTL formula over atomic propositions of type `S`.
///
/// Conjunction and disjunction are binary; the temporal operators carry a
/// [`TimeInterval`]. Formulas can be composed with `&`, `|` and `!` as well
/// as with [`MtlFormula::until`] and [`MtlFormula::dual_until`]:
///
/// ```
/// use tempo_logic::{BoundType, MtlFormula, TimeInterval};
///
/// let a = MtlFormula::ap("a");
/// let b = MtlFormula::ap("b");
/// let spec = a.until(b, TimeInterval::new_lower_bounded(2, BoundType::Weak));
/// assert_eq!(spec.to_string(), "(a U[2, ∞) b)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MtlFormula<S> {
    /// The constant true formula.
    True,
    /// The constant false formula.
    False,
    /// An atomic proposition.
    Ap(AtomicProposition<S>),
    /// Negation of a formula.
    Neg(Box<MtlFormula<S>>),
    /// Conjunction of two formulas.
    And(Box<MtlFormula<S>>, Box<MtlFormula<S>>),
    /// Disjunction of two formulas.
    Or(Box<MtlFormula<S>>, Box<MtlFormula<S>>),
    /// `lhs` until `rhs` within the interval.
    Until(Box<MtlFormula<S>>, Box<MtlFormula<S>>, TimeInterval),
    /// `lhs` dual-until `rhs` within the interval.
    DualUntil(Box<MtlFormula<S>>, Box<MtlFormula<S>>, TimeInterval),
}

impl<S: Symbol> MtlFormula<S> {
    /// Create an atomic proposition formula.
    pub fn ap(symbol: S) -> Self {
        Self::Ap(AtomicProposition(symbol))
    }

    /// Create the formula `self U_interval rhs`.
    pub fn until(self, rhs: Self, interval: TimeInterval) -> Self {
        Self::Until(Box::new(self), Box::new(rhs), interval)
    }

    /// Create the formula `self ~U_interval rhs`.
    pub fn dual_until(self, rhs: Self, interval: TimeInterval) -> Self {
        Self::DualUntil(Box::new(self), Box::new(rhs), interval)
    }

    /// The top-level operator of the formula.
    pub fn operator(&self) -> LogicOp {
        match self {
            Self::True => LogicOp::True,
            Self::False => LogicOp::False,
            Self::Ap(_) => LogicOp::Ap,
            Self::Neg(_) => LogicOp::Neg,
            Self::And(_, _) => LogicOp::And,
            Self::Or(_, _) => LogicOp::Or,
            Self::Until(_, _, _) => LogicOp::Until,
            Self::DualUntil(_, _, _) => LogicOp::DualUntil,
        }
    }

    /// Rewrite the formula into positive normal form.
    ///
    /// Negations are pushed inwards with the De Morgan rules and the duality
    /// of until and dual until; double negations are eliminated and negated
    /// constants are flipped. In the result, negation only occurs directly
    /// above atomic propositions.
    ///
    /// The rewriting is a fixed point on its own output.
    pub fn to_positive_normal_form(&self) -> Self {
        match self {
            Self::True | Self::False | Self::Ap(_) => self.clone(),
            Self::And(lhs, rhs) => Self::And(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
            ),
            Self::Or(lhs, rhs) => Self::Or(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
            ),
            Self::Until(lhs, rhs, interval) => Self::Until(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
                *interval,
            ),
            Self::DualUntil(lhs, rhs, interval) => Self::DualUntil(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
                *interval,
            ),
            Self::Neg(inner) => match &**inner {
                Self::True => Self::False,
                Self::False => Self::True,
                Self::Ap(_) => self.clone(),
                Self::Neg(inner) => inner.to_positive_normal_form(),
                Self::And(lhs, rhs) => Self::Or(
                    Box::new(Self::Neg(lhs.clone()).to_positive_normal_form()),
                    Box::new(Self::Neg(rhs.clone()).to_positive_normal_form()),
                ),
                Self::Or(lhs, rhs) => Self::And(
                    Box::new(Self::Neg(lhs.clone()).to_positive_normal_form()),
                    Box::new(Self::Neg(rhs.clone()).to_positive_normal_form()),
                ),
                Self::Until(lhs, rhs, interval) => Self::DualUntil(
                    Box::new(Self::Neg(lhs.clone()).to_positive_normal_form()),
                    Box::new(Self::Neg(rhs.clone()).to_positive_normal_form()),
                    *interval,
                ),
                Self::DualUntil(lhs, rhs, interval) => Self::Until(
                    Box::new(Self::Neg(lhs.clone()).to_positive_normal_form()),
                    Box::new(Self::Neg(rhs.clone()).to_positive_normal_form()),
                    *interval,
                ),
            },
        }
    }

    /// Collect all subformulas whose top-level operator is `op`.
    ///
    /// The formula itself is included if it matches. The result is
    /// deduplicated by structural equality.
    pub fn get_subformulas_of_type(&self, op: LogicOp) -> BTreeSet<Self> {
        let mut result = BTreeSet::new();
        self.collect_subformulas(op, &mut result);
        result
    }

    fn collect_subformulas(&self, op: LogicOp, result: &mut BTreeSet<Self>) {
        if self.operator() == op {
            result.insert(self.clone());
        }
        match self {
            Self::True | Self::False | Self::Ap(_) => {}
            Self::Neg(inner) => inner.collect_subformulas(op, result),
            Self::And(lhs, rhs)
            | Self::Or(lhs, rhs)
            | Self::Until(lhs, rhs, _)
            | Self::DualUntil(lhs, rhs, _) => {
                lhs.collect_subformulas(op, result);
                rhs.collect_subformulas(op, result);
            }
        }
    }

    /// The set of atomic propositions occurring in the formula.
    pub fn get_alphabet(&self) -> BTreeSet<AtomicProposition<S>> {
        let mut result = BTreeSet::new();
        self.collect_alphabet(&mut result);
        result
    }

    fn collect_alphabet(&self, result: &mut BTreeSet<AtomicProposition<S>>) {
        match self {
            Self::True | Self::False => {}
            Self::Ap(ap) => {
                result.insert(ap.clone());
            }
            Self::Neg(inner) => inner.collect_alphabet(result),
            Self::And(lhs, rhs)
            | Self::Or(lhs, rhs)
            | Self::Until(lhs, rhs, _)
            | Self::DualUntil(lhs, rhs, _) => {
                lhs.collect_alphabet(result);
                rhs.collect_alphabet(result);
            }
        }
    }
}

impl<S: Symbol> From<AtomicProposition<S>> for MtlFormula<S> {
    fn from(ap: AtomicProposition<S>) -> Self {
        Self::Ap(ap)
    }
}

impl<S: Symbol> ops::BitAnd for MtlFormula<S> {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self::And(Box::new(self), Box::new(rhs))
    }
}

impl<S: Symbol> ops::BitOr for MtlFormula<S> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::Or(Box::new(self), Box::new(rhs))
    }
}

impl<S: Symbol> ops::Not for MtlFormula<S> {
    type Output = Self;

    fn not(self) -> Self {
        Self::Neg(Box::new(self))
    }
}

impl<S: Symbol> Display for MtlFormula<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "⊤"),
            Self::False => write!(f, "⊥"),
            Self::Ap(ap) => write!(f, "{ap}"),
            Self::Neg(inner) => write!(f, "¬{inner}"),
            Self::And(lhs, rhs) => write!(f, "({lhs} ∧ {rhs})"),
            Self::Or(lhs, rhs) => write!(f, "({lhs} ∨ {rhs})"),
            Self::Until(lhs, rhs, interval) => {
                if interval.is_trivial() {
                    write!(f, "({lhs} U {rhs})")
                } else {
                    write!(f, "({lhs} U{interval} {rhs})")
                }
            }
            Self::DualUntil(lhs, rhs, interval) => {
                if interval.is_trivial() {
                    write!(f, "({lhs} ~U {rhs})")
                } else {
                    write!(f, "({lhs} ~U{interval} {rhs})")
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ap(name: &str) -> MtlFormula<String> {
        MtlFormula::ap(name.to_string())
    }

    #[test]
    fn operators_build_the_expected_tree() {
        let f = ap("a") & !ap("b");
        assert_eq!(f.operator(), LogicOp::And);
        assert_eq!(f.to_string(), "(a ∧ ¬b)");

        let g = ap("a").until(ap("b"), TimeInterval::default());
        assert_eq!(g.operator(), LogicOp::Until);
        assert_eq!(g.to_string(), "(a U b)");

        let h = ap("a").dual_until(
            ap("b"),
            TimeInterval::new(1, BoundType::Strict, 3, BoundType::Weak),
        );
        assert_eq!(h.to_string(), "(a ~U(1, 3] b)");
    }

    #[test]
    fn pnf_pushes_negations_to_atomic_propositions() {
        let interval = TimeInterval::new_lower_bounded(2, BoundType::Weak);
        let f = !(ap("a").until(ap("b"), interval));
        let pnf = f.to_positive_normal_form();
        assert_eq!(
            pnf,
            (!ap("a")).dual_until(!ap("b"), interval)
                .to_positive_normal_form()
        );
        assert_eq!(pnf.operator(), LogicOp::DualUntil);

        let g = !(ap("a") & ap("b"));
        assert_eq!(g.to_positive_normal_form(), !ap("a") | !ap("b"));

        let h = !!ap("a");
        assert_eq!(h.to_positive_normal_form(), ap("a"));

        assert_eq!(
            (!MtlFormula::<String>::True).to_positive_normal_form(),
            MtlFormula::False
        );
    }

    #[test]
    fn pnf_is_idempotent() {
        let interval = TimeInterval::new_upper_bounded(1, BoundType::Strict);
        let formulas = [
            !(ap("a").until(ap("b"), interval)),
            !((ap("a") | !ap("b")) & ap("c")),
            ap("a").dual_until(!(ap("b") & ap("c")), interval),
            !MtlFormula::<String>::False,
        ];
        for f in formulas {
            let once = f.to_positive_normal_form();
            assert_eq!(once, once.to_positive_normal_form());
        }
    }

    #[test]
    fn subformula_collection_deduplicates() {
        let interval = TimeInterval::default();
        let until = ap("a").until(ap("b"), interval);
        // The same until occurs twice; it must be reported once.
        let f = until.clone() & (until.clone() | ap("c").dual_until(ap("d"), interval));

        let untils = f.get_subformulas_of_type(LogicOp::Until);
        assert_eq!(untils, BTreeSet::from([until]));

        let dual_untils = f.get_subformulas_of_type(LogicOp::DualUntil);
        assert_eq!(
            dual_untils,
            BTreeSet::from([ap("c").dual_until(ap("d"), interval)])
        );

        let aps = f.get_subformulas_of_type(LogicOp::Ap);
        assert_eq!(aps.len(), 4);
    }

    #[test]
    fn alphabet_contains_every_atomic_proposition() {
        let f = (ap("a") & !ap("b")) | ap("a").until(ap("c"), TimeInterval::default());
        assert_eq!(
            f.get_alphabet(),
            BTreeSet::from([
                AtomicProposition("a".to_string()),
                AtomicProposition("b".to_string()),
                AtomicProposition("c".to_string()),
            ])
        );
        assert!(MtlFormula::<String>::True.get_alphabet().is_empty());
    }

    #[test]
    fn formulas_are_totally_ordered() {
        let mut set = BTreeSet::new();
        set.insert(ap("b"));
        set.insert(ap("a"));
        set.insert(ap("a") & ap("b"));
        let rendered: Vec<_> = set.iter().map(|f| f.to_string()).collect();
        // Insertion order does not matter, iteration order is stable.
        assert_eq!(set.len(), 3);
        assert_eq!(rendered.len(), 3);
    }
}

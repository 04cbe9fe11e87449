//! Translation of MTL formulas into alternating timed automata.
//!
//! The construction follows Ouaknine and Worrell: the locations of the
//! resulting ATA are the until and dual-until subformulas of the input
//! (its *closure*), plus a synthetic initial location and the sink. Reading
//! a symbol structurally unfolds the formula via [`init`]; the temporal
//! obligations are tracked by one clock per active subformula, reset when an
//! obligation is spawned and checked against the operator's time interval
//! when it is discharged.
//!
//! The symbols `phi_i` (initial location) and `sink` are reserved by the
//! translation; an input alphabet containing `phi_i` is rejected.

use std::collections::BTreeSet;
use std::error;
use std::fmt::{self, Display};

use log::debug;

use tempo_automata::ata::formula::{create_conjunction, create_disjunction, Formula};
use tempo_automata::ata::{AlternatingTimedAutomaton, Transition};
use tempo_automata::ClockConstraint;
use tempo_logic::{AtomicProposition, BoundType, LogicOp, MtlFormula, Symbol, TimeInterval};

/// The reserved symbol of the synthetic initial location.
pub const INITIAL_LOCATION_SYMBOL: &str = "phi_i";

/// The reserved symbol of the sink location.
pub const SINK_LOCATION_SYMBOL: &str = "sink";

/// The ATA produced by the translation: locations are MTL formulas, input
/// symbols are the plant's action symbols.
pub type SpecificationAta<S> = AlternatingTimedAutomaton<MtlFormula<S>, S>;

/// Errors of the MTL→ATA translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// The input alphabet contains a symbol reserved by the translation.
    ReservedSymbol(String),
    /// A negation above a non-atomic subformula was encountered; the input
    /// was not in positive normal form.
    NotInPositiveNormalForm(String),
}

impl error::Error for TranslationError {}

impl Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::ReservedSymbol(symbol) => {
                write!(f, "the symbol '{symbol}' is reserved by the translation")
            }
            TranslationError::NotInPositiveNormalForm(formula) => {
                write!(f, "the formula {formula} is not in positive normal form")
            }
        }
    }
}

/// The closure of a formula: its until and dual-until subformulas.
pub fn get_closure<S: Symbol>(formula: &MtlFormula<S>) -> BTreeSet<MtlFormula<S>> {
    let mut closure = formula.get_subformulas_of_type(LogicOp::Until);
    closure.extend(formula.get_subformulas_of_type(LogicOp::DualUntil));
    closure
}

/// Translate an MTL formula into an ATA over the formula's own alphabet.
///
/// See [`translate_with_alphabet`] for translating over a larger alphabet.
pub fn translate<S>(formula: &MtlFormula<S>) -> Result<SpecificationAta<S>, TranslationError>
where
    S: Symbol + From<&'static str>,
{
    let alphabet = formula.get_alphabet();
    translate_with_alphabet(formula, alphabet)
}

/// Translate an MTL formula into an ATA over the given alphabet.
///
/// The input is brought into positive normal form first. The locations of
/// the result are the closure of the formula plus the synthetic initial
/// location `phi_i`; the accepting locations are the dual-until subformulas;
/// the sink location `sink` absorbs branches without a satisfiable
/// transition.
///
/// # Errors
///
/// Returns [`TranslationError::ReservedSymbol`] if the alphabet contains
/// `phi_i`.
pub fn translate_with_alphabet<S>(
    formula: &MtlFormula<S>,
    alphabet: BTreeSet<AtomicProposition<S>>,
) -> Result<SpecificationAta<S>, TranslationError>
where
    S: Symbol + From<&'static str>,
{
    let initial_symbol = S::from(INITIAL_LOCATION_SYMBOL);
    if alphabet.contains(&AtomicProposition(initial_symbol.clone())) {
        return Err(TranslationError::ReservedSymbol(
            INITIAL_LOCATION_SYMBOL.to_string(),
        ));
    }
    let formula = formula.to_positive_normal_form();
    debug!("Translating formula {formula}");

    let initial_location = MtlFormula::ap(initial_symbol);
    let sink_location = MtlFormula::ap(S::from(SINK_LOCATION_SYMBOL));
    let untils = formula.get_subformulas_of_type(LogicOp::Until);
    let dual_untils = formula.get_subformulas_of_type(LogicOp::DualUntil);

    let mut transitions = Vec::new();
    for symbol in &alphabet {
        transitions.push(Transition::new(
            initial_location.clone(),
            symbol.0.clone(),
            init(&formula, symbol, true)?,
        ));
        for until in &untils {
            let MtlFormula::Until(lhs, rhs, interval) = until else {
                unreachable!("closure contains only until and dual-until subformulas");
            };
            let transition_formula = create_disjunction(
                create_conjunction(init(rhs, symbol, false)?, create_contains(*interval)),
                create_conjunction(
                    init(lhs, symbol, false)?,
                    Formula::Location(until.clone()),
                ),
            );
            transitions.push(Transition::new(
                until.clone(),
                symbol.0.clone(),
                transition_formula,
            ));
        }
        for dual_until in &dual_untils {
            let MtlFormula::DualUntil(lhs, rhs, interval) = dual_until else {
                unreachable!("closure contains only until and dual-until subformulas");
            };
            let transition_formula = create_conjunction(
                create_disjunction(init(rhs, symbol, false)?, create_negated_contains(*interval)),
                create_disjunction(
                    init(lhs, symbol, false)?,
                    Formula::Location(dual_until.clone()),
                ),
            );
            transitions.push(Transition::new(
                dual_until.clone(),
                symbol.0.clone(),
                transition_formula,
            ));
        }
    }

    Ok(AlternatingTimedAutomaton::new(
        alphabet.into_iter().map(|ap| ap.0),
        initial_location,
        dual_untils,
        transitions,
        sink_location,
    ))
}

/// The structural encoding of reading `symbol` in `formula`.
///
/// Atomic propositions and their negations evaluate against the symbol;
/// conjunction and disjunction distribute; a closure subformula becomes a
/// reference to its location, clock-resetting unless this is the unfolding
/// of the initial location (`first`).
fn init<S: Symbol>(
    formula: &MtlFormula<S>,
    symbol: &AtomicProposition<S>,
    first: bool,
) -> Result<Formula<MtlFormula<S>>, TranslationError> {
    match formula {
        MtlFormula::True => Ok(Formula::True),
        MtlFormula::False => Ok(Formula::False),
        MtlFormula::Ap(ap) => {
            if ap == symbol {
                Ok(Formula::True)
            } else {
                Ok(Formula::False)
            }
        }
        MtlFormula::Neg(inner) => match &**inner {
            MtlFormula::Ap(ap) => {
                if ap == symbol {
                    Ok(Formula::False)
                } else {
                    Ok(Formula::True)
                }
            }
            _ => Err(TranslationError::NotInPositiveNormalForm(
                formula.to_string(),
            )),
        },
        MtlFormula::And(lhs, rhs) => Ok(create_conjunction(
            init(lhs, symbol, first)?,
            init(rhs, symbol, first)?,
        )),
        MtlFormula::Or(lhs, rhs) => Ok(create_disjunction(
            init(lhs, symbol, first)?,
            init(rhs, symbol, first)?,
        )),
        MtlFormula::Until(_, _, _) | MtlFormula::DualUntil(_, _, _) => {
            let location = Formula::Location(formula.clone());
            if first {
                Ok(location)
            } else {
                Ok(Formula::Reset(Box::new(location)))
            }
        }
    }
}

/// The clock-constraint formula satisfied exactly inside the interval.
///
/// Trivial bounds (a weak zero lower bound, an infinite upper bound) emit no
/// constraint.
fn create_contains<L: tempo_automata::Label>(interval: TimeInterval) -> Formula<L> {
    let mut result = Formula::True;
    match interval.lower_bound_type() {
        BoundType::Weak if interval.lower() > 0 => {
            result = create_conjunction(
                result,
                Formula::ClockConstraint(ClockConstraint::greater_equal(interval.lower())),
            );
        }
        BoundType::Strict => {
            result = create_conjunction(
                result,
                Formula::ClockConstraint(ClockConstraint::greater_than(interval.lower())),
            );
        }
        BoundType::Weak | BoundType::Infinite => {}
    }
    match interval.upper_bound_type() {
        BoundType::Weak => {
            result = create_conjunction(
                result,
                Formula::ClockConstraint(ClockConstraint::less_equal(interval.upper())),
            );
        }
        BoundType::Strict => {
            result = create_conjunction(
                result,
                Formula::ClockConstraint(ClockConstraint::less_than(interval.upper())),
            );
        }
        BoundType::Infinite => {}
    }
    result
}

/// The clock-constraint formula satisfied exactly outside the interval.
///
/// The complement of an interval is the disjunction of the flipped bounds.
fn create_negated_contains<L: tempo_automata::Label>(interval: TimeInterval) -> Formula<L> {
    let mut result = Formula::False;
    match interval.lower_bound_type() {
        BoundType::Weak if interval.lower() > 0 => {
            result = create_disjunction(
                result,
                Formula::ClockConstraint(ClockConstraint::less_than(interval.lower())),
            );
        }
        BoundType::Strict => {
            result = create_disjunction(
                result,
                Formula::ClockConstraint(ClockConstraint::less_equal(interval.lower())),
            );
        }
        BoundType::Weak | BoundType::Infinite => {}
    }
    match interval.upper_bound_type() {
        BoundType::Weak => {
            result = create_disjunction(
                result,
                Formula::ClockConstraint(ClockConstraint::greater_than(interval.upper())),
            );
        }
        BoundType::Strict => {
            result = create_disjunction(
                result,
                Formula::ClockConstraint(ClockConstraint::greater_equal(interval.upper())),
            );
        }
        BoundType::Infinite => {}
    }
    result
}

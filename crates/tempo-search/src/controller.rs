//! Extraction of a controller from a labelled search tree.
//!
//! A tree whose root carries the controller-wins label induces a timed
//! automaton: its locations are the word sets of the TOP-labelled nodes,
//! and for every TOP child there is one transition per incoming
//! `(region increment, action)` pair, guarded by the clock constraints of
//! the region reached after that increment.

use std::collections::BTreeSet;
use std::error;
use std::fmt::{self, Display};
use std::sync::Arc;

use tempo_automata::regions::{get_clock_constraints_from_region_index, RegionIndex};
use tempo_automata::ta::{Location, TimedAutomaton, Transition};
use tempo_automata::{ClockConstraint, Label};
use tempo_display_utils::join_iterator;
use tempo_logic::Symbol;

use crate::canonical_word::{AbRegionSymbol, CanonicalAbWord};
use crate::reg_a::reg_a;
use crate::search_tree::{NodeLabel, SearchTreeNode};
use crate::synchronous_product::get_nth_time_successor;

/// A set of canonical words serving as one controller location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalWordSet<L, A>(pub BTreeSet<CanonicalAbWord<L, A>>);

impl<L: Label, A: Symbol> Display for CanonicalWordSet<L, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", join_iterator(self.0.iter(), ", "))
    }
}

/// The timed automaton extracted as a controller.
pub type Controller<L, A> = TimedAutomaton<CanonicalWordSet<L, A>, A>;

/// Errors of the controller extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// The root of the tree is not labelled TOP: there is no controller.
    RootNotTop,
}

impl error::Error for ControllerError {}

impl Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::RootNotTop => write!(
                f,
                "cannot create a controller for a tree whose root is not labelled TOP"
            ),
        }
    }
}

/// The guard constraints of a time-successor word.
///
/// The word must be a plant-only projection; every region symbol
/// contributes the canonical constraints of its region, keyed by its clock.
pub fn get_constraints_from_time_successor<L: Label, A: Symbol>(
    word: &CanonicalAbWord<L, A>,
    max_constant: RegionIndex,
) -> BTreeSet<(String, ClockConstraint)> {
    let mut constraints = BTreeSet::new();
    for symbol in word.symbols() {
        let AbRegionSymbol::TaState(state) = symbol else {
            unreachable!("time-successor constraints are computed on plant projections");
        };
        for constraint in
            get_clock_constraints_from_region_index(state.region_index, max_constant)
        {
            constraints.insert((state.clock.clone(), constraint));
        }
    }
    constraints
}

/// Extract a controller automaton from a labelled search tree.
///
/// # Errors
///
/// Returns [`ControllerError::RootNotTop`] if the root is not labelled TOP.
pub fn create_controller<L: Label, A: Symbol>(
    root: &Arc<SearchTreeNode<L, A>>,
    max_constant: RegionIndex,
) -> Result<Controller<L, A>, ControllerError> {
    if root.label() != NodeLabel::Top {
        return Err(ControllerError::RootNotTop);
    }
    let initial_location = Location(CanonicalWordSet(root.words().clone()));
    let mut controller = TimedAutomaton::new(Vec::new(), initial_location, Vec::new());
    add_node_to_controller(root, max_constant, &mut controller);
    Ok(controller)
}

fn add_node_to_controller<L: Label, A: Symbol>(
    node: &Arc<SearchTreeNode<L, A>>,
    max_constant: RegionIndex,
    controller: &mut Controller<L, A>,
) {
    let source = Location(CanonicalWordSet(node.words().clone()));
    // The guards are reconstructed from the controller-observable part of
    // the node; all words of the node share it.
    let observable = node
        .words()
        .iter()
        .next()
        .map(reg_a)
        .unwrap_or_default();
    for child in node.children() {
        if child.label() != NodeLabel::Top {
            continue;
        }
        let target = Location(CanonicalWordSet(child.words().clone()));
        controller.add_location(target.clone());
        controller.add_final_location(target.clone());
        for (increment, action) in child.incoming_actions() {
            controller.add_action(action.clone());
            let constraints = get_constraints_from_time_successor(
                &get_nth_time_successor(&observable, *increment, max_constant),
                max_constant,
            );
            let mut transition =
                Transition::new(source.clone(), action.clone(), target.clone());
            for (clock, constraint) in constraints {
                controller.add_clock(clock.clone());
                transition = transition.with_clock_constraint(clock, constraint);
            }
            controller.add_transition(transition);
        }
        add_node_to_controller(&child, max_constant, controller);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::canonical_word::{Partition, TaRegionState};
    use crate::search_tree::NodeLabel;

    fn word(
        location: &str,
        clock: &str,
        region: RegionIndex,
    ) -> CanonicalAbWord<String, String> {
        CanonicalAbWord::new([Partition::from([AbRegionSymbol::TaState(
            TaRegionState::new(Location(location.to_string()), clock, region),
        )])])
    }

    #[test]
    fn extraction_requires_a_top_root() {
        let root = SearchTreeNode::new(
            BTreeSet::from([word("l0", "x", 0)]),
            None,
            BTreeSet::new(),
        );
        assert_eq!(
            create_controller(&root, 1),
            Err(ControllerError::RootNotTop)
        );
        root.set_label(NodeLabel::Bottom, false);
        assert_eq!(
            create_controller(&root, 1),
            Err(ControllerError::RootNotTop)
        );
    }

    #[test]
    fn constraints_of_a_time_successor_word() {
        let successor = word("l0", "x", 3);
        assert_eq!(
            get_constraints_from_time_successor(&successor, 2),
            BTreeSet::from([
                ("x".to_string(), ClockConstraint::greater_than(1)),
                ("x".to_string(), ClockConstraint::less_than(2)),
            ])
        );
        assert_eq!(
            get_constraints_from_time_successor(&word("l0", "x", 2), 2),
            BTreeSet::from([("x".to_string(), ClockConstraint::equal(1))])
        );
    }

    #[test]
    fn top_children_become_final_locations_with_guarded_transitions() {
        let root = SearchTreeNode::new(
            BTreeSet::from([word("l0", "x", 0)]),
            None,
            BTreeSet::new(),
        );
        let good = SearchTreeNode::new(
            BTreeSet::from([word("l1", "x", 0)]),
            Some(&root),
            BTreeSet::from([(1, "go".to_string())]),
        );
        let bad = SearchTreeNode::new(
            BTreeSet::from([word("l2", "x", 0)]),
            Some(&root),
            BTreeSet::from([(0, "stay".to_string())]),
        );
        root.set_label(NodeLabel::Top, false);
        good.set_label(NodeLabel::Top, false);
        bad.set_label(NodeLabel::Bottom, false);

        let controller = create_controller(&root, 2).unwrap();

        let initial = Location(CanonicalWordSet(root.words().clone()));
        let good_location = Location(CanonicalWordSet(good.words().clone()));
        let bad_location = Location(CanonicalWordSet(bad.words().clone()));
        assert_eq!(controller.get_initial_location(), &initial);
        assert!(controller.get_final_locations().contains(&good_location));
        assert!(!controller.get_locations().contains(&bad_location));
        assert_eq!(controller.get_alphabet(), &BTreeSet::from(["go".to_string()]));

        let transitions: Vec<_> = controller.get_transitions().collect();
        assert_eq!(transitions.len(), 1);
        let transition = transitions[0];
        assert_eq!(transition.source(), &initial);
        assert_eq!(transition.target(), &good_location);
        assert_eq!(transition.symbol(), "go");
        // Increment 1 from region 0 reaches the open interval (0, 1).
        assert_eq!(
            transition
                .clock_constraints()
                .cloned()
                .collect::<BTreeSet<_>>(),
            BTreeSet::from([
                ("x".to_string(), ClockConstraint::greater_than(0)),
                ("x".to_string(), ClockConstraint::less_than(1)),
            ])
        );
    }
}

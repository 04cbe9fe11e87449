//! End-to-end test of the controller extraction.

use std::collections::BTreeSet;
use std::sync::Arc;

use tempo_automata::ta::{Location, TimedAutomaton, Transition};
use tempo_automata::ClockConstraint;
use tempo_logic::{AtomicProposition, BoundType, MtlFormula, TimeInterval};
use tempo_search::controller::{create_controller, CanonicalWordSet, ControllerError};
use tempo_search::search_tree::NodeLabel;
use tempo_search::TreeSearch;
use tempo_translation::translate_with_alphabet;

fn loc(name: &str) -> Location<String> {
    Location(name.to_string())
}

fn ap(name: &str) -> MtlFormula<String> {
    MtlFormula::ap(name.to_string())
}

fn build_labelled_search() -> TreeSearch<String, String> {
    let mut ta = TimedAutomaton::new(
        ["a".to_string(), "b".to_string()],
        loc("l0"),
        [loc("l0"), loc("l1"), loc("l2")],
    );
    ta.add_clock("x");
    ta.add_transition(
        Transition::new(loc("l0"), "a".to_string(), loc("l0"))
            .with_clock_constraint("x", ClockConstraint::greater_than(1))
            .with_clock_resets(["x"]),
    );
    ta.add_transition(
        Transition::new(loc("l0"), "b".to_string(), loc("l1"))
            .with_clock_constraint("x", ClockConstraint::less_than(1)),
    );
    ta.add_transition(Transition::new(loc("l2"), "b".to_string(), loc("l1")));
    let spec = ap("a").until(ap("b"), TimeInterval::new_lower_bounded(2, BoundType::Weak));
    let alphabet: BTreeSet<_> = ["a", "b"]
        .iter()
        .map(|s| AtomicProposition(s.to_string()))
        .collect();
    let ata = Arc::new(translate_with_alphabet(&spec, alphabet).unwrap());
    let search = TreeSearch::new(
        Arc::new(ta),
        ata,
        BTreeSet::from(["a".to_string()]),
        BTreeSet::from(["b".to_string()]),
        2,
    )
    .unwrap();
    search.build_tree(false);
    search.label();
    search
}

#[test]
fn a_controller_is_extracted_from_a_top_labelled_tree() {
    let search = build_labelled_search();
    let root = search.get_root();
    assert_eq!(root.label(), NodeLabel::Top);

    let controller = create_controller(root, 2).unwrap();

    let initial = Location(CanonicalWordSet(root.words().clone()));
    assert_eq!(controller.get_initial_location(), &initial);
    // The initial location itself is not final; every TOP child becomes a
    // final location.
    assert!(!controller.get_final_locations().contains(&initial));

    let top_children: Vec<_> = root
        .children()
        .into_iter()
        .filter(|child| child.label() == NodeLabel::Top)
        .collect();
    assert_eq!(top_children.len(), 2);
    for child in &top_children {
        let location = Location(CanonicalWordSet(child.words().clone()));
        assert!(controller.get_locations().contains(&location));
        assert!(controller.get_final_locations().contains(&location));
    }
    // The BOTTOM child contributes no location.
    assert_eq!(controller.get_locations().len(), 3);

    // One transition per incoming action of a TOP child, guarded by the
    // region constraints of the corresponding time successor.
    let transitions: Vec<_> = controller.get_transitions().collect();
    assert_eq!(transitions.len(), 2);
    assert_eq!(controller.get_alphabet(), &BTreeSet::from(["b".to_string()]));
    assert_eq!(controller.get_clocks(), &BTreeSet::from(["x".to_string()]));

    let immediate = transitions
        .iter()
        .find(|t| {
            t.clock_constraints()
                .any(|(_, c)| *c == ClockConstraint::equal(0))
        })
        .expect("transition at increment 0");
    assert_eq!(immediate.symbol(), "b");
    assert_eq!(immediate.source(), &initial);

    let delayed = transitions
        .iter()
        .find(|t| {
            t.clock_constraints()
                .any(|(_, c)| *c == ClockConstraint::greater_than(0))
        })
        .expect("transition at increment 1");
    assert_eq!(
        delayed
            .clock_constraints()
            .cloned()
            .collect::<BTreeSet<_>>(),
        BTreeSet::from([
            ("x".to_string(), ClockConstraint::greater_than(0)),
            ("x".to_string(), ClockConstraint::less_than(1)),
        ])
    );
}

#[test]
fn extraction_fails_on_a_bottom_root() {
    let mut ta = TimedAutomaton::new(
        ["e".to_string(), "c".to_string()],
        loc("l0"),
        [loc("l0"), loc("l1")],
    );
    ta.add_clock("x");
    ta.add_transition(Transition::new(loc("l0"), "e".to_string(), loc("l0")));
    ta.add_transition(Transition::new(loc("l1"), "c".to_string(), loc("l1")));
    ta.add_transition(
        Transition::new(loc("l0"), "c".to_string(), loc("l1"))
            .with_clock_constraint("x", ClockConstraint::greater_than(1)),
    );
    let spec = MtlFormula::True.until(ap("e"), TimeInterval::default());
    let alphabet: BTreeSet<_> = ["e", "c"]
        .iter()
        .map(|s| AtomicProposition(s.to_string()))
        .collect();
    let ata = Arc::new(translate_with_alphabet(&spec, alphabet).unwrap());
    let search = TreeSearch::new(
        Arc::new(ta),
        ata,
        BTreeSet::from(["c".to_string()]),
        BTreeSet::from(["e".to_string()]),
        2,
    )
    .unwrap();
    search.build_tree(false);
    search.label();
    assert_eq!(search.get_root().label(), NodeLabel::Bottom);
    assert_eq!(
        create_controller(search.get_root(), 2),
        Err(ControllerError::RootNotTop)
    );
}

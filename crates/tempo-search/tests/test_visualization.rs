//! Tests of the Graphviz export of labelled search trees.

#![cfg(feature = "dot")]

use std::collections::BTreeSet;

use tempo_automata::ta::{Location, TimedAutomaton, Transition};
use tempo_automata::ClockConstraint;
use tempo_logic::{MtlFormula, TimeInterval};
use tempo_search::canonical_word::{
    AbRegionSymbol, AtaRegionState, CanonicalAbWord, Partition, TaRegionState,
};
use tempo_search::search_tree::{LabelReason, NodeLabel, SearchTreeNode};
use tempo_search::visualization::{search_tree_to_graphviz, ta_to_graphviz};

fn ta_state(location: &str, clock: &str, region: u32) -> AbRegionSymbol<String, String> {
    AbRegionSymbol::TaState(TaRegionState::new(
        Location(location.to_string()),
        clock,
        region,
    ))
}

fn ata_state(formula: MtlFormula<String>, region: u32) -> AbRegionSymbol<String, String> {
    AbRegionSymbol::AtaState(AtaRegionState::new(formula, region))
}

fn word(partitions: Vec<Vec<AbRegionSymbol<String, String>>>) -> CanonicalAbWord<String, String> {
    CanonicalAbWord::new(partitions.into_iter().map(|p| p.into_iter().collect::<Partition<_, _>>()))
}

#[test]
fn search_tree_rendering_uses_records_and_colors() {
    let a = MtlFormula::ap("a".to_string());
    let b = MtlFormula::ap("b".to_string());

    let root = SearchTreeNode::new(
        BTreeSet::from([word(vec![vec![
            ta_state("l0", "x", 0),
            ta_state("l0", "y", 0),
        ]])]),
        None,
        BTreeSet::new(),
    );
    let n1 = SearchTreeNode::new(
        BTreeSet::from([word(vec![
            vec![ta_state("l0", "x", 0)],
            vec![ta_state("l0", "y", 1)],
        ])]),
        Some(&root),
        BTreeSet::from([(1, "a".to_string())]),
    );
    let n2 = SearchTreeNode::new(
        BTreeSet::from([word(vec![
            vec![ta_state("l0", "x", 1)],
            vec![ta_state("l0", "y", 2)],
        ])]),
        Some(&root),
        BTreeSet::from([(2, "b".to_string())]),
    );
    let n3 = SearchTreeNode::new(
        BTreeSet::from([
            word(vec![
                vec![ta_state("l0", "x", 1)],
                vec![ta_state("l0", "y", 2)],
            ]),
            word(vec![
                vec![
                    ta_state("l0", "x", 1),
                    ata_state(a.until(b, TimeInterval::default()), 1),
                ],
                vec![ta_state("l0", "y", 2)],
            ]),
        ]),
        Some(&root),
        BTreeSet::from([(3, "c".to_string())]),
    );

    root.set_label_reason(LabelReason::GoodControllerActionFirst);
    root.set_label(NodeLabel::Top, false);
    n1.set_label_reason(LabelReason::DeadNode);
    n1.set_label(NodeLabel::Top, false);
    n2.set_label_reason(LabelReason::NoBadEnvAction);
    n2.set_label(NodeLabel::Bottom, false);
    n3.set_label_reason(LabelReason::BadEnvActionFirst);
    n3.set_label(NodeLabel::Bottom, false);

    let dot = search_tree_to_graphviz(&root);

    // All nodes are records.
    assert!(dot.contains("shape=record"));

    // The node labels carry the reason, the incoming actions and the words.
    assert!(dot.contains(
        r#"label="{good controller action first}|{}|{ { (l0, x, 0), (l0, y, 0) } }""#
    ));
    assert!(dot.contains(r#"label="{dead node}|{(1, a)}|{ { (l0, x, 0) }|{ (l0, y, 1) } }""#));
    assert!(
        dot.contains(r#"label="{no bad env action}|{(2, b)}|{ { (l0, x, 1) }|{ (l0, y, 2) } }""#)
    );
    assert!(dot.contains(
        r#"label="{bad env action first}|{(3, c)}|{ { (l0, x, 1) }|{ (l0, y, 2) } }|{ { (l0, x, 1), ((a U b), 1) }|{ (l0, y, 2) } }""#
    ));

    // TOP nodes are green, BOTTOM nodes red.
    assert!(dot.contains("color=green"));
    assert!(dot.contains("color=red"));

    // One edge per child.
    assert_eq!(dot.matches("->").count(), 3);
}

#[test]
fn timed_automaton_rendering_lists_locations_and_edges() {
    let mut ta = TimedAutomaton::new(
        ["a".to_string()],
        Location("l0".to_string()),
        [Location("l1".to_string())],
    );
    ta.add_clock("x");
    ta.add_transition(
        Transition::new(
            Location("l0".to_string()),
            "a".to_string(),
            Location("l1".to_string()),
        )
        .with_clock_constraint("x", ClockConstraint::less_than(1))
        .with_clock_resets(["x"]),
    );

    let dot = ta_to_graphviz(&ta);
    assert!(dot.starts_with("digraph TimedAutomaton {"));
    assert!(dot.contains(r#""l0" [shape=circle];"#));
    assert!(dot.contains(r#""l1" [shape=doublecircle];"#));
    assert!(dot.contains(r#"init -> "l0";"#));
    assert!(dot.contains(r#""l0" -> "l1" [label="a [x < 1] / {x}"];"#));
}

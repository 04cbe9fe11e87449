//! Graphviz export of search trees and timed automata.
//!
//! This module is only available with the `dot` feature. The generated
//! graphs are meant for debugging: every tree node is rendered as a record
//! listing its label reason, its incoming actions and its canonical words;
//! safe nodes are drawn green, bad ones red.

use std::sync::Arc;

use tempo_automata::ta::TimedAutomaton;
use tempo_automata::Label;
use tempo_display_utils::{indent_all, join_iterator};
use tempo_logic::Symbol;

use crate::canonical_word::{display_partition, CanonicalAbWord};
use crate::search_tree::{NodeLabel, SearchTreeNode};

/// Render a canonical word as a record field: partitions separated by `|`.
fn word_record<L: Label, A: Symbol>(word: &CanonicalAbWord<L, A>) -> String {
    format!(
        "{{ {} }}",
        join_iterator(word.partitions().iter().map(display_partition), "|")
    )
}

fn node_record<L: Label, A: Symbol>(node: &SearchTreeNode<L, A>) -> String {
    let incoming = join_iterator(
        node.incoming_actions()
            .iter()
            .map(|(step, action)| format!("({step}, {action})")),
        ", ",
    );
    let words = node
        .words()
        .iter()
        .map(|word| word_record(word))
        .collect::<Vec<_>>();
    let mut fields = vec![format!("{{{}}}", node.label_reason()), format!("{{{incoming}}}")];
    fields.extend(words);
    fields.join("|")
}

/// Render the labelled search tree in DOT format.
///
/// Every node has shape `record` with the fields
/// `{reason}|{incoming actions}|{word}…`; TOP nodes are green, BOTTOM nodes
/// red.
pub fn search_tree_to_graphviz<L: Label, A: Symbol>(root: &Arc<SearchTreeNode<L, A>>) -> String {
    let mut statements = vec!["node [shape=record];".to_string()];
    let mut next_id = 0usize;
    let mut stack = vec![(Arc::clone(root), 0usize)];
    while let Some((node, id)) = stack.pop() {
        let color = match node.label() {
            NodeLabel::Top => " color=green",
            NodeLabel::Bottom => " color=red",
            NodeLabel::Unlabeled | NodeLabel::Canceled => "",
        };
        statements.push(format!(
            "node_{id} [label=\"{}\"{color}];",
            node_record(&node)
        ));
        for child in node.children() {
            next_id += 1;
            statements.push(format!("node_{id} -> node_{next_id};"));
            stack.push((child, next_id));
        }
    }
    format!(
        "digraph SearchTree {{\n{}\n}}\n",
        indent_all(statements.join("\n"))
    )
}

/// Render a timed automaton in DOT format.
///
/// Final locations are drawn as double circles, the initial location is
/// marked by an arrow from an invisible node, and every transition edge is
/// labelled with its symbol, guard and resets.
pub fn ta_to_graphviz<L: Label, A: Label>(ta: &TimedAutomaton<L, A>) -> String {
    let mut statements = vec![
        "rankdir=LR;".to_string(),
        "init [shape=point, style=invis];".to_string(),
    ];
    for location in ta.get_locations() {
        let shape = if ta.get_final_locations().contains(location) {
            "doublecircle"
        } else {
            "circle"
        };
        statements.push(format!("\"{location}\" [shape={shape}];"));
    }
    statements.push(format!("init -> \"{}\";", ta.get_initial_location()));
    for transition in ta.get_transitions() {
        let mut label = transition.symbol().to_string();
        let guard = join_iterator(
            transition
                .clock_constraints()
                .map(|(clock, constraint)| format!("{clock} {constraint}")),
            " ∧ ",
        );
        if !guard.is_empty() {
            label.push_str(&format!(" [{guard}]"));
        }
        let resets = join_iterator(transition.clock_resets(), ", ");
        if !resets.is_empty() {
            label.push_str(&format!(" / {{{resets}}}"));
        }
        statements.push(format!(
            "\"{}\" -> \"{}\" [label=\"{label}\"];",
            transition.source(),
            transition.target()
        ));
    }
    format!(
        "digraph TimedAutomaton {{\n{}\n}}\n",
        indent_all(statements.join("\n"))
    )
}

//! Heuristics steering the expansion order of the search tree.
//!
//! A heuristic assigns a cost to a node about to be expanded; the search
//! enqueues the expansion with the negated cost as its priority, so cheaper
//! nodes are expanded first. Heuristics are hints for the scheduler, never
//! a correctness requirement.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};

use tempo_automata::Label;
use tempo_logic::Symbol;

use crate::search_tree::SearchTreeNode;

/// A cost function over search-tree nodes.
pub trait Heuristic<L, A>: Send + Sync {
    /// Compute the cost of expanding the node; lower costs expand earlier.
    fn compute_cost(&self, node: &SearchTreeNode<L, A>) -> i64;
}

/// Expand nodes in the order they were enqueued.
#[derive(Debug, Default)]
pub struct BfsHeuristic {
    counter: AtomicI64,
}

impl<L: Label, A: Symbol> Heuristic<L, A> for BfsHeuristic {
    fn compute_cost(&self, _node: &SearchTreeNode<L, A>) -> i64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }
}

/// Expand the most recently enqueued node first.
#[derive(Debug, Default)]
pub struct DfsHeuristic {
    counter: AtomicI64,
}

impl<L: Label, A: Symbol> Heuristic<L, A> for DfsHeuristic {
    fn compute_cost(&self, _node: &SearchTreeNode<L, A>) -> i64 {
        self.counter.fetch_sub(1, Ordering::Relaxed)
    }
}

/// Prefer nodes reachable early: the cost is the accumulated smallest
/// region increment along the path from the root.
#[derive(Debug, Default)]
pub struct TimeHeuristic;

impl<L: Label, A: Symbol> Heuristic<L, A> for TimeHeuristic {
    fn compute_cost(&self, node: &SearchTreeNode<L, A>) -> i64 {
        let own = earliest_increment(node);
        let mut cost = own;
        let mut current = node.parent();
        while let Some(ancestor) = current {
            cost += earliest_increment(&ancestor);
            current = ancestor.parent();
        }
        cost
    }
}

fn earliest_increment<L: Label, A: Symbol>(node: &SearchTreeNode<L, A>) -> i64 {
    node.incoming_actions()
        .iter()
        .map(|(step, _)| i64::from(*step))
        .min()
        .unwrap_or(0)
}

/// Prefer nodes reached by an environment action.
#[derive(Debug)]
pub struct PreferEnvironmentActionHeuristic<A> {
    environment_actions: BTreeSet<A>,
}

impl<A: Symbol> PreferEnvironmentActionHeuristic<A> {
    /// Create the heuristic from the set of environment actions.
    pub fn new(environment_actions: BTreeSet<A>) -> Self {
        Self {
            environment_actions,
        }
    }
}

impl<L: Label, A: Symbol + Send + Sync> Heuristic<L, A> for PreferEnvironmentActionHeuristic<A> {
    fn compute_cost(&self, node: &SearchTreeNode<L, A>) -> i64 {
        let reached_by_environment = node
            .incoming_actions()
            .iter()
            .any(|(_, action)| self.environment_actions.contains(action));
        i64::from(!reached_by_environment)
    }
}

/// Prefer nodes with few canonical words.
#[derive(Debug, Default)]
pub struct NumCanonicalWordsHeuristic;

impl<L: Label, A: Symbol> Heuristic<L, A> for NumCanonicalWordsHeuristic {
    fn compute_cost(&self, node: &SearchTreeNode<L, A>) -> i64 {
        node.words().len() as i64
    }
}

/// A weighted sum of heuristics.
pub struct CompositeHeuristic<L, A> {
    heuristics: Vec<(i64, Box<dyn Heuristic<L, A>>)>,
}

impl<L: Label, A: Symbol> CompositeHeuristic<L, A> {
    /// Create the composite from `(weight, heuristic)` pairs.
    pub fn new(heuristics: Vec<(i64, Box<dyn Heuristic<L, A>>)>) -> Self {
        Self { heuristics }
    }
}

impl<L: Label, A: Symbol> Heuristic<L, A> for CompositeHeuristic<L, A>
where
    L: Send + Sync,
    A: Send + Sync,
{
    fn compute_cost(&self, node: &SearchTreeNode<L, A>) -> i64 {
        self.heuristics
            .iter()
            .map(|(weight, heuristic)| weight * heuristic.compute_cost(node))
            .sum()
    }
}

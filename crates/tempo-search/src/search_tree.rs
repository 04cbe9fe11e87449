//! Nodes of the search tree and the two-player labelling.
//!
//! Each node owns a set of canonical words (the disjunctive reachable
//! configurations sharing one symbolic ancestry), the set of
//! `(region increment, action)` pairs it was reached by, and its labelling
//! state. Children are owned through [`Arc`]s, the parent link is a
//! [`Weak`] back-reference, so the tree is acyclic and dropped as a whole
//! with its root.
//!
//! Labels are monotonic: a node moves from [`NodeLabel::Unlabeled`] to
//! exactly one of [`NodeLabel::Top`], [`NodeLabel::Bottom`] or
//! [`NodeLabel::Canceled`] and never changes afterwards.

use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use log::trace;

use tempo_automata::regions::RegionIndex;
use tempo_automata::Label;
use tempo_display_utils::{indent_all, join_iterator};
use tempo_logic::Symbol;

use crate::canonical_word::CanonicalAbWord;

/// The search state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// The node has not been fully analyzed yet.
    Unknown,
    /// The node is safe: the specification cannot be violated from here.
    Good,
    /// The node violates the specification.
    Bad,
    /// The node has no successors.
    Dead,
}

impl Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Unknown => write!(f, "UNKNOWN"),
            NodeState::Good => write!(f, "GOOD"),
            NodeState::Bad => write!(f, "BAD"),
            NodeState::Dead => write!(f, "DEAD"),
        }
    }
}

/// The game label of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLabel {
    /// No label has been determined yet.
    Unlabeled,
    /// The controller wins from this node.
    Top,
    /// The environment wins from this node.
    Bottom,
    /// The node's label became irrelevant and its expansion was aborted.
    Canceled,
}

impl Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLabel::Unlabeled => write!(f, "UNLABELED"),
            NodeLabel::Top => write!(f, "TOP"),
            NodeLabel::Bottom => write!(f, "BOTTOM"),
            NodeLabel::Canceled => write!(f, "CANCELED"),
        }
    }
}

/// Why a node received its label; diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelReason {
    /// No reason recorded.
    Unknown,
    /// The node contains an accepting plant/specification configuration.
    BadNode,
    /// The node has no successors.
    DeadNode,
    /// Every word of the node carries the sink location.
    NoAtaSuccessor,
    /// An ancestor monotonically dominates the node.
    MonotonicDomination,
    /// No environment action leads to a bad child.
    NoBadEnvAction,
    /// A good controller action precedes every bad environment action.
    GoodControllerActionFirst,
    /// A bad environment action precedes every good controller action.
    BadEnvActionFirst,
}

impl Display for LabelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelReason::Unknown => write!(f, "unknown"),
            LabelReason::BadNode => write!(f, "bad node"),
            LabelReason::DeadNode => write!(f, "dead node"),
            LabelReason::NoAtaSuccessor => write!(f, "no ATA successor"),
            LabelReason::MonotonicDomination => write!(f, "monotonic domination"),
            LabelReason::NoBadEnvAction => write!(f, "no bad env action"),
            LabelReason::GoodControllerActionFirst => write!(f, "good controller action first"),
            LabelReason::BadEnvActionFirst => write!(f, "bad env action first"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct NodeStatus {
    state: NodeState,
    label: NodeLabel,
    label_reason: LabelReason,
}

/// A node of the search tree.
pub struct SearchTreeNode<L, A> {
    words: BTreeSet<CanonicalAbWord<L, A>>,
    incoming_actions: BTreeSet<(RegionIndex, A)>,
    parent: Weak<SearchTreeNode<L, A>>,
    children: RwLock<Vec<Arc<SearchTreeNode<L, A>>>>,
    status: Mutex<NodeStatus>,
    is_expanded: AtomicBool,
}

impl<L: Label, A: Symbol> SearchTreeNode<L, A> {
    /// Create a node and attach it to its parent, if any.
    pub fn new(
        words: BTreeSet<CanonicalAbWord<L, A>>,
        parent: Option<&Arc<SearchTreeNode<L, A>>>,
        incoming_actions: BTreeSet<(RegionIndex, A)>,
    ) -> Arc<Self> {
        let node = Arc::new(Self {
            words,
            incoming_actions,
            parent: parent.map(Arc::downgrade).unwrap_or_default(),
            children: RwLock::new(Vec::new()),
            status: Mutex::new(NodeStatus {
                state: NodeState::Unknown,
                label: NodeLabel::Unlabeled,
                label_reason: LabelReason::Unknown,
            }),
            is_expanded: AtomicBool::new(false),
        });
        if let Some(parent) = parent {
            parent
                .children
                .write()
                .expect("child list lock poisoned")
                .push(Arc::clone(&node));
        }
        node
    }

    /// The canonical words of the node.
    pub fn words(&self) -> &BTreeSet<CanonicalAbWord<L, A>> {
        &self.words
    }

    /// The `(region increment, action)` pairs the node was reached by.
    pub fn incoming_actions(&self) -> &BTreeSet<(RegionIndex, A)> {
        &self.incoming_actions
    }

    /// The parent node, `None` at the root.
    pub fn parent(&self) -> Option<Arc<SearchTreeNode<L, A>>> {
        self.parent.upgrade()
    }

    /// A snapshot of the node's children.
    pub fn children(&self) -> Vec<Arc<SearchTreeNode<L, A>>> {
        self.children
            .read()
            .expect("child list lock poisoned")
            .clone()
    }

    /// Drop all children; used when the node was canceled during expansion.
    pub fn clear_children(&self) {
        self.children
            .write()
            .expect("child list lock poisoned")
            .clear();
    }

    /// The search state of the node.
    pub fn state(&self) -> NodeState {
        self.status.lock().expect("status lock poisoned").state
    }

    /// Set the search state of the node.
    pub fn set_state(&self, state: NodeState) {
        self.status.lock().expect("status lock poisoned").state = state;
    }

    /// The game label of the node.
    pub fn label(&self) -> NodeLabel {
        self.status.lock().expect("status lock poisoned").label
    }

    /// The reason for the node's label.
    pub fn label_reason(&self) -> LabelReason {
        self.status.lock().expect("status lock poisoned").label_reason
    }

    /// Record why the node is being labelled.
    pub fn set_label_reason(&self, reason: LabelReason) {
        self.status.lock().expect("status lock poisoned").label_reason = reason;
    }

    /// Whether the node has been expanded.
    pub fn is_expanded(&self) -> bool {
        self.is_expanded.load(Ordering::Acquire)
    }

    /// Mark the node as expanded.
    pub fn mark_expanded(&self) {
        self.is_expanded.store(true, Ordering::Release);
    }

    /// The number of nodes in the subtree rooted at this node.
    pub fn size(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|child| child.size())
            .sum::<usize>()
    }

    /// Label the node.
    ///
    /// Only an unlabeled node takes the new label; labels never change once
    /// set. With `cancel_children`, labelling the node cancels all still
    /// unlabeled descendants, signalling the workers to skip them.
    pub fn set_label(&self, label: NodeLabel, cancel_children: bool) {
        assert!(label != NodeLabel::Unlabeled, "a node cannot be unlabelled");
        let newly_labeled = {
            let mut status = self.status.lock().expect("status lock poisoned");
            if status.label == NodeLabel::Unlabeled {
                status.label = label;
                true
            } else {
                false
            }
        };
        if newly_labeled && cancel_children {
            self.cancel_unlabeled_descendants();
        }
    }

    fn cancel_unlabeled_descendants(&self) {
        for child in self.children() {
            let newly_canceled = {
                let mut status = child.status.lock().expect("status lock poisoned");
                if status.label == NodeLabel::Unlabeled {
                    status.label = NodeLabel::Canceled;
                    true
                } else {
                    false
                }
            };
            if newly_canceled {
                child.cancel_unlabeled_descendants();
            }
        }
    }

    /// Propagate this node's label to its parent.
    ///
    /// The parent's label is recomputed from its children under the
    /// controller-wins-first-action rule: the controller wins iff no
    /// environment action leads to a bottom child, or some controller
    /// action leads to a top child strictly before every such environment
    /// action. With unlabeled siblings the parent is only labelled when the
    /// outcome can no longer change; a newly labelled parent propagates
    /// further up.
    pub fn label_propagate(
        &self,
        controller_actions: &BTreeSet<A>,
        environment_actions: &BTreeSet<A>,
        cancel_children: bool,
    ) {
        let Some(parent) = self.parent() else {
            return;
        };
        if parent.label() != NodeLabel::Unlabeled {
            return;
        }
        trace!("Propagating label to parent of {}", self);

        let mut first_good_controller: Option<RegionIndex> = None;
        let mut first_bad_environment: Option<RegionIndex> = None;
        let mut earliest_pending_controller: Option<RegionIndex> = None;
        let mut earliest_pending_environment: Option<RegionIndex> = None;
        let mut has_pending_children = false;
        for child in parent.children() {
            let label = child.label();
            if label == NodeLabel::Unlabeled {
                has_pending_children = true;
            }
            for (step, action) in child.incoming_actions() {
                match label {
                    NodeLabel::Top if controller_actions.contains(action) => {
                        min_assign(&mut first_good_controller, *step);
                    }
                    NodeLabel::Bottom if environment_actions.contains(action) => {
                        min_assign(&mut first_bad_environment, *step);
                    }
                    NodeLabel::Unlabeled => {
                        if controller_actions.contains(action) {
                            min_assign(&mut earliest_pending_controller, *step);
                        }
                        if environment_actions.contains(action) {
                            min_assign(&mut earliest_pending_environment, *step);
                        }
                    }
                    _ => {}
                }
            }
        }

        let decision = if has_pending_children {
            // Labels only accumulate, so the first bad environment step can
            // only move down to the earliest pending environment step, and
            // the first good controller step only down to the earliest
            // pending controller step. Decide as soon as no pending child
            // can change the outcome.
            let earliest_possible_bad =
                min_option(first_bad_environment, earliest_pending_environment);
            let earliest_possible_good =
                min_option(first_good_controller, earliest_pending_controller);
            if earliest_possible_bad.is_none() {
                Some((NodeLabel::Top, LabelReason::NoBadEnvAction))
            } else if first_good_controller
                .zip(earliest_possible_bad)
                .is_some_and(|(good, bad)| good < bad)
            {
                Some((NodeLabel::Top, LabelReason::GoodControllerActionFirst))
            } else if first_bad_environment
                .is_some_and(|bad| earliest_possible_good.map_or(true, |good| bad <= good))
            {
                Some((NodeLabel::Bottom, LabelReason::BadEnvActionFirst))
            } else {
                None
            }
        } else {
            Some(match first_bad_environment {
                None => (NodeLabel::Top, LabelReason::NoBadEnvAction),
                Some(bad) => {
                    if first_good_controller.is_some_and(|good| good < bad) {
                        (NodeLabel::Top, LabelReason::GoodControllerActionFirst)
                    } else {
                        (NodeLabel::Bottom, LabelReason::BadEnvActionFirst)
                    }
                }
            })
        };

        if let Some((label, reason)) = decision {
            parent.set_label_reason(reason);
            parent.set_label(label, cancel_children);
            parent.label_propagate(controller_actions, environment_actions, cancel_children);
        }
    }
}

/// Iterate over the subtree rooted at `node` in pre-order.
pub fn preorder<L: Label, A: Symbol>(node: &Arc<SearchTreeNode<L, A>>) -> Preorder<L, A> {
    Preorder {
        stack: vec![Arc::clone(node)],
    }
}

fn min_assign(slot: &mut Option<RegionIndex>, value: RegionIndex) {
    *slot = Some(slot.map_or(value, |current| current.min(value)));
}

fn min_option(lhs: Option<RegionIndex>, rhs: Option<RegionIndex>) -> Option<RegionIndex> {
    match (lhs, rhs) {
        (Some(l), Some(r)) => Some(l.min(r)),
        (value, None) | (None, value) => value,
    }
}

/// Pre-order traversal over a subtree.
pub struct Preorder<L, A> {
    stack: Vec<Arc<SearchTreeNode<L, A>>>,
}

impl<L: Label, A: Symbol> Iterator for Preorder<L, A> {
    type Item = Arc<SearchTreeNode<L, A>>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let children = node.children();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}

/// Render a node, optionally with its whole subtree.
pub fn node_to_string<L: Label, A: Symbol>(
    node: &SearchTreeNode<L, A>,
    include_children: bool,
) -> String {
    let incoming = join_iterator(
        node.incoming_actions()
            .iter()
            .map(|(step, action)| format!("({step}, {action})")),
        ", ",
    );
    let words = join_iterator(node.words().iter(), ", ");
    let mut result = format!(
        "{{ {words} }}: {}/{} ({}), incoming: {{{incoming}}}",
        node.state(),
        node.label(),
        node.label_reason(),
    );
    if include_children {
        for child in node.children() {
            result.push('\n');
            result.push_str(&indent_all(node_to_string(&child, true)));
        }
    }
    result
}

impl<L: Label, A: Symbol> Display for SearchTreeNode<L, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", node_to_string(self, true))
    }
}

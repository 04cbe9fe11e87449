//! Two-player reachability search over canonical words.
//!
//! Given a plant (a timed automaton) and a specification of undesired
//! behaviors (an alternating timed automaton obtained from an MTL formula),
//! [`TreeSearch`] builds a game tree over sets of canonical words: from
//! every node, time elapses symbolically and each action symbol leads to
//! the reachable successor classes, bucketed by their controller-observable
//! projection. Nodes are labelled TOP (controller wins) or BOTTOM
//! (environment wins) either bottom-up after the tree is built
//! ([`TreeSearch::label`]) or incrementally during construction. A TOP root
//! yields a controller via [`controller::create_controller`].

pub mod canonical_word;
pub mod controller;
pub mod heuristics;
pub mod reg_a;
pub mod search_tree;
pub mod synchronous_product;
#[cfg(feature = "dot")]
pub mod visualization;

use std::collections::{BTreeMap, BTreeSet};
use std::error;
use std::fmt::{self, Display};
use std::sync::Arc;

use log::{debug, trace};

use tempo_automata::regions::RegionIndex;
use tempo_automata::ta::TimedAutomaton;
use tempo_automata::Label;
use tempo_display_utils::join_iterator;
use tempo_logic::{MtlFormula, Symbol};
use tempo_task_pool::PriorityTaskPool;

use canonical_word::{get_canonical_word, AbRegionSymbol, CanonicalAbWord};
use heuristics::{BfsHeuristic, Heuristic};
use reg_a::reg_a;
use search_tree::{LabelReason, NodeLabel, NodeState, SearchTreeNode};
use synchronous_product::{
    get_candidate, get_next_canonical_words, get_time_successors, is_monotonically_dominated,
    SpecificationAta,
};

/// Errors of the search construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The controller and environment action sets overlap.
    ActionSetsNotDisjoint(String),
}

impl error::Error for SearchError {}

impl Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::ActionSetsNotDisjoint(actions) => write!(
                f,
                "controller and environment actions must be disjoint, both contain: {actions}"
            ),
        }
    }
}

/// Check whether any word of the node has a satisfiable specification
/// configuration.
///
/// A word carrying the sink location can never accept, so a node all of
/// whose words carry the sink is safe: the specification of undesired
/// behaviors is unsatisfiable from there.
pub fn has_satisfiable_ata_configuration<L: Label, A: Symbol>(
    node: &SearchTreeNode<L, A>,
    sink: &MtlFormula<A>,
) -> bool {
    !node.words().iter().all(|word| {
        word.symbols().any(
            |symbol| matches!(symbol, AbRegionSymbol::AtaState(state) if state.formula == *sink),
        )
    })
}

struct SearchContext<L, A> {
    ta: Arc<TimedAutomaton<L, A>>,
    ata: Arc<SpecificationAta<A>>,
    controller_actions: BTreeSet<A>,
    environment_actions: BTreeSet<A>,
    max_constant: RegionIndex,
    incremental_labeling: bool,
    terminate_early: bool,
    root: Arc<SearchTreeNode<L, A>>,
    pool: PriorityTaskPool<i64>,
    heuristic: Box<dyn Heuristic<L, A>>,
}

/// The search for a controller over the joint plant/specification state
/// space.
pub struct TreeSearch<L, A> {
    context: Arc<SearchContext<L, A>>,
}

impl<L, A> TreeSearch<L, A>
where
    L: Label + Send + Sync + 'static,
    A: Label + Send + Sync + 'static,
{
    /// Initialize a search with breadth-first expansion and batch
    /// labelling.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::ActionSetsNotDisjoint`] if an action is both
    /// a controller and an environment action.
    pub fn new(
        ta: Arc<TimedAutomaton<L, A>>,
        ata: Arc<SpecificationAta<A>>,
        controller_actions: BTreeSet<A>,
        environment_actions: BTreeSet<A>,
        max_constant: RegionIndex,
    ) -> Result<Self, SearchError> {
        Self::with_options(
            ta,
            ata,
            controller_actions,
            environment_actions,
            max_constant,
            false,
            false,
            Box::new(BfsHeuristic::default()),
        )
    }

    /// Initialize a search.
    ///
    /// With `incremental_labeling`, nodes are labelled as soon as their
    /// outcome is determined during construction; with `terminate_early`, a
    /// labelled node additionally cancels its unfinished descendants. The
    /// heuristic steers the expansion order.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::ActionSetsNotDisjoint`] if an action is both
    /// a controller and an environment action.
    #[allow(clippy::too_many_arguments)]
    pub fn with_options(
        ta: Arc<TimedAutomaton<L, A>>,
        ata: Arc<SpecificationAta<A>>,
        controller_actions: BTreeSet<A>,
        environment_actions: BTreeSet<A>,
        max_constant: RegionIndex,
        incremental_labeling: bool,
        terminate_early: bool,
        heuristic: Box<dyn Heuristic<L, A>>,
    ) -> Result<Self, SearchError> {
        let overlap: Vec<_> = controller_actions
            .intersection(&environment_actions)
            .collect();
        if !overlap.is_empty() {
            return Err(SearchError::ActionSetsNotDisjoint(join_iterator(
                overlap.into_iter(),
                ", ",
            )));
        }
        let root_word = get_canonical_word(
            &ta.get_initial_configuration(),
            &ata.get_initial_configuration(),
            max_constant,
        );
        let root = SearchTreeNode::new(BTreeSet::from([root_word]), None, BTreeSet::new());
        let context = Arc::new(SearchContext {
            ta,
            ata,
            controller_actions,
            environment_actions,
            max_constant,
            incremental_labeling,
            terminate_early,
            root,
            pool: PriorityTaskPool::new(),
            heuristic,
        });
        SearchContext::add_node_to_queue(&context, &Arc::clone(&context.root));
        Ok(Self { context })
    }

    /// The root of the search tree.
    pub fn get_root(&self) -> &Arc<SearchTreeNode<L, A>> {
        &self.context.root
    }

    /// Expand the next queued node on the calling thread.
    ///
    /// Returns `false` once the queue is empty.
    pub fn step(&self) -> bool {
        self.context.pool.step()
    }

    /// Build the complete search tree.
    ///
    /// With `multi_threaded`, worker threads process the expansion queue in
    /// parallel; otherwise the queue is stepped synchronously, which keeps
    /// the expansion order deterministic.
    pub fn build_tree(&self, multi_threaded: bool) {
        if multi_threaded {
            let workers = std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1);
            self.context.pool.start(workers);
            self.context.pool.wait();
        } else {
            while self.step() {}
        }
    }

    /// Label the tree bottom-up.
    ///
    /// Terminal nodes are labelled by their state; an inner node is TOP iff
    /// no environment action leads to a BOTTOM child or some controller
    /// action leads to a TOP child strictly before every bad environment
    /// action.
    pub fn label(&self) {
        self.label_node(&Arc::clone(&self.context.root));
    }

    fn label_node(&self, node: &Arc<SearchTreeNode<L, A>>) {
        match node.state() {
            NodeState::Good | NodeState::Dead => {
                node.set_label(NodeLabel::Top, self.context.terminate_early);
            }
            NodeState::Bad => {
                node.set_label(NodeLabel::Bottom, self.context.terminate_early);
            }
            NodeState::Unknown => {
                let children = node.children();
                for child in &children {
                    self.label_node(child);
                }
                let mut first_good_controller: Option<RegionIndex> = None;
                let mut first_bad_environment: Option<RegionIndex> = None;
                for child in &children {
                    let label = child.label();
                    for (step, action) in child.incoming_actions() {
                        if label == NodeLabel::Top
                            && self.context.controller_actions.contains(action)
                        {
                            first_good_controller = Some(
                                first_good_controller.map_or(*step, |c| c.min(*step)),
                            );
                        } else if label == NodeLabel::Bottom
                            && self.context.environment_actions.contains(action)
                        {
                            first_bad_environment = Some(
                                first_bad_environment.map_or(*step, |c| c.min(*step)),
                            );
                        }
                    }
                }
                let (label, reason) = match first_bad_environment {
                    None => (NodeLabel::Top, LabelReason::NoBadEnvAction),
                    Some(bad) => {
                        if first_good_controller.is_some_and(|good| good < bad) {
                            (NodeLabel::Top, LabelReason::GoodControllerActionFirst)
                        } else {
                            (NodeLabel::Bottom, LabelReason::BadEnvActionFirst)
                        }
                    }
                };
                node.set_label_reason(reason);
                node.set_label(label, self.context.terminate_early);
            }
        }
    }

    /// The number of nodes in the search tree.
    pub fn get_size(&self) -> usize {
        self.context.root.size()
    }
}

impl<L, A> SearchContext<L, A>
where
    L: Label + Send + Sync + 'static,
    A: Label + Send + Sync + 'static,
{
    fn add_node_to_queue(context: &Arc<Self>, node: &Arc<SearchTreeNode<L, A>>) {
        let cost = context.heuristic.compute_cost(node);
        let job_context = Arc::clone(context);
        let job_node = Arc::clone(node);
        context
            .pool
            .add_job(-cost, move || Self::expand_node(&job_context, &job_node));
    }

    /// Check whether some word of the node contains an accepting plant
    /// configuration together with an accepting specification
    /// configuration.
    fn is_bad_node(&self, node: &SearchTreeNode<L, A>) -> bool {
        node.words().iter().any(|word| {
            let (ta_configuration, ata_configuration) = get_candidate(word);
            ta_configuration
                .as_ref()
                .is_some_and(|configuration| self.ta.is_accepting_configuration(configuration))
                && self.ata.is_accepting_configuration(&ata_configuration)
        })
    }

    /// Check whether some ancestor monotonically dominates the node.
    fn dominates_ancestor(&self, node: &SearchTreeNode<L, A>) -> bool {
        let mut ancestor = node.parent();
        while let Some(current) = ancestor {
            if is_monotonically_dominated(current.words(), node.words()) {
                return true;
            }
            ancestor = current.parent();
        }
        false
    }

    fn expand_node(context: &Arc<Self>, node: &Arc<SearchTreeNode<L, A>>) {
        if node.is_expanded() || node.label() != NodeLabel::Unlabeled {
            return;
        }
        trace!("Processing node {node}");
        if context.is_bad_node(node) {
            node.set_label_reason(LabelReason::BadNode);
            node.set_state(NodeState::Bad);
            node.mark_expanded();
            if context.incremental_labeling {
                node.set_label(NodeLabel::Bottom, context.terminate_early);
                node.label_propagate(
                    &context.controller_actions,
                    &context.environment_actions,
                    context.terminate_early,
                );
            }
            return;
        }
        if !has_satisfiable_ata_configuration(node, context.ata.get_sink_location()) {
            node.set_label_reason(LabelReason::NoAtaSuccessor);
            node.set_state(NodeState::Good);
            node.mark_expanded();
            if context.incremental_labeling {
                node.set_label(NodeLabel::Top, context.terminate_early);
                node.label_propagate(
                    &context.controller_actions,
                    &context.environment_actions,
                    context.terminate_early,
                );
            }
            return;
        }
        if context.dominates_ancestor(node) {
            node.set_label_reason(LabelReason::MonotonicDomination);
            node.set_state(NodeState::Good);
            node.mark_expanded();
            if context.incremental_labeling {
                node.set_label(NodeLabel::Top, context.terminate_early);
                node.label_propagate(
                    &context.controller_actions,
                    &context.environment_actions,
                    context.terminate_early,
                );
            }
            return;
        }

        // Precompute the time successors once per word; every symbol reuses
        // them.
        let time_successors: BTreeMap<&CanonicalAbWord<L, A>, Vec<_>> = node
            .words()
            .iter()
            .map(|word| {
                (
                    word,
                    get_time_successors(word, context.max_constant).collect::<Vec<_>>(),
                )
            })
            .collect();

        // Partition all reachable successor words by their
        // controller-observable projection; each class becomes one child.
        let mut child_classes: BTreeMap<CanonicalAbWord<L, A>, BTreeSet<CanonicalAbWord<L, A>>> =
            BTreeMap::new();
        let mut outgoing_actions: BTreeMap<CanonicalAbWord<L, A>, BTreeSet<(RegionIndex, A)>> =
            BTreeMap::new();
        for symbol in context.ta.get_alphabet() {
            let mut successors: BTreeSet<(RegionIndex, CanonicalAbWord<L, A>)> = BTreeSet::new();
            for word_successors in time_successors.values() {
                for (increment, time_successor) in word_successors {
                    let candidate = get_candidate(time_successor);
                    for successor in get_next_canonical_words(
                        &context.ta,
                        &context.ata,
                        &candidate,
                        symbol,
                        context.max_constant,
                    ) {
                        successors.insert((*increment, successor));
                    }
                }
            }
            for (increment, successor) in successors {
                let class = reg_a(&successor);
                child_classes
                    .entry(class.clone())
                    .or_default()
                    .insert(successor);
                outgoing_actions
                    .entry(class)
                    .or_default()
                    .insert((increment, symbol.clone()));
            }
        }

        for (class, words) in child_classes {
            let incoming = outgoing_actions.remove(&class).unwrap_or_default();
            SearchTreeNode::new(words, Some(node), incoming);
        }
        debug!(
            "Expanded node into {} children",
            node.children().len()
        );

        // The node may have been canceled while its children were computed.
        if node.label() == NodeLabel::Canceled {
            node.clear_children();
            node.mark_expanded();
            return;
        }
        node.mark_expanded();
        for child in node.children() {
            Self::add_node_to_queue(context, &child);
        }
        if node.children().is_empty() {
            node.set_state(NodeState::Dead);
            node.set_label_reason(LabelReason::DeadNode);
            if context.incremental_labeling {
                node.set_label(NodeLabel::Top, context.terminate_early);
                node.label_propagate(
                    &context.controller_actions,
                    &context.environment_actions,
                    context.terminate_early,
                );
            }
        }
    }
}

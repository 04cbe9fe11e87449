//! The controller-observable projection of a canonical word.

use crate::canonical_word::{CanonicalAbWord, Partition};
use tempo_automata::Label;
use tempo_logic::Symbol;

/// Project a canonical word to its plant components.
///
/// All specification (ATA) symbols are erased and partitions left empty by
/// the erasure are dropped. The controller cannot observe the specification
/// automaton, so two successor words with the same projection belong to the
/// same child of a search node.
pub fn reg_a<L: Label, A: Symbol>(word: &CanonicalAbWord<L, A>) -> CanonicalAbWord<L, A> {
    CanonicalAbWord::new(word.partitions().iter().filter_map(|partition| {
        let plant_only: Partition<L, A> = partition
            .iter()
            .filter(|symbol| symbol.is_ta_state())
            .cloned()
            .collect();
        (!plant_only.is_empty()).then_some(plant_only)
    }))
}

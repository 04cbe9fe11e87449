//! Symbolic successor operators on canonical words.
//!
//! The search never works with concrete clock values: time elapse and action
//! steps are computed on canonical words. [`get_time_successor`] yields the
//! next region equivalence class reached by letting time pass,
//! [`get_candidate`] reconstructs one concrete configuration of a word's
//! class, and [`get_next_canonical_words`] combines the plant and
//! specification steps on an action symbol. [`monotonically_dominates`]
//! implements the order used to prune nodes subsumed by an ancestor.

use std::collections::{BTreeMap, BTreeSet};

use tempo_automata::regions::{max_region_index, RegionIndex};
use tempo_automata::ta::Location;
use tempo_automata::{ata, ta, Label, Time};
use tempo_logic::{MtlFormula, Symbol};

use crate::canonical_word::{
    get_canonical_word, is_valid_canonical_word, AbRegionSymbol, CanonicalAbWord, Partition,
};

/// The specification ATA: locations are MTL formulas over the action
/// symbols.
pub type SpecificationAta<A> = ata::AlternatingTimedAutomaton<MtlFormula<A>, A>;

/// A concrete representative of a canonical word's equivalence class.
///
/// The plant part is absent for words without plant symbols.
pub type Candidate<L, A> = (
    Option<ta::Configuration<L>>,
    ata::Configuration<MtlFormula<A>>,
);

/// The canonical word reached by letting just enough time pass for the
/// region configuration to change.
///
/// The last partition holding an unsaturated symbol is advanced: a
/// fractional partition reaches the next integer and moves to the front
/// (saturated symbols of that partition keep their place, their fractional
/// part is unobservable), while the previously integer-valued first
/// partition becomes fractional and slides behind the new front. A word
/// whose symbols are all saturated is its own successor.
pub fn get_time_successor<L: Label, A: Symbol>(
    word: &CanonicalAbWord<L, A>,
    max_constant: RegionIndex,
) -> CanonicalAbWord<L, A> {
    if word.is_empty() {
        return word.clone();
    }
    debug_assert!(is_valid_canonical_word(word, max_constant).is_ok());
    let max_region = max_region_index(max_constant);
    let Some(advanced) = word
        .partitions()
        .iter()
        .rposition(|partition| has_unsaturated(partition, max_region))
    else {
        // Every clock is beyond the maximal constant.
        return word.clone();
    };
    let partition = &word.partitions()[advanced];
    let crosses_integer = partition
        .iter()
        .find(|symbol| symbol.region_index() < max_region)
        .map(|symbol| symbol.region_index() % 2 == 1)
        .expect("advanced partition contains an unsaturated symbol");

    if !crosses_integer {
        // The integer partition opens up into the following open interval;
        // the shape of the word is preserved.
        let mut partitions = word.partitions().to_vec();
        partitions[advanced] = increment_unsaturated(partition, max_region);
        let successor = CanonicalAbWord::new(partitions);
        debug_assert!(is_valid_canonical_word(&successor, max_constant).is_ok());
        return successor;
    }

    // The fractional partition reaches the next integer and becomes the new
    // first partition. Saturated symbols stay behind in their old position.
    let front: Partition<L, A> = partition
        .iter()
        .filter(|symbol| symbol.region_index() < max_region)
        .map(|symbol| symbol.with_region_index(symbol.region_index() + 1))
        .collect();
    let leftover: Partition<L, A> = partition
        .iter()
        .filter(|symbol| symbol.region_index() == max_region)
        .cloned()
        .collect();

    let mut partitions = vec![front];
    for (index, other) in word.partitions().iter().enumerate() {
        if index == advanced {
            if !leftover.is_empty() {
                partitions.push(leftover.clone());
            }
        } else if index == 0 && has_unsaturated_even(other, max_region) {
            // The previously integer-valued symbols become fractional with
            // the smallest fractional part and follow the new front.
            partitions.push(increment_unsaturated(other, max_region));
        } else {
            partitions.push(other.clone());
        }
    }
    let successor = CanonicalAbWord::new(partitions);
    debug_assert!(is_valid_canonical_word(&successor, max_constant).is_ok());
    successor
}

fn has_unsaturated<L: Label, A: Symbol>(
    partition: &Partition<L, A>,
    max_region: RegionIndex,
) -> bool {
    partition
        .iter()
        .any(|symbol| symbol.region_index() < max_region)
}

fn has_unsaturated_even<L: Label, A: Symbol>(
    partition: &Partition<L, A>,
    max_region: RegionIndex,
) -> bool {
    partition
        .iter()
        .any(|symbol| symbol.region_index() < max_region && symbol.region_index() % 2 == 0)
}

fn increment_unsaturated<L: Label, A: Symbol>(
    partition: &Partition<L, A>,
    max_region: RegionIndex,
) -> Partition<L, A> {
    partition
        .iter()
        .map(|symbol| {
            if symbol.region_index() < max_region {
                symbol.with_region_index(symbol.region_index() + 1)
            } else {
                symbol.clone()
            }
        })
        .collect()
}

/// The n-fold application of [`get_time_successor`].
pub fn get_nth_time_successor<L: Label, A: Symbol>(
    word: &CanonicalAbWord<L, A>,
    n: RegionIndex,
    max_constant: RegionIndex,
) -> CanonicalAbWord<L, A> {
    let mut result = word.clone();
    for _ in 0..n {
        result = get_time_successor(&result, max_constant);
    }
    result
}

/// Lazily enumerate all time successors of a word together with their
/// region increment, starting with `(0, word)`.
///
/// The sequence is finite: it ends once the word where every clock is
/// saturated has been produced.
pub fn get_time_successors<L: Label, A: Symbol>(
    word: &CanonicalAbWord<L, A>,
    max_constant: RegionIndex,
) -> impl Iterator<Item = (RegionIndex, CanonicalAbWord<L, A>)> {
    std::iter::successors(Some((0, word.clone())), move |(increment, current)| {
        let next = get_time_successor(current, max_constant);
        if next == *current {
            None
        } else {
            Some((increment + 1, next))
        }
    })
}

/// Reconstruct one concrete configuration pair of the word's equivalence
/// class.
///
/// Partition `i` is assigned the fractional part `(i + off) / d` where `d`
/// is a power of two (so regrouping by fractional part is exact) and `off`
/// is 0 iff the first partition holds integer-valued symbols. The
/// reconstruction is a right inverse of [`get_canonical_word`].
pub fn get_candidate<L: Label, A: Symbol>(word: &CanonicalAbWord<L, A>) -> Candidate<L, A> {
    let mut location: Option<Location<L>> = None;
    let mut clock_valuations: BTreeMap<String, Time> = BTreeMap::new();
    let mut ata_configuration: ata::Configuration<MtlFormula<A>> = BTreeSet::new();

    let first_has_integer_fraction = word
        .partitions()
        .first()
        .is_some_and(|partition| partition.iter().any(|s| s.region_index() % 2 == 0));
    let offset = usize::from(!first_has_integer_fraction);
    let denominator = (word.len() + 1).next_power_of_two() as f64;

    for (index, partition) in word.partitions().iter().enumerate() {
        let fraction = (index + offset) as f64 / denominator;
        for symbol in partition {
            let value = concrete_value(symbol.region_index(), fraction);
            match symbol {
                AbRegionSymbol::TaState(state) => {
                    debug_assert!(
                        location.is_none() || location.as_ref() == Some(&state.location)
                    );
                    location = Some(state.location.clone());
                    clock_valuations.insert(state.clock.clone(), value);
                }
                AbRegionSymbol::AtaState(state) => {
                    ata_configuration.insert(ata::State::new(state.formula.clone(), value));
                }
            }
        }
    }

    let ta_configuration = location.map(|location| ta::Configuration {
        location,
        clock_valuations,
    });
    (ta_configuration, ata_configuration)
}

/// A concrete clock value inside the region, with the given fractional
/// part.
///
/// An even region index is the exact integer; an odd index with a zero
/// fraction can only be the saturated region, which also contains the next
/// integer.
fn concrete_value(region_index: RegionIndex, fraction: f64) -> Time {
    let integer = f64::from(region_index / 2);
    if region_index % 2 == 0 {
        Time::from(integer)
    } else if fraction == 0.0 {
        Time::from(integer + 1.0)
    } else {
        Time::from(integer + fraction)
    }
}

/// All canonical words reachable from the candidate configuration by
/// reading `symbol`: the cross product of the plant's enabled transitions
/// and the specification's minimal-model choices.
pub fn get_next_canonical_words<L: Label, A: Symbol>(
    ta: &ta::TimedAutomaton<L, A>,
    ata: &SpecificationAta<A>,
    candidate: &Candidate<L, A>,
    symbol: &A,
    max_constant: RegionIndex,
) -> BTreeSet<CanonicalAbWord<L, A>> {
    let (ta_configuration, ata_configuration) = candidate;
    let Some(ta_configuration) = ta_configuration else {
        return BTreeSet::new();
    };
    let mut result = BTreeSet::new();
    for ta_successor in ta.make_symbol_step(ta_configuration, symbol) {
        for ata_successor in ata.make_symbol_step(ata_configuration, symbol) {
            result.insert(get_canonical_word(&ta_successor, &ata_successor, max_constant));
        }
    }
    result
}

/// Check whether `dominating` monotonically dominates `dominated`.
///
/// Both words must carry the same region-symbol identities partition by
/// partition, with every region index in the dominating word at most the
/// matching index in the dominated word: the dominating word then describes
/// the same obligations at an earlier point in time.
pub fn monotonically_dominates<L: Label, A: Symbol>(
    dominating: &CanonicalAbWord<L, A>,
    dominated: &CanonicalAbWord<L, A>,
) -> bool {
    if dominating.len() != dominated.len() {
        return false;
    }
    dominating
        .partitions()
        .iter()
        .zip(dominated.partitions())
        .all(|(p1, p2)| partition_dominates(p1, p2))
}

fn partition_dominates<L: Label, A: Symbol>(
    dominating: &Partition<L, A>,
    dominated: &Partition<L, A>,
) -> bool {
    if dominating.len() != dominated.len() {
        return false;
    }
    let lhs = group_by_identity(dominating);
    let rhs = group_by_identity(dominated);
    if lhs.len() != rhs.len() {
        return false;
    }
    lhs.iter().all(|(identity, regions)| {
        rhs.get(identity).is_some_and(|other_regions| {
            regions.len() == other_regions.len()
                && regions
                    .iter()
                    .zip(other_regions)
                    .all(|(r1, r2)| r1 <= r2)
        })
    })
}

/// Group a partition's region indices by symbol identity (the symbol with
/// its region erased).
fn group_by_identity<L: Label, A: Symbol>(
    partition: &Partition<L, A>,
) -> BTreeMap<AbRegionSymbol<L, A>, Vec<RegionIndex>> {
    let mut groups: BTreeMap<AbRegionSymbol<L, A>, Vec<RegionIndex>> = BTreeMap::new();
    for symbol in partition {
        groups
            .entry(symbol.with_region_index(0))
            .or_default()
            .push(symbol.region_index());
    }
    // BTreeSet iteration yields the indices of one identity in ascending
    // order already.
    groups
}

/// Check whether every word of `dominated_words` is monotonically dominated
/// by some word of `dominating_words`.
pub fn is_monotonically_dominated<L: Label, A: Symbol>(
    dominating_words: &BTreeSet<CanonicalAbWord<L, A>>,
    dominated_words: &BTreeSet<CanonicalAbWord<L, A>>,
) -> bool {
    dominated_words.iter().all(|dominated| {
        dominating_words
            .iter()
            .any(|dominating| monotonically_dominates(dominating, dominated))
    })
}

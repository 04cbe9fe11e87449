//! Canonical words over regionalized plant and specification states.
//!
//! A joint configuration of the plant TA and the specification ATA is
//! abstracted into a [`CanonicalAbWord`]: the region symbols of all clocks
//! (one per plant clock, one per active ATA location) are grouped into
//! partitions by the fractional part of their clock value and the partitions
//! are ordered by increasing fractional part, the zero-fraction partition
//! first. Two configurations map to the same canonical word iff they are
//! region-equivalent, so the search can work with finitely many words.

use std::collections::{BTreeMap, BTreeSet};
use std::error;
use std::fmt::{self, Display};

use tempo_automata::regions::{fractional_part, max_region_index, region_index, RegionIndex};
use tempo_automata::ta::Location;
use tempo_automata::{ata, ta, Label, Time};
use tempo_display_utils::join_iterator;
use tempo_logic::{MtlFormula, Symbol};

/// The region state of one plant clock: location, clock name and the clock's
/// region.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaRegionState<L> {
    /// The plant location.
    pub location: Location<L>,
    /// The clock name.
    pub clock: String,
    /// The region of the clock value.
    pub region_index: RegionIndex,
}

impl<L: Label> TaRegionState<L> {
    /// Create a plant region state.
    pub fn new(location: Location<L>, clock: impl Into<String>, region_index: RegionIndex) -> Self {
        Self {
            location,
            clock: clock.into(),
            region_index,
        }
    }
}

impl<L: Label> Display for TaRegionState<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.location, self.clock, self.region_index)
    }
}

/// The region state of one active ATA location: the location (an MTL
/// formula) and the region of its clock.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtaRegionState<A> {
    /// The ATA location.
    pub formula: MtlFormula<A>,
    /// The region of the location's clock.
    pub region_index: RegionIndex,
}

impl<A: Symbol> AtaRegionState<A> {
    /// Create a specification region state.
    pub fn new(formula: MtlFormula<A>, region_index: RegionIndex) -> Self {
        Self {
            formula,
            region_index,
        }
    }
}

impl<A: Symbol> Display for AtaRegionState<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.formula, self.region_index)
    }
}

/// A region symbol: either a plant state or a specification state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AbRegionSymbol<L, A> {
    /// A plant (TA) region state.
    TaState(TaRegionState<L>),
    /// A specification (ATA) region state.
    AtaState(AtaRegionState<A>),
}

impl<L: Label, A: Symbol> AbRegionSymbol<L, A> {
    /// The region index of the symbol.
    pub fn region_index(&self) -> RegionIndex {
        match self {
            AbRegionSymbol::TaState(state) => state.region_index,
            AbRegionSymbol::AtaState(state) => state.region_index,
        }
    }

    /// The symbol with its region index replaced.
    pub fn with_region_index(&self, region_index: RegionIndex) -> Self {
        match self {
            AbRegionSymbol::TaState(state) => AbRegionSymbol::TaState(TaRegionState {
                region_index,
                ..state.clone()
            }),
            AbRegionSymbol::AtaState(state) => AbRegionSymbol::AtaState(AtaRegionState {
                region_index,
                ..state.clone()
            }),
        }
    }

    /// Check whether the symbol is a plant state.
    pub fn is_ta_state(&self) -> bool {
        matches!(self, AbRegionSymbol::TaState(_))
    }
}

impl<L: Label, A: Symbol> Display for AbRegionSymbol<L, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbRegionSymbol::TaState(state) => write!(f, "{state}"),
            AbRegionSymbol::AtaState(state) => write!(f, "{state}"),
        }
    }
}

/// One partition of a canonical word: a set of region symbols sharing a
/// fractional class.
pub type Partition<L, A> = BTreeSet<AbRegionSymbol<L, A>>;

/// Render a partition as `{ symbol, symbol }`.
pub fn display_partition<L: Label, A: Symbol>(partition: &Partition<L, A>) -> String {
    if partition.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", join_iterator(partition.iter(), ", "))
    }
}

/// A canonical word: partitions of region symbols ordered by strictly
/// increasing fractional part, the zero-fraction partition first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalAbWord<L, A>(Vec<Partition<L, A>>);

impl<L, A> Default for CanonicalAbWord<L, A> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<L: Label, A: Symbol> CanonicalAbWord<L, A> {
    /// Create a canonical word from its partitions.
    pub fn new(partitions: impl IntoIterator<Item = Partition<L, A>>) -> Self {
        Self(partitions.into_iter().collect())
    }

    /// The partitions of the word.
    pub fn partitions(&self) -> &[Partition<L, A>] {
        &self.0
    }

    /// The number of partitions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the word has no partitions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over all region symbols of the word.
    pub fn symbols(&self) -> impl Iterator<Item = &AbRegionSymbol<L, A>> {
        self.0.iter().flatten()
    }
}

impl<L: Label, A: Symbol> From<Vec<Partition<L, A>>> for CanonicalAbWord<L, A> {
    fn from(partitions: Vec<Partition<L, A>>) -> Self {
        Self(partitions)
    }
}

impl<L: Label, A: Symbol> Display for CanonicalAbWord<L, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "[]");
        }
        write!(
            f,
            "[ {} ]",
            join_iterator(self.0.iter().map(display_partition), ", ")
        )
    }
}

/// Violations of the canonical word invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidCanonicalWordError {
    /// The word has no partitions.
    EmptyWord,
    /// A partition is empty.
    EmptyPartition(usize),
    /// A partition mixes integer-valued and fractional region indices.
    MixedFractionalClasses(usize),
    /// An unsaturated even region index occurs outside the first partition.
    IntegerSymbolNotInFirstPartition(usize),
    /// A region index exceeds the maximal region.
    RegionIndexTooLarge {
        /// The offending index.
        region_index: RegionIndex,
        /// The maximal region index.
        max_region_index: RegionIndex,
    },
}

impl error::Error for InvalidCanonicalWordError {}

impl Display for InvalidCanonicalWordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid canonical word: ")?;
        match self {
            InvalidCanonicalWordError::EmptyWord => write!(f, "the word has no partitions"),
            InvalidCanonicalWordError::EmptyPartition(index) => {
                write!(f, "partition {index} is empty")
            }
            InvalidCanonicalWordError::MixedFractionalClasses(index) => {
                write!(f, "partition {index} mixes fractional classes")
            }
            InvalidCanonicalWordError::IntegerSymbolNotInFirstPartition(index) => {
                write!(
                    f,
                    "partition {index} contains an integer-valued region symbol"
                )
            }
            InvalidCanonicalWordError::RegionIndexTooLarge {
                region_index,
                max_region_index,
            } => write!(
                f,
                "region index {region_index} exceeds the maximal region index {max_region_index}"
            ),
        }
    }
}

/// Check the canonical word invariants.
///
/// Symbols at the maximal region index are exempt from the even/odd
/// placement rules: the fractional part of a saturated clock is not
/// observable.
pub fn is_valid_canonical_word<L: Label, A: Symbol>(
    word: &CanonicalAbWord<L, A>,
    max_constant: RegionIndex,
) -> Result<(), InvalidCanonicalWordError> {
    if word.is_empty() {
        return Err(InvalidCanonicalWordError::EmptyWord);
    }
    let max_region = max_region_index(max_constant);
    for (index, partition) in word.partitions().iter().enumerate() {
        if partition.is_empty() {
            return Err(InvalidCanonicalWordError::EmptyPartition(index));
        }
        let mut has_even = false;
        let mut has_odd = false;
        for symbol in partition {
            let region = symbol.region_index();
            if region > max_region {
                return Err(InvalidCanonicalWordError::RegionIndexTooLarge {
                    region_index: region,
                    max_region_index: max_region,
                });
            }
            if region == max_region {
                continue;
            }
            if region % 2 == 0 {
                has_even = true;
            } else {
                has_odd = true;
            }
        }
        if has_even && has_odd {
            return Err(InvalidCanonicalWordError::MixedFractionalClasses(index));
        }
        if has_even && index > 0 {
            return Err(InvalidCanonicalWordError::IntegerSymbolNotInFirstPartition(
                index,
            ));
        }
    }
    Ok(())
}

/// Abstract a joint plant/specification configuration into its canonical
/// word.
pub fn get_canonical_word<L: Label, A: Symbol>(
    ta_configuration: &ta::Configuration<L>,
    ata_configuration: &ata::Configuration<MtlFormula<A>>,
    max_constant: RegionIndex,
) -> CanonicalAbWord<L, A> {
    let mut partitions: BTreeMap<Time, Partition<L, A>> = BTreeMap::new();
    for (clock, &value) in &ta_configuration.clock_valuations {
        partitions
            .entry(Time::from(fractional_part(value)))
            .or_default()
            .insert(AbRegionSymbol::TaState(TaRegionState::new(
                ta_configuration.location.clone(),
                clock.clone(),
                region_index(value, max_constant),
            )));
    }
    for state in ata_configuration {
        partitions
            .entry(Time::from(fractional_part(state.clock)))
            .or_default()
            .insert(AbRegionSymbol::AtaState(AtaRegionState::new(
                state.location.clone(),
                region_index(state.clock, max_constant),
            )));
    }
    let word = CanonicalAbWord(partitions.into_values().collect());
    debug_assert!(is_valid_canonical_word(&word, max_constant).is_ok());
    word
}

#[cfg(test)]
mod test {
    use super::*;
    use tempo_automata::ata::State;

    fn ta_state(location: &str, clock: &str, region: RegionIndex) -> AbRegionSymbol<String, String> {
        AbRegionSymbol::TaState(TaRegionState::new(
            Location(location.to_string()),
            clock,
            region,
        ))
    }

    fn ata_state(name: &str, region: RegionIndex) -> AbRegionSymbol<String, String> {
        AbRegionSymbol::AtaState(AtaRegionState::new(
            MtlFormula::ap(name.to_string()),
            region,
        ))
    }

    #[test]
    fn print_region_states() {
        let ta = TaRegionState::new(Location("s".to_string()), "c", 1);
        assert_eq!(ta.to_string(), "(s, c, 1)");
        let ata = AtaRegionState::new(MtlFormula::ap("s".to_string()), 2);
        assert_eq!(ata.to_string(), "(s, 2)");
        assert_eq!(ta_state("s", "c", 1).to_string(), "(s, c, 1)");
        assert_eq!(ata_state("s", 2).to_string(), "(s, 2)");
    }

    #[test]
    fn print_partitions_and_words() {
        assert_eq!(display_partition::<String, String>(&Partition::new()), "{}");
        let partition = Partition::from([ta_state("s", "c", 1), ata_state("s", 2)]);
        assert_eq!(display_partition(&partition), "{ (s, c, 1), (s, 2) }");

        assert_eq!(CanonicalAbWord::<String, String>::default().to_string(), "[]");
        let word = CanonicalAbWord::new([
            Partition::from([ta_state("s", "c", 1), ata_state("s", 2)]),
            Partition::from([ta_state("s", "c2", 5), ata_state("a", 3)]),
            Partition::from([ta_state("s2", "c3", 10)]),
        ]);
        assert_eq!(
            word.to_string(),
            "[ { (s, c, 1), (s, 2) }, { (s, c2, 5), (a, 3) }, { (s2, c3, 10) } ]"
        );
    }

    #[test]
    fn ta_symbols_precede_ata_symbols_in_a_partition() {
        let partition = Partition::from([ata_state("a", 0), ta_state("s", "c", 0)]);
        let symbols: Vec<_> = partition.iter().cloned().collect();
        assert_eq!(symbols, vec![ta_state("s", "c", 0), ata_state("a", 0)]);
    }

    #[test]
    fn canonical_word_of_a_simple_configuration() {
        let ta_configuration =
            ta::Configuration::new(Location("s".to_string()), [("c", Time::from(0.0))]);
        let ata_configuration =
            ata::Configuration::from([State::new(MtlFormula::ap("a".to_string()), Time::from(0.0))]);
        let word = get_canonical_word(&ta_configuration, &ata_configuration, 5);
        assert_eq!(
            word,
            CanonicalAbWord::new([Partition::from([
                ta_state("s", "c", 0),
                ata_state("a", 0)
            ])])
        );
    }

    #[test]
    fn canonical_word_groups_by_fractional_part() {
        let ta_configuration = ta::Configuration::new(
            Location("s".to_string()),
            [("c1", Time::from(0.1)), ("c2", Time::from(0.5))],
        );
        let ata_configuration = ata::Configuration::from([
            State::new(MtlFormula::ap("a".to_string()), Time::from(0.5)),
            State::new(MtlFormula::ap("b".to_string()), Time::from(1.5)),
        ]);
        let word = get_canonical_word(&ta_configuration, &ata_configuration, 3);
        assert_eq!(
            word,
            CanonicalAbWord::new([
                Partition::from([ta_state("s", "c1", 1)]),
                Partition::from([
                    ta_state("s", "c2", 1),
                    ata_state("a", 1),
                    ata_state("b", 3)
                ]),
            ])
        );
    }

    #[test]
    fn validity_checks() {
        let max_constant = 3;
        assert_eq!(
            is_valid_canonical_word(&CanonicalAbWord::<String, String>::default(), max_constant),
            Err(InvalidCanonicalWordError::EmptyWord)
        );
        assert!(is_valid_canonical_word(
            &CanonicalAbWord::new([
                Partition::from([ta_state("s0", "c0", 0)]),
                Partition::from([ta_state("s0", "c1", 1)]),
            ]),
            max_constant
        )
        .is_ok());
        assert_eq!(
            is_valid_canonical_word(
                &CanonicalAbWord::<String, String>::new([Partition::new()]),
                max_constant
            ),
            Err(InvalidCanonicalWordError::EmptyPartition(0))
        );
        assert_eq!(
            is_valid_canonical_word(
                &CanonicalAbWord::new([Partition::from([
                    ta_state("s0", "c0", 0),
                    ta_state("s0", "c1", 1),
                ])]),
                max_constant
            ),
            Err(InvalidCanonicalWordError::MixedFractionalClasses(0))
        );
        assert_eq!(
            is_valid_canonical_word(
                &CanonicalAbWord::new([
                    Partition::from([ta_state("s0", "c0", 0)]),
                    Partition::from([ta_state("s0", "c1", 0)]),
                ]),
                max_constant
            ),
            Err(InvalidCanonicalWordError::IntegerSymbolNotInFirstPartition(1))
        );
        assert_eq!(
            is_valid_canonical_word(
                &CanonicalAbWord::new([
                    Partition::from([ta_state("s0", "c0", 0)]),
                    Partition::from([ta_state("s0", "c1", 2)]),
                ]),
                max_constant
            ),
            Err(InvalidCanonicalWordError::IntegerSymbolNotInFirstPartition(1))
        );
        assert_eq!(
            is_valid_canonical_word(
                &CanonicalAbWord::new([Partition::from([ta_state("s0", "c0", 9)])]),
                max_constant
            ),
            Err(InvalidCanonicalWordError::RegionIndexTooLarge {
                region_index: 9,
                max_region_index: 7
            })
        );
        // Saturated symbols may share a partition with any fractional class.
        assert!(is_valid_canonical_word(
            &CanonicalAbWord::new([Partition::from([
                ta_state("s0", "c0", 2),
                ata_state("a", 7),
            ])]),
            max_constant
        )
        .is_ok());
    }
}

//! Species-label extraction from hierarchical taxonomy headers.
//!
//! Reference taxonomies routinely terminate in placeholder ranks
//! ("uncultured bacterium", "soil metagenome") that are not true species
//! assignments; walking upward from the deepest rank finds the deepest
//! informative one.

use std::fmt;

/// A single rank-rejection rule.
///
/// Kept as named predicates rather than inline conditionals so additional
/// reference-database taxonomies can add rules without touching the
/// traversal in [`deepest_informative_rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankRule {
    /// Rejects an empty rank.
    Empty,
    /// Rejects ranks starting with "unidentified".
    UnidentifiedPrefix,
    /// Rejects ranks starting with "bacterium".
    BacteriumPrefix,
    /// Rejects ranks starting with "uncultured".
    UnculturedPrefix,
    /// Rejects ranks ending with "metagenome" (suffix match, so
    /// "soil metagenome" is rejected along with "metagenome" itself).
    MetagenomeSuffix,
}

impl RankRule {
    /// True when this rule rejects the given (lowercased) rank.
    pub fn rejects(self, rank: &str) -> bool {
        match self {
            Self::Empty => rank.is_empty(),
            Self::UnidentifiedPrefix => rank.starts_with("unidentified"),
            Self::BacteriumPrefix => rank.starts_with("bacterium"),
            Self::UnculturedPrefix => rank.starts_with("uncultured"),
            Self::MetagenomeSuffix => rank.ends_with("metagenome"),
        }
    }
}

impl fmt::Display for RankRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::UnidentifiedPrefix => write!(f, "unidentified prefix"),
            Self::BacteriumPrefix => write!(f, "bacterium prefix"),
            Self::UnculturedPrefix => write!(f, "uncultured prefix"),
            Self::MetagenomeSuffix => write!(f, "metagenome suffix"),
        }
    }
}

/// The rejection rules applied to every rank, in evaluation order.
pub const REJECTION_RULES: [RankRule; 5] = [
    RankRule::Empty,
    RankRule::UnidentifiedPrefix,
    RankRule::BacteriumPrefix,
    RankRule::UnculturedPrefix,
    RankRule::MetagenomeSuffix,
];

/// True when any rejection rule fires for the given rank.
fn is_rejected(rank: &str) -> bool {
    REJECTION_RULES.iter().any(|rule| rule.rejects(rank))
}

/// The deepest rank of a taxonomy string that passed every rejection rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRank {
    /// Deepest non-rejected rank, lowercased.
    pub label: String,
    /// True when `label` was the terminal (deepest) rank of the input,
    /// i.e. a species-level assignment. When false the label is still a
    /// usable name, but callers record an empty species string.
    pub is_species: bool,
}

/// Extracts the deepest informative rank from a semicolon-delimited
/// taxonomy string ordered shallowest to deepest.
///
/// Ranks are scanned from the deepest to the shallowest; the first rank
/// not rejected by [`REJECTION_RULES`] wins. Returns `None` when every
/// rank is rejected.
pub fn deepest_informative_rank(taxonomy: &str) -> Option<ResolvedRank> {
    let ranks: Vec<&str> = taxonomy.split(';').collect();
    let mut is_species = true;

    for rank in ranks.iter().rev() {
        let rank = rank.trim().to_lowercase();
        if is_rejected(&rank) {
            is_species = false;
            continue;
        }
        return Some(ResolvedRank {
            label: rank,
            is_species,
        });
    }

    None
}

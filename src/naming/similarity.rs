//! Duplicate and near-duplicate detection for reference-table names.
//!
//! Names are compared after [`normalize`]. Identical normalized names are an
//! exact duplicate; otherwise names within a small Levenshtein distance are
//! reported as similar, with the allowed distance growing with the length of
//! the candidate. Short names (three characters or fewer) only ever match
//! exactly.

use serde::Serialize;
use utoipa::ToSchema;

/// Collapses whitespace runs to a single space, trims, and uppercases.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Maximum edit distance still considered similar for a normalized name of
/// `len` characters.
#[must_use]
pub const fn threshold(len: usize) -> usize {
    match len {
        0..=3 => 0,
        4..=6 => 1,
        _ => 2,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SimilarMatch {
    pub name: String,
    pub distance: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SimilarityOutcome {
    /// An existing name normalizes to the same string as the candidate.
    Exact { name: String },
    /// Near matches, closest first.
    Similar { matches: Vec<SimilarMatch> },
    NoMatch,
}

impl SimilarityOutcome {
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, Self::NoMatch)
    }

    /// The existing name closest to the candidate, if any.
    #[must_use]
    pub fn closest(&self) -> Option<&str> {
        match self {
            Self::Exact { name } => Some(name),
            Self::Similar { matches } => matches.first().map(|m| m.name.as_str()),
            Self::NoMatch => None,
        }
    }
}

/// Checks `candidate` against `existing` names.
///
/// The first exact match wins. Otherwise every existing name with a distance
/// in `1..=threshold` is returned, sorted by distance; ties keep input order.
pub fn check_similarity<I, S>(candidate: &str, existing: I) -> SimilarityOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let normalized = normalize(candidate);
    let limit = threshold(normalized.chars().count());
    let mut matches = Vec::new();

    for name in existing {
        let name = name.as_ref();
        let other = normalize(name);
        if other == normalized {
            return SimilarityOutcome::Exact {
                name: name.to_string(),
            };
        }
        if limit == 0 {
            continue;
        }
        let distance = strsim::levenshtein(&normalized, &other);
        if distance > 0 && distance <= limit {
            matches.push(SimilarMatch {
                name: name.to_string(),
                distance,
            });
        }
    }

    if matches.is_empty() {
        SimilarityOutcome::NoMatch
    } else {
        matches.sort_by_key(|m| m.distance);
        SimilarityOutcome::Similar { matches }
    }
}

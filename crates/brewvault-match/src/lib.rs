//! Name normalisation and fuzzy matching
//!
//! Free-text ingredient and recipe names arrive in many spellings
//! ("Safale US-05", "us05", "US-05 American Ale"). This crate canonicalises
//! them ([`normalize`], [`AliasTable`]) and scores candidates against a
//! reference set ([`match_names`]) with a confidence in [0, 1].
//!
//! The matcher is pure with respect to any store: it sees only name strings
//! plus opaque back-references, never entity state.

use serde::{Deserialize, Serialize};

pub mod aliases;
pub mod substitutes;

pub use aliases::AliasTable;
pub use substitutes::SubstituteTable;

/// One scored match. Ephemeral; produced per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Opaque back-reference to the canonical record (caller-supplied).
    pub id: String,
    /// The candidate's display name as given.
    pub name: String,
    /// The candidate's canonical token (normalised name).
    pub token: String,
    /// Normalised similarity in [0.0, 1.0].
    pub confidence: f64,
}

/// Lowercase, trim, collapse internal whitespace, then resolve aliases.
///
/// Deterministic and pure. The alias table is data, not logic: extending it
/// never touches matching code.
pub fn normalize(raw: &str, aliases: &AliasTable) -> String {
    let collapsed = collapse(raw);
    aliases.resolve(&collapsed)
}

/// Whitespace-and-case canonical form without alias resolution.
fn collapse(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Token-sort similarity in [0, 1].
///
/// Sorting the whitespace-split tokens of both sides before scoring makes
/// word order irrelevant, so "Maris Otter" matches "Otter, Maris".
fn token_sort_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&token_sort(a), &token_sort(b))
}

fn token_sort(s: &str) -> String {
    let mut tokens: Vec<&str> = s
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Match `query` against `candidates`, highest confidence first.
///
/// Candidates are `(name, opaque id)` pairs. Candidates strictly below
/// `threshold` are dropped; an empty result is a normal value, not an
/// error. Ties break on the canonical token lexically, then on id, so the
/// ordering is deterministic. `limit` caps the result after filtering and
/// sorting.
pub fn match_names(
    query: &str,
    candidates: &[(String, String)],
    threshold: f64,
    limit: usize,
    aliases: &AliasTable,
) -> Vec<MatchCandidate> {
    let query_token = normalize(query, aliases);
    if query_token.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<MatchCandidate> = candidates
        .iter()
        .map(|(name, id)| {
            let token = normalize(name, aliases);
            let confidence = if token == query_token {
                1.0
            } else {
                token_sort_similarity(&query_token, &token)
            };
            MatchCandidate {
                id: id.clone(),
                name: name.clone(),
                token,
                confidence,
            }
        })
        .filter(|c| c.confidence >= threshold)
        .collect();

    scored.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.token.cmp(&b.token))
            .then_with(|| a.id.cmp(&b.id))
    });
    scored.truncate(limit);
    scored
}

/// The single best match above `threshold`, if any.
pub fn best_match(
    query: &str,
    candidates: &[(String, String)],
    threshold: f64,
    aliases: &AliasTable,
) -> Option<MatchCandidate> {
    match_names(query, candidates, threshold, 1, aliases)
        .into_iter()
        .next()
}

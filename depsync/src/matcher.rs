//! Fuzzy name matching.
//!
//! Scores are Ratcliff-Obershelp ratios over characters, the same measure
//! the similarity cutoff of 0.8 was tuned against. Matching is applied
//! twice by the reconciliation engine: over application short names and
//! over environment path strings.

use similar::TextDiff;

/// Minimum score for a candidate to qualify as a match.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Normalized similarity of two strings in `[0.0, 1.0]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    TextDiff::from_chars(a, b).ratio() as f64
}

/// The single highest-scoring pool entry with score >= `threshold`.
///
/// Deterministic: identical inputs always yield the same result. Ties are
/// broken by first-encountered order in the pool.
pub fn best_match<'a, I>(candidate: &str, pool: I, threshold: f64) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&str, f64)> = None;
    for entry in pool {
        let score = similarity(candidate, entry);
        if score < threshold {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((entry, score)),
        }
    }
    best.map(|(entry, _)| entry)
}

use crate::models::Suggestion;

/// Default similarity floor for name-search fallback suggestions.
pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 70.0;
/// Looser floor used when a director search finds no individual officers.
pub const DIRECTOR_FALLBACK_THRESHOLD: f64 = 60.0;
/// Maximum number of suggestions returned.
pub const SUGGESTION_LIMIT: usize = 5;

/// Composite weighted similarity ratio in [0, 100].
///
/// Combines edit-distance, token-order-tolerant, and prefix-weighted
/// measures, plus a substring bonus, so that "ACME LTD" still lands close to
/// "ACME LIMITED HOLDINGS" and word order does not tank the score.
pub fn weighted_ratio(query: &str, candidate: &str) -> f64 {
    let a = query.trim().to_uppercase();
    let b = candidate.trim().to_uppercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 100.0;
    }

    let full = strsim::normalized_levenshtein(&a, &b) * 100.0;

    // Token-sort: order-insensitive comparison.
    let mut ta: Vec<&str> = a.split_whitespace().collect();
    let mut tb: Vec<&str> = b.split_whitespace().collect();
    ta.sort_unstable();
    tb.sort_unstable();
    let token_sort = strsim::normalized_levenshtein(&ta.join(" "), &tb.join(" ")) * 100.0;

    // Jaro-Winkler is generous on short shared prefixes, so temper it.
    let jaro = strsim::jaro_winkler(&a, &b) * 100.0 * 0.9;

    let mut best = full.max(token_sort).max(jaro);

    // Substring tolerance: one name wholly contained in the other scores at
    // least 70, scaled toward 100 as the lengths converge.
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if long.contains(short.as_str()) {
        let contained = 70.0 + 30.0 * (short.len() as f64 / long.len() as f64);
        best = best.max(contained);
    }

    (best * 10.0).round() / 10.0
}

/// Rank near-matches of `query` within `candidates`.
///
/// Returns at most `limit` suggestions scoring at least `threshold`, ordered
/// by descending similarity. Duplicate names are deduplicated
/// case-insensitively, keeping the first occurrence; score ties keep
/// candidate order (the sort is stable). Callers invoke this only after a
/// primary exact/substring search came back empty; suggestions are a
/// fallback, never layered on top of real results.
pub fn suggest(
    query: &str,
    candidates: &[String],
    threshold: f64,
    limit: usize,
) -> Vec<Suggestion> {
    let mut scored: Vec<(usize, f64, &String)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, name)| (idx, weighted_ratio(query, name), name))
        .filter(|(_, score, _)| *score >= threshold)
        .collect();

    // Stable sort: equal scores retain first-occurrence order.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = std::collections::HashSet::new();
    let mut suggestions = Vec::new();
    for (_, score, name) in scored {
        if !seen.insert(name.to_uppercase()) {
            continue;
        }
        suggestions.push(Suggestion {
            name: name.clone(),
            similarity: score,
        });
        if suggestions.len() >= limit {
            break;
        }
    }
    suggestions
}

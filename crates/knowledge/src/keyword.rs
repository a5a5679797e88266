//! Keyword relevance scoring over passages.
//!
//! Scores a passage by how many distinct query terms it contains. Ties keep
//! corpus order, so the same query over the same corpus always returns the
//! same ranking.

use bariatric_core::knowledge::Passage;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "can", "what", "when", "how", "with", "after", "about", "should",
    "could", "would", "this", "that", "from", "have", "does", "you", "your", "much", "many",
    "any", "all", "was", "were", "will", "just", "into", "than", "then", "there", "their", "its",
    "also", "but", "not", "too", "very", "eat", "okay",
];

/// Lowercased, deduplicated content words of `text`, in order of appearance.
pub fn query_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(&w.as_str()))
    {
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}

/// Rank passages by the number of distinct query terms they contain.
///
/// Passages matching no term are excluded.
pub fn keyword_search<'a>(passages: &'a [Passage], query: &str, limit: usize) -> Vec<&'a Passage> {
    let terms = query_terms(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &Passage)> = passages
        .iter()
        .filter_map(|p| {
            let content = p.content.to_lowercase();
            let hits = terms.iter().filter(|t| content.contains(t.as_str())).count();
            (hits > 0).then_some((hits, p))
        })
        .collect();

    // sort_by is stable: equal scores keep corpus order
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.truncate(limit);
    scored.into_iter().map(|(_, p)| p).collect()
}

//! Local timeline filtering.
//!
//! Multi-term AND queries: '+' splits the query into terms that must all
//! match somewhere in an entry (body, author, hashtags). Matching is ASCII
//! case-insensitive.

use crate::store::timeline::TimelineEntry;

/// Split a raw query into lowercased terms. Empty terms are dropped, so
/// `"error++timeout"` and `"  error + timeout "` both yield two terms.
pub fn parse_terms(raw: &str) -> Vec<String> {
    raw.split('+')
        .map(|term| term.trim().to_ascii_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

fn haystack_contains(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle)
}

/// True iff every term matches the entry's body, author handle, author
/// display name, or one of its hashtags. An empty term list matches all.
pub fn entry_matches(entry: &TimelineEntry, terms: &[String]) -> bool {
    terms.iter().all(|term| {
        haystack_contains(&entry.post.body, term)
            || haystack_contains(&entry.post.author.handle, term)
            || haystack_contains(&entry.post.author.display_name, term)
            || entry.post.tags.iter().any(|tag| haystack_contains(tag, term))
    })
}

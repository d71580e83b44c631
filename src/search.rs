//! Local literal search over the document store.
//!
//! Case-insensitive substring matching with a snippet around the first hit
//! and a density-based relevance score. No index, no I/O: every query scans
//! the extracted text of each stored document.
//!
//! # Scoring
//!
//! ```text
//! relevance = min(round(occurrences / text_chars × 10000), 100)
//! ```
//!
//! Results are sorted by relevance descending; equal scores keep store order.

use crate::models::SearchResult;
use crate::store::DocumentStore;

/// Characters of context kept on each side of the first match.
pub const SNIPPET_RADIUS: usize = 100;

pub const HIGHLIGHT_START: &str = ">>>";
pub const HIGHLIGHT_END: &str = "<<<";
const ELLIPSIS: &str = "...";

/// Search every stored document for `query`.
///
/// An empty (or all-whitespace) query returns no results without scanning.
pub fn search(query: &str, store: &DocumentStore) -> Vec<SearchResult> {
    let needle: Vec<char> = fold(query.trim());
    if needle.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<SearchResult> = store
        .all_entries()
        .filter_map(|(id, text)| score_document(id, text, &needle))
        .collect();

    // Vec::sort_by is stable, so ties keep store order.
    results.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    results
}

fn score_document(id: &str, text: &str, needle: &[char]) -> Option<SearchResult> {
    let chars: Vec<char> = text.chars().collect();
    let folded = fold_chars(&chars);
    let hits = find_all(&folded, needle);
    let first = *hits.first()?;

    Some(SearchResult {
        document_id: id.to_string(),
        snippet: build_snippet(&chars, &folded, needle, first),
        relevance: relevance(hits.len(), chars.len()),
    })
}

/// Density score in `0..=100`.
pub fn relevance(occurrences: usize, text_len: usize) -> u32 {
    if text_len == 0 {
        return 0;
    }
    let density = occurrences as f64 / text_len as f64;
    ((density * 10_000.0).round() as u32).min(100)
}

fn build_snippet(chars: &[char], folded: &[char], needle: &[char], first: usize) -> String {
    let start = first.saturating_sub(SNIPPET_RADIUS);
    let end = (first + needle.len() + SNIPPET_RADIUS).min(chars.len());

    let mut out = String::new();
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(&highlight(&chars[start..end], &folded[start..end], needle));
    if end < chars.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Wrap every occurrence of `needle` in `window` with highlight markers.
fn highlight(window: &[char], folded: &[char], needle: &[char]) -> String {
    let mut out = String::with_capacity(window.len() + 16);
    let mut cursor = 0;
    for hit in find_all(folded, needle) {
        out.extend(&window[cursor..hit]);
        out.push_str(HIGHLIGHT_START);
        out.extend(&window[hit..hit + needle.len()]);
        out.push_str(HIGHLIGHT_END);
        cursor = hit + needle.len();
    }
    out.extend(&window[cursor..]);
    out
}

/// Start offsets of non-overlapping occurrences, left to right.
fn find_all(haystack: &[char], needle: &[char]) -> Vec<usize> {
    let mut hits = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return hits;
    }
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if haystack[i..i + needle.len()] == *needle {
            hits.push(i);
            i += needle.len();
        } else {
            i += 1;
        }
    }
    hits
}

// One char in, one char out, so offsets in folded text match the original.
fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn fold(s: &str) -> Vec<char> {
    s.chars().map(fold_char).collect()
}

fn fold_chars(chars: &[char]) -> Vec<char> {
    chars.iter().copied().map(fold_char).collect()
}

/// Print ranked results for the `docchat search` command.
pub fn run_search(query: &str, store: &DocumentStore, limit: Option<usize>) {
    if query.trim().is_empty() {
        println!("No results.");
        return;
    }
    let mut results = search(query, store);
    if let Some(limit) = limit {
        results.truncate(limit);
    }
    print_results(query, &results);
}

/// Numbered listing with relevance and a one-line excerpt.
pub fn print_results(query: &str, results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results found for \"{}\".", query.trim());
        return;
    }
    for (i, result) in results.iter().enumerate() {
        println!("{}. [{}%] {}", i + 1, result.relevance, result.document_id);
        println!("    excerpt: \"{}\"", result.snippet.replace('\n', " ").trim());
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(docs: &[(&str, &str)]) -> DocumentStore {
        let mut store = DocumentStore::new();
        for (id, text) in docs {
            store.put(*id, *text).unwrap();
        }
        store
    }

    #[test]
    fn empty_query_returns_nothing() {
        let store = store_with(&[("a.txt", "anything at all")]);
        assert!(search("", &store).is_empty());
        assert!(search("   ", &store).is_empty());
    }

    #[test]
    fn only_matching_document_is_returned() {
        let store = store_with(&[
            ("a.txt", "The quarterly revenue grew by 12%."),
            ("b.txt", "Deployment notes for Kubernetes."),
            ("c.txt", "Meeting minutes and action items."),
        ]);
        let results = search("revenue", &store);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "a.txt");
        assert!(results[0].relevance > 0);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let store = store_with(&[("a.txt", "Rust and RUST and rust")]);
        let results = search("RuSt", &store);
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].snippet,
            ">>>Rust<<< and >>>RUST<<< and >>>rust<<<"
        );
    }

    #[test]
    fn more_occurrences_never_score_lower() {
        let a = format!("cat cat {}", "x".repeat(992));
        let b = format!("cat {}", "x".repeat(996));
        assert_eq!(a.len(), b.len());
        let store = store_with(&[("b.txt", b.as_str()), ("a.txt", a.as_str())]);
        let results = search("cat", &store);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_id, "a.txt");
        assert_eq!(results[0].relevance, 20);
        assert_eq!(results[1].relevance, 10);
    }

    #[test]
    fn ties_keep_store_order() {
        let store = store_with(&[("first.txt", "needle"), ("second.txt", "needle")]);
        let ids: Vec<_> = search("needle", &store)
            .into_iter()
            .map(|r| r.document_id)
            .collect();
        assert_eq!(ids, vec!["first.txt", "second.txt"]);
    }

    #[test]
    fn relevance_is_capped_at_100() {
        assert_eq!(relevance(1, 3), 100);
        assert_eq!(relevance(1, 10_000), 1);
        assert_eq!(relevance(0, 50), 0);
        assert_eq!(relevance(0, 0), 0);
    }

    #[test]
    fn snippet_is_clipped_around_first_match() {
        let text = format!("{}needle{}", "a".repeat(150), "b".repeat(150));
        let store = store_with(&[("long.txt", text.as_str())]);
        let results = search("needle", &store);
        let expected = format!(
            "...{}>>>needle<<<{}...",
            "a".repeat(SNIPPET_RADIUS),
            "b".repeat(SNIPPET_RADIUS)
        );
        assert_eq!(results[0].snippet, expected);
    }

    #[test]
    fn snippet_at_text_bounds_has_no_ellipsis() {
        let store = store_with(&[("s.txt", "needle in a short text")]);
        let results = search("needle", &store);
        assert_eq!(results[0].snippet, ">>>needle<<< in a short text");
    }

    #[test]
    fn query_is_literal_not_a_pattern() {
        let store = store_with(&[("r.txt", "costs (approx.) $5.00 total")]);
        let results = search("$5.00", &store);
        assert_eq!(results.len(), 1);
        assert!(search("c.sts", &store).is_empty());
    }

    #[test]
    fn summaries_are_not_searched() {
        let mut store = store_with(&[("a.txt", "plain content")]);
        store.put_summary("a.txt", "mentions zebra");
        assert!(search("zebra", &store).is_empty());
    }

    #[test]
    fn multibyte_text_keeps_char_offsets() {
        let store = store_with(&[("u.txt", "Café ÉCLAIR and éclair")]);
        let results = search("éclair", &store);
        assert_eq!(results[0].snippet, "Café >>>ÉCLAIR<<< and >>>éclair<<<");
    }
}

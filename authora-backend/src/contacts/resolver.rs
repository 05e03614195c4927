//! Entity Resolver
//!
//! Two-pass name matching against the contact directory. A case-insensitive
//! exact hit always wins; otherwise names containing the query are collected.
//! A single containing name counts as an exact resolution, several are returned
//! for the user to pick from, in directory order.

use super::ContactBook;

/// Number of leading query characters used for "did you mean" suggestions
const SUGGESTION_PREFIX_CHARS: usize = 3;
const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Unambiguous stored name
    Exact(String),
    /// Several stored names contain the query
    Ambiguous(Vec<String>),
    NotFound,
}

pub fn resolve(query: &str, book: &ContactBook) -> Resolution {
    let normalized = query.trim().to_lowercase();
    if normalized.is_empty() {
        return Resolution::NotFound;
    }

    if let Some(key) = book.find_key(&normalized) {
        return Resolution::Exact(key.to_string());
    }

    let mut candidates: Vec<String> = book
        .names()
        .filter(|name| name.to_lowercase().contains(&normalized))
        .map(String::from)
        .collect();

    match candidates.len() {
        0 => Resolution::NotFound,
        1 => Resolution::Exact(candidates.remove(0)),
        _ => Resolution::Ambiguous(candidates),
    }
}

/// Contacts sharing the first few characters of an unresolved query.
// Loose heuristic, not a stable contract.
pub fn suggest(query: &str, book: &ContactBook) -> Vec<String> {
    let prefix: String = query
        .trim()
        .to_lowercase()
        .chars()
        .take(SUGGESTION_PREFIX_CHARS)
        .collect();
    if prefix.is_empty() {
        return Vec::new();
    }

    book.names()
        .filter(|name| name.to_lowercase().contains(&prefix))
        .take(MAX_SUGGESTIONS)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(names: &[&str]) -> ContactBook {
        names.iter().map(|n| (*n, "0x0")).collect()
    }

    #[test]
    fn test_partial_first_name_resolves() {
        let contacts = book(&["Ritika Edge"]);
        assert_eq!(resolve("ritika", &contacts), Resolution::Exact("Ritika Edge".into()));
    }

    #[test]
    fn test_partial_last_name_resolves() {
        let contacts = book(&["Ritika Edge"]);
        assert_eq!(resolve("edge", &contacts), Resolution::Exact("Ritika Edge".into()));
    }

    #[test]
    fn test_no_match() {
        let contacts = book(&["Ritika Edge"]);
        assert_eq!(resolve("xyz", &contacts), Resolution::NotFound);
    }

    #[test]
    fn test_ambiguous_keeps_directory_order() {
        let contacts = book(&["Sam B", "Farzi", "Sam A"]);
        assert_eq!(
            resolve("sam", &contacts),
            Resolution::Ambiguous(vec!["Sam B".into(), "Sam A".into()])
        );
    }

    #[test]
    fn test_exact_match_beats_substring() {
        let contacts = book(&["Sam", "Samay"]);
        assert_eq!(resolve("  SAM ", &contacts), Resolution::Exact("Sam".into()));
    }

    #[test]
    fn test_blank_query_is_not_found() {
        let contacts = book(&["Sam"]);
        assert_eq!(resolve("   ", &contacts), Resolution::NotFound);
    }

    #[test]
    fn test_suggestions_use_three_char_prefix() {
        let contacts = book(&["Farzi", "Farhan", "Faraz", "Farah", "Bob"]);
        assert_eq!(suggest("Farooq", &contacts), vec!["Farzi", "Farhan", "Faraz"]);
        assert!(suggest("zzz", &contacts).is_empty());
    }
}

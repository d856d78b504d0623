//! Keyword extraction for textual matching.

use std::collections::HashSet;

/// Words ignored when extracting keywords from a question.
const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "and", "or", "but", "in", "with", "to", "for",
    "of", "as", "by", "are", "was", "were", "this", "that", "from", "it", "its", "be", "can",
    "what", "does", "you", "your",
];

/// Lowercase `text` and collapse every run of non-alphanumeric characters
/// into a single space.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract up to `max` distinct keywords from `text`, in order of first
/// appearance. Stop words and words of two characters or fewer are dropped.
pub fn extract_keywords(text: &str, max: usize) -> Vec<String> {
    let normalized = normalize(text);
    let mut seen = HashSet::new();

    normalized
        .split(' ')
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .filter(|w| seen.insert(w.to_string()))
        .take(max)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Pandas merge(): two DataFrames!"), "pandas merge two dataframes");
        assert_eq!(normalize("  ...  "), "");
    }

    #[test]
    fn test_extract_keywords_drops_stop_and_short_words() {
        let keywords = extract_keywords("how do I merge two dataframes", 5);
        assert_eq!(keywords, vec!["how", "merge", "two", "dataframes"]);
    }

    #[test]
    fn test_extract_keywords_dedupes_and_limits() {
        let keywords = extract_keywords("docker docker podman compose build image push", 3);
        assert_eq!(keywords, vec!["docker", "podman", "compose"]);
    }

    #[test]
    fn test_extract_keywords_empty() {
        assert!(extract_keywords("is a to", 5).is_empty());
    }
}

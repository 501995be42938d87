//! URL handling module for Gleaner
//!
//! This module provides URL normalization, domain matching and the ordered,
//! deduplicating URL set used to build each source's frontier.

mod domain;
mod normalize;

use std::collections::HashSet;

// Re-export main functions
pub use domain::{extract_domain, matches_wildcard, url_in_domains};
pub use normalize::{dedup_key, normalize_url, strip_query};

/// Insertion-ordered set of URLs, deduplicated by [`dedup_key`]
///
/// The first spelling of a URL is the one kept.
#[derive(Debug, Clone, Default)]
pub struct UrlSet {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl UrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL; returns false if an equivalent URL was already present
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.insert(dedup_key(&url)) {
            self.urls.push(url);
            true
        } else {
            false
        }
    }

    /// Adds every URL from the iterator, returning how many were new
    pub fn extend<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for url in urls {
            if self.insert(url) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(&dedup_key(url))
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.urls.iter()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

impl<S: Into<String>> FromIterator<S> for UrlSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = UrlSet::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_dedups_equivalent_urls() {
        let mut set = UrlSet::new();
        assert!(set.insert("https://example.com/story/1"));
        assert!(!set.insert("https://EXAMPLE.com/story/1/"));
        assert!(!set.insert("https://example.com/story/1#comments"));
        assert!(set.insert("https://example.com/story/1?page=2"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_keeps_first_spelling_and_order() {
        let set: UrlSet = vec![
            "https://example.com/B",
            "https://example.com/a",
            "https://example.com/b",
        ]
        .into_iter()
        .collect();

        assert_eq!(
            set.into_vec(),
            vec![
                "https://example.com/B".to_string(),
                "https://example.com/a".to_string()
            ]
        );
    }

    #[test]
    fn test_extend_counts_new() {
        let mut set = UrlSet::new();
        set.insert("https://example.com/1");
        let added = set.extend(vec!["https://example.com/1", "https://example.com/2"]);
        assert_eq!(added, 1);
        assert!(set.contains("https://example.com/2/"));
        assert!(!set.is_empty());
    }
}

//! Stable per-article identifiers

use regex::Regex;

/// URLs shorter than this cannot plausibly carry an article ID
pub const MIN_ID_URL_LEN: usize = 12;

/// URL regex with the capture group holding the article ID
#[derive(Debug, Clone)]
pub struct IdPattern {
    pub regex: Regex,
    pub group: usize,
}

impl IdPattern {
    pub fn new(pattern: &str, group: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            group,
        })
    }
}

/// Derives the article ID for a URL
///
/// The first pattern whose capture group matches wins. Short URLs and URLs
/// matching no pattern fall back to the CRC-32 of the URL bytes. A checksum
/// of 0 is the sentinel for "no usable ID" and yields `None`.
pub fn extract_unique_id(url: &str, patterns: &[IdPattern]) -> Option<String> {
    if url.len() >= MIN_ID_URL_LEN {
        let matched = patterns.iter().find_map(|pattern| {
            pattern
                .regex
                .captures(url)
                .and_then(|captures| captures.get(pattern.group))
                .map(|m| m.as_str().to_string())
                .filter(|id| !id.is_empty())
        });
        if matched.is_some() {
            return matched;
        }
    }

    match crc32fast::hash(url.as_bytes()) {
        0 => None,
        checksum => Some(checksum.to_string()),
    }
}

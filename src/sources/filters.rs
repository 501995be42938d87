//! Candidate URL filter pipeline
//!
//! Three stages run in order:
//! 1. Allow-list: keep URLs containing at least one valid pattern (skipped
//!    when none are configured)
//! 2. Deny-list: drop URLs containing any invalid pattern
//! 3. Non-content: drop index pages and URLs carrying a non-content marker
//!
//! Every stage is a pure predicate over a single URL, so the cascade is
//! idempotent.

use crate::sources::SourceProfile;

/// True when no allow-list is configured or `url` matches one of its patterns
pub fn passes_allow_list(url: &str, valid_patterns: &[String]) -> bool {
    valid_patterns.is_empty() || valid_patterns.iter().any(|p| url.contains(p.as_str()))
}

/// True when `url` matches none of the invalid patterns
pub fn passes_deny_list(url: &str, invalid_patterns: &[String]) -> bool {
    !invalid_patterns.iter().any(|p| url.contains(p.as_str()))
}

/// Applies the full cascade, preserving input order
pub fn apply_filters(urls: Vec<String>, profile: &SourceProfile) -> Vec<String> {
    let before = urls.len();
    let kept: Vec<String> = urls
        .into_iter()
        .filter(|url| passes_allow_list(url, &profile.valid_patterns))
        .filter(|url| passes_deny_list(url, &profile.invalid_patterns))
        .filter(|url| !profile.is_non_content(url))
        .collect();

    tracing::debug!(
        source = profile.name.as_str(),
        "Filters kept {} of {} URLs",
        kept.len(),
        before
    );
    kept
}

use url::Url;

/// Extracts the lowercase host from a URL string
///
/// Returns `None` when the string doesn't parse or has no host.
///
/// # Examples
///
/// ```
/// use gleaner::url::extract_domain;
///
/// assert_eq!(
///     extract_domain("https://News.Example.com:8080/story"),
///     Some("news.example.com".to_string())
/// );
/// assert_eq!(extract_domain("mailto:desk@example.com"), None);
/// ```
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
}

/// Checks if a domain matches a wildcard pattern
///
/// "example.com" matches only itself; "*.example.com" matches the bare
/// domain and any subdomain of it.
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Checks whether a URL's host falls inside a list of domain patterns
///
/// An empty pattern list places no restriction on the URL.
pub fn url_in_domains(url: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }

    match extract_domain(url) {
        Some(domain) => patterns
            .iter()
            .any(|pattern| matches_wildcard(&pattern.to_lowercase(), &domain)),
        None => false,
    }
}

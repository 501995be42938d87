use crate::UrlError;
use url::Url;

/// Normalizes a URL for comparison within a crawl
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host
/// 3. Normalize path:
///    - Remove dot segments (. and ..) and repeated slashes
///    - Remove trailing slash (except for root /)
/// 4. Remove fragment (everything after #)
///
/// The query string is kept as-is: many news sites address articles by
/// query parameter, so two URLs differing only in their query are distinct.
///
/// # Examples
///
/// ```
/// use gleaner::url::normalize_url;
///
/// let url = normalize_url("https://NEWS.EXAMPLE.COM/world/story/?id=7#top").unwrap();
/// assert_eq!(url.as_str(), "https://news.example.com/world/story?id=7");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);
    url.set_fragment(None);

    Ok(url)
}

/// Key two URLs share when they refer to the same page
///
/// The normalized URL, lowercased in full. Strings that don't parse as
/// HTTP(S) URLs fall back to their trimmed lowercase form so they still
/// deduplicate against themselves.
pub fn dedup_key(url_str: &str) -> String {
    match normalize_url(url_str) {
        Ok(url) => url.as_str().to_lowercase(),
        Err(_) => url_str.trim().to_lowercase(),
    }
}

/// Returns the URL with its query string and fragment removed
pub fn strip_query(url_str: &str) -> &str {
    let end = url_str.find(['?', '#']).unwrap_or(url_str.len());
    &url_str[..end]
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

//! Hyperlink extraction
//!
//! The crawl engine only needs one thing from an HTML document during
//! discovery: its outbound links, resolved against the page URL.

use crate::url::UrlSet;
use scraper::{Html, Selector};
use url::Url;

/// Extracts outbound links from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` and `<area href="...">` anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links (same-page anchors)
/// - Anything that doesn't resolve to an HTTP(S) URL
///
/// Links are returned once each, in document order, without fragments.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - URL of the page, used to resolve relative links
///
/// # Example
///
/// ```
/// use gleaner::crawler::extract_links;
///
/// let html = r#"<a href="/world/1">One</a><a href="mailto:desk@example.com">Mail</a>"#;
/// let links = extract_links(html, "https://news.example.com/");
/// assert_eq!(links, vec!["https://news.example.com/world/1".to_string()]);
/// ```
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let base = match Url::parse(base_url) {
        Ok(base) => base,
        Err(e) => {
            tracing::debug!("Cannot resolve links against {}: {}", base_url, e);
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    let mut links = UrlSet::new();

    if let Ok(selector) = Selector::parse("a[href], area[href]") {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(absolute) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, &base))
            {
                links.insert(absolute);
            }
        }
    }

    links.into_vec()
}

/// Extracts the trimmed text of the `<title>` element
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolves a link href to an absolute HTTP(S) URL without a fragment
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);

    Some(absolute.to_string())
}

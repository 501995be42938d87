//! Default article extraction
//!
//! Generic metadata and body extraction used by every source unless its
//! plugin overrides the corresponding trait method.

use crate::sources::ExtractedArticle;
use chrono::DateTime;
use scraper::{ElementRef, Html, Selector};

/// Authors longer than this are assumed to be scraped page furniture
const MAX_AUTHOR_LEN: usize = 100;

fn select_attr(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn select_text(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in values.iter().flat_map(|v| v.split(',')) {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

/// Extracts title, body, authors, keywords, sections and publish date
///
/// Returns `None` when the document has no body text at all.
pub fn extract_article(html: &str) -> Option<ExtractedArticle> {
    let document = Html::parse_document(html);

    let text = body_text(&document);
    if text.is_empty() {
        return None;
    }

    let title = select_attr(&document, r#"meta[property="og:title"]"#, "content")
        .into_iter()
        .chain(select_text(&document, "title"))
        .chain(select_text(&document, "h1"))
        .next();

    let publish_date = select_attr(
        &document,
        r#"meta[property="article:published_time"]"#,
        "content",
    )
    .iter()
    .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok());

    Some(ExtractedArticle {
        title,
        text,
        authors: authors_from(&document),
        keywords: split_list(select_attr(&document, r#"meta[name="keywords"]"#, "content")),
        industries: split_list(select_attr(
            &document,
            r#"meta[property="article:section"]"#,
            "content",
        )),
        publish_date,
    })
}

fn body_text(document: &Html) -> String {
    let paragraphs = select_text(document, "article p");
    let paragraphs = if paragraphs.is_empty() {
        select_text(document, "p")
    } else {
        paragraphs
    };
    paragraphs.join("\n\n")
}

fn authors_from(document: &Html) -> Vec<String> {
    let mut authors = select_attr(document, r#"meta[name="author"]"#, "content");
    authors.extend(select_text(document, r#"[rel="author"]"#));
    split_list(authors)
}

/// Author names taken from `<meta name="author">` and `rel="author"` elements
pub fn extract_authors(html: &str) -> Vec<String> {
    authors_from(&Html::parse_document(html))
}

/// Categories from `article:section` metadata
pub fn extract_industries(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    split_list(select_attr(
        &document,
        r#"meta[property="article:section"]"#,
        "content",
    ))
}

/// Paragraph text of the whole document, ignoring `<article>` structure
pub fn extract_body_fallback(html: &str) -> Option<String> {
    let text = select_text(&Html::parse_document(html), "p").join("\n\n");
    (!text.is_empty()).then_some(text)
}

/// True when an author string still carries markup or script residue
pub fn looks_malformed(author: &str) -> bool {
    author.contains(['<', '>', '{', '}']) || author.chars().count() > MAX_AUTHOR_LEN
}

/// Normalizes whitespace: runs of spaces collapse, paragraphs stay separated by a blank line
pub fn clean_text(text: &str) -> String {
    text.split("\n\n")
        .map(|paragraph| paragraph.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

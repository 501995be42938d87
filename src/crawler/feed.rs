//! RSS and Atom item-link extraction

use quick_xml::de::from_str;
use quick_xml::DeError;
use serde::Deserialize;

/// Union of the three feed layouts; whichever fields the document has are filled
#[derive(Debug, Default, Deserialize)]
struct FeedDocument {
    /// RSS 2.0
    channel: Option<Channel>,

    /// RSS 1.0 (RDF) keeps its items beside the channel
    #[serde(default, rename = "item")]
    items: Vec<RssItem>,

    /// Atom
    #[serde(default, rename = "entry")]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default, rename = "item")]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default, rename = "link")]
    links: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Extracts the article link of every item in an RSS or Atom document
///
/// Atom entries contribute their `alternate` link (or a link without `rel`).
/// Items without a link are skipped.
pub fn parse_feed_links(xml: &str) -> Result<Vec<String>, DeError> {
    let document: FeedDocument = from_str(xml)?;

    let rss_items = document
        .channel
        .map(|channel| channel.items)
        .unwrap_or_default()
        .into_iter()
        .chain(document.items)
        .filter_map(|item| item.link);

    let atom_items = document.entries.into_iter().filter_map(|entry| {
        entry
            .links
            .into_iter()
            .find(|link| matches!(link.rel.as_deref(), None | Some("alternate")))
            .and_then(|link| link.href)
    });

    Ok(rss_items
        .chain(atom_items)
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
        .collect())
}

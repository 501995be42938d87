//! Built-in source plugins

use crate::sources::{ExtractedArticle, SourcePlugin, SourceProfile};
use async_trait::async_trait;

/// Ordinary news site: every behavior is the generic default
pub struct GenericNewsSource {
    profile: SourceProfile,
}

impl GenericNewsSource {
    pub fn new(profile: SourceProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl SourcePlugin for GenericNewsSource {
    fn profile(&self) -> &SourceProfile {
        &self.profile
    }
}

/// Reads feeds and hands their item links to the sources that own them
///
/// An aggregator never fetches articles itself, so extraction always
/// yields nothing.
pub struct FeedAggregator {
    profile: SourceProfile,
}

impl FeedAggregator {
    pub fn new(profile: SourceProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl SourcePlugin for FeedAggregator {
    fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    fn extract_article(&self, _url: &str, _html: &str) -> Option<ExtractedArticle> {
        None
    }

    fn extract_body_fallback(&self, _html: &str) -> Option<String> {
        None
    }
}

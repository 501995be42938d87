//! Source registry
//!
//! Maps configured `[[source]]` sections to plugin instances by plugin name,
//! and tracks each source's lifecycle state for the queue manager.

use crate::config::Config;
use crate::crawler::NetworkFetcher;
use crate::sources::{
    CrawlEngine, DuplicateSweeper, FeedAggregator, GenericNewsSource, SourcePlugin, SourceProfile,
};
use crate::state::{SourceKind, SourceState};
use crate::url::url_in_domains;
use crate::{ConfigError, GleanError};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type PluginConstructor = fn(SourceProfile) -> Arc<dyn SourcePlugin>;

const FETCHING_KINDS: &[SourceKind] = &[SourceKind::Content, SourceKind::Api, SourceKind::Data];
const AGGREGATOR_KINDS: &[SourceKind] = &[SourceKind::Aggregator];
const PROCESSOR_KINDS: &[SourceKind] = &[SourceKind::DataProcessor];

fn generic_news(profile: SourceProfile) -> Arc<dyn SourcePlugin> {
    Arc::new(GenericNewsSource::new(profile))
}

fn feed_aggregator(profile: SourceProfile) -> Arc<dyn SourcePlugin> {
    Arc::new(FeedAggregator::new(profile))
}

fn duplicate_sweeper(profile: SourceProfile) -> Arc<dyn SourcePlugin> {
    Arc::new(DuplicateSweeper::new(profile))
}

/// Looks up a built-in plugin: the kinds it supports and its constructor
fn builtin_plugin(name: &str) -> Option<(&'static [SourceKind], PluginConstructor)> {
    match name {
        "generic-news" => Some((FETCHING_KINDS, generic_news as PluginConstructor)),
        "feed-aggregator" => Some((AGGREGATOR_KINDS, feed_aggregator as PluginConstructor)),
        "duplicate-sweeper" => Some((PROCESSOR_KINDS, duplicate_sweeper as PluginConstructor)),
        _ => None,
    }
}

/// Name, capability and lifecycle state of one source
#[derive(Debug)]
pub struct SourceDescriptor {
    pub name: String,
    pub kind: SourceKind,
    state: RwLock<SourceState>,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            state: RwLock::new(SourceState::default()),
        }
    }

    pub fn state(&self) -> SourceState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the source to `next` if the lifecycle allows it
    pub fn transition(&self, next: SourceState) -> crate::Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.can_transition_to(next) {
            return Err(GleanError::InvalidTransition {
                source_name: self.name.clone(),
                from: *state,
                to: next,
            });
        }

        if *state != next {
            tracing::debug!(source = self.name.as_str(), "{} -> {}", *state, next);
        }
        *state = next;
        Ok(())
    }
}

/// A registered source: its descriptor and the engine driving its plugin
pub struct Source {
    pub descriptor: SourceDescriptor,
    pub engine: CrawlEngine,
}

impl Source {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn kind(&self) -> SourceKind {
        self.descriptor.kind
    }
}

/// All sources of a run, in configuration order
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<Source>>,
    index: HashMap<String, usize>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates the plugin named by every `[[source]]` section
    ///
    /// # Errors
    ///
    /// * `ConfigError::UnknownPlugin` - No plugin is registered under the name
    /// * `ConfigError::Validation` - The plugin cannot drive a source of that kind
    /// * `ConfigError::InvalidPattern` - A pattern list failed to compile
    pub fn from_config(config: &Config, fetcher: Arc<NetworkFetcher>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();

        for source in &config.sources {
            let (kinds, construct) =
                builtin_plugin(&source.plugin).ok_or_else(|| ConfigError::UnknownPlugin {
                    source_name: source.name.clone(),
                    plugin: source.plugin.clone(),
                })?;

            if !kinds.contains(&source.kind) {
                return Err(ConfigError::Validation(format!(
                    "source '{}': plugin '{}' does not support kind '{}'",
                    source.name, source.plugin, source.kind
                )));
            }

            let profile = SourceProfile::from_config(source, config.crawler.recursion_level)?;
            registry.register(construct(profile), fetcher.clone())?;
        }

        tracing::info!("Registered {} sources", registry.len());
        Ok(registry)
    }

    /// Adds a plugin instance; source names must be unique
    pub fn register(
        &mut self,
        plugin: Arc<dyn SourcePlugin>,
        fetcher: Arc<NetworkFetcher>,
    ) -> Result<(), ConfigError> {
        let name = plugin.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ConfigError::Validation(format!(
                "Duplicate source name: {}",
                name
            )));
        }

        let descriptor = SourceDescriptor::new(name.clone(), plugin.kind());
        let engine = CrawlEngine::new(plugin, fetcher);
        self.index.insert(name, self.sources.len());
        self.sources.push(Arc::new(Source { descriptor, engine }));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Source>> {
        self.index.get(name).map(|&i| &self.sources[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Source>> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Content-fetching source owning the URL's domain
    ///
    /// Sources without an allowed-domain list never claim routed URLs. The
    /// first matching source in configuration order wins.
    pub fn route(&self, url: &str) -> Option<&Arc<Source>> {
        self.sources.iter().find(|source| {
            let profile = source.engine.profile();
            source.kind().fetches_content()
                && !profile.allowed_domains.is_empty()
                && url_in_domains(url, &profile.allowed_domains)
        })
    }

    /// Current state of every source, in configuration order
    pub fn status_report(&self) -> Vec<(String, SourceKind, SourceState)> {
        self.sources
            .iter()
            .map(|s| (s.name().to_string(), s.kind(), s.descriptor.state()))
            .collect()
    }
}

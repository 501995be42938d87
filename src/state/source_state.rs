/// Source lifecycle definitions
///
/// Every configured source moves through the same small state machine while a
/// crawl runs; the kind decides which phases it takes part in.
use serde::Deserialize;
use std::fmt;

/// Capability of a configured source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// A site whose article pages are discovered and fetched
    #[default]
    Content,

    /// Only supplies URLs for other sources, never fetches content itself
    Aggregator,

    /// Content reached through a remote API
    Api,

    /// Structured data downloads
    Data,

    /// Runs a batch job over fetched data after retrieval
    DataProcessor,
}

impl SourceKind {
    /// Returns true if the source takes part in the discovery phase
    pub fn is_discoverable(&self) -> bool {
        !matches!(self, Self::DataProcessor)
    }

    /// Returns true if the source fetches the URLs it discovers
    pub fn fetches_content(&self) -> bool {
        matches!(self, Self::Content | Self::Api | Self::Data)
    }

    /// Returns true if the source takes part in the processing phase
    pub fn is_processor(&self) -> bool {
        matches!(self, Self::DataProcessor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Aggregator => "aggregator",
            Self::Api => "api",
            Self::Data => "data",
            Self::DataProcessor => "data-processor",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents where a source is in the crawl cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceState {
    /// Building the list of candidate URLs for the run date
    DiscoveringUrls,

    /// Fetching and extracting articles from the discovered URLs
    FetchingContent,

    /// Running the batch-processing entry point
    ProcessingData,

    /// Idle: not yet started, or finished for this run
    #[default]
    Stopped,
}

impl SourceState {
    /// Returns true if the source is doing work in the current phase
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Stopped)
    }

    /// Checks whether moving from this state to `next` is a legal transition
    ///
    /// Re-entering the current state is always allowed since several workers
    /// may start tasks for the same source during retrieval.
    pub fn can_transition_to(&self, next: SourceState) -> bool {
        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (Self::Stopped, Self::DiscoveringUrls)
                | (Self::Stopped, Self::FetchingContent)
                | (Self::Stopped, Self::ProcessingData)
                | (Self::DiscoveringUrls, Self::FetchingContent)
                | (Self::DiscoveringUrls, Self::Stopped)
                | (Self::FetchingContent, Self::ProcessingData)
                | (Self::FetchingContent, Self::Stopped)
                | (Self::ProcessingData, Self::Stopped)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiscoveringUrls => "discovering_urls",
            Self::FetchingContent => "fetching_content",
            Self::ProcessingData => "processing_data",
            Self::Stopped => "stopped",
        }
    }

    /// Returns all possible source states
    pub fn all_states() -> [Self; 4] {
        [
            Self::DiscoveringUrls,
            Self::FetchingContent,
            Self::ProcessingData,
            Self::Stopped,
        ]
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

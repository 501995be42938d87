//! Result record of one content-fetch attempt

use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::path::PathBuf;

/// Why a fetch attempt ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    /// Article extracted and written to disk
    Saved,
    /// URL is an index or listing page
    NonContentUrl,
    /// Download was smaller than the minimum page size
    NoContent,
    /// Extracted text was not longer than the source's minimum
    TooShort,
    /// No usable publish date in the extraction or the raw document
    NoPublishDate,
    /// No identifier could be derived from the URL
    NoUniqueId,
    /// Every attempt failed or retries were abandoned
    NetworkFailure,
    /// The article extractor produced nothing
    ExtractionFailed,
    /// The article record could not be written
    SaveFailed,
}

impl FetchStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::NonContentUrl => "non_content_url",
            Self::NoContent => "no_content",
            Self::TooShort => "too_short",
            Self::NoPublishDate => "no_publish_date",
            Self::NoUniqueId => "no_unique_id",
            Self::NetworkFailure => "network_failure",
            Self::ExtractionFailed => "extraction_failed",
            Self::SaveFailed => "save_failed",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Produced by a source's fetch step and consumed by the queue manager
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub url: String,
    pub source: String,
    pub raw_size: usize,
    pub text_size: usize,
    pub publish_date: Option<DateTime<FixedOffset>>,
    pub article_id: Option<String>,
    pub additional_links: Vec<String>,
    pub status: FetchStatus,
    pub saved_path: Option<PathBuf>,
}

impl FetchOutcome {
    /// An empty outcome that ended with `status`
    pub fn unsuccessful(url: &str, source: &str, status: FetchStatus) -> Self {
        Self {
            url: url.to_string(),
            source: source.to_string(),
            raw_size: 0,
            text_size: 0,
            publish_date: None,
            article_id: None,
            additional_links: Vec::new(),
            status,
            saved_path: None,
        }
    }

    pub fn success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_saved_is_success() {
        assert!(FetchStatus::Saved.is_success());
        assert!(!FetchStatus::TooShort.is_success());
        assert!(!FetchStatus::NoUniqueId.is_success());

        let outcome =
            FetchOutcome::unsuccessful("https://a.example/x", "wire", FetchStatus::NoContent);
        assert!(!outcome.success());
        assert_eq!(outcome.raw_size, 0);
        assert!(outcome.saved_path.is_none());
    }
}

//! State module for tracking source lifecycles
//!
//! # Components
//!
//! - `SourceKind`: The capability of a configured source (content, aggregator, processor, ...)
//! - `SourceState`: Where a source currently is in the discovery/retrieval/processing cycle

mod source_state;

// Re-export main types
pub use source_state::{SourceKind, SourceState};

//! Crawler module for phase scheduling and page fetching
//!
//! This module contains the core crawling machinery, including:
//! - HTTP fetching with retry, backoff and user-agent rotation
//! - HTML link extraction and RSS/Atom feed parsing
//! - Task definitions and round-robin partitioning
//! - Phase workers and the queue manager that orchestrates them

mod coordinator;
mod feed;
mod fetcher;
mod parser;
mod scheduler;
mod worker;

pub use coordinator::{QueueManager, RunSummary};
pub use feed::parse_feed_links;
pub use fetcher::{
    build_http_client, decode_body, FetchError, FetchedPage, HttpResponseData, NetworkFetcher,
};
pub use parser::{extract_links, page_title};
pub use scheduler::{partition_round_robin, Task, TaskKind, TaskPayload, TaskQueue};
pub use worker::{Worker, WorkerReport};

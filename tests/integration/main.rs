//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! fetcher, the crawl engine and full three-phase runs end-to-end.

mod common;
mod crawl_tests;
mod engine_tests;
mod fetcher_tests;

//! Shared fixtures for the integration tests

use chrono::NaiveDate;
use gleaner::config::{
    Config, CrawlerConfig, HistoryConfig, NetworkConfig, OutputConfig, SourceConfig,
};
use gleaner::state::SourceKind;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Network settings with no throttling pause
pub fn network_config(retry_count: u32) -> NetworkConfig {
    NetworkConfig {
        retry_count,
        retry_wait: 0.0,
        min_jitter: 0.0,
        max_jitter: 0.0,
        connect_timeout: 2.0,
        read_timeout: 2.0,
        user_agents: "ua-one|ua-two".to_string(),
        proxies: Vec::new(),
    }
}

pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date")
}

/// A content source crawling `main_url` and keeping only `/story/` links
pub fn content_source(name: &str, main_url: String) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        kind: SourceKind::Content,
        main_url: Some(main_url),
        valid_patterns: vec!["/story/".to_string()],
        min_content_length: 100,
        ..SourceConfig::default()
    }
}

/// Creates a test configuration whose history and data live under `dir`
pub fn create_test_config(dir: &Path, sources: Vec<SourceConfig>) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 2,
            recursion_level: 1,
            min_page_bytes: 0,
            run_date: Some(run_date()),
        },
        network: network_config(1),
        history: HistoryConfig {
            database_path: dir.join("history.db").to_string_lossy().into_owned(),
        },
        output: OutputConfig {
            data_dir: dir.join("data").to_string_lossy().into_owned(),
        },
        sources,
    }
}

/// Serves `body` as HTML at `page`
pub async fn mount_html(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// An index page linking to `links`
pub fn index_html(links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">{}</a>"#, link, link))
        .collect();
    format!(
        "<html><head><title>Index</title></head><body>{}</body></html>",
        anchors
    )
}

/// An article page; `published` is written as `article:published_time`
pub fn article_html(title: &str, body: &str, published: Option<&str>) -> String {
    let date_meta = published
        .map(|date| format!(r#"<meta property="article:published_time" content="{}">"#, date))
        .unwrap_or_default();
    format!(
        r#"<html><head><title>{}</title>{}</head><body><article><h1>{}</h1><p>{}</p></article></body></html>"#,
        title, date_meta, title, body
    )
}

/// Body text comfortably above the test sources' minimum content length
pub fn long_body(seed: &str) -> String {
    format!("{} ", seed).repeat(40)
}

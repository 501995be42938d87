use crate::common::{
    article_html, content_source, index_html, long_body, mount_html, network_config, run_date,
};
use gleaner::config::IdPatternConfig;
use gleaner::crawler::NetworkFetcher;
use gleaner::output::read_article;
use gleaner::sources::{CrawlEngine, GenericNewsSource, RunContext, SourceProfile};
use gleaner::storage::{open_history, HistoryStore, HistoryTable};
use gleaner::FetchStatus;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::MockServer;

fn engine(profile: SourceProfile) -> CrawlEngine {
    let fetcher = NetworkFetcher::new(&network_config(1)).expect("Failed to build fetcher");
    CrawlEngine::new(Arc::new(GenericNewsSource::new(profile)), Arc::new(fetcher))
}

fn context(dir: &TempDir) -> RunContext {
    RunContext {
        run_date: run_date(),
        history: Arc::new(
            open_history(&dir.path().join("history.db")).expect("Failed to open history"),
        ),
        data_dir: dir.path().join("data"),
        min_page_bytes: 64,
    }
}

#[tokio::test]
async fn test_discovery_follows_links_to_configured_depth() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    // Level 1: the front page; level 2: the section page; level 3 is out of reach
    mount_html(
        &mock_server,
        "/",
        index_html(&[format!("{}/story/1", base), format!("{}/section", base)]),
    )
    .await;
    mount_html(&mock_server, "/story/1", index_html(&[format!("{}/", base)])).await;
    mount_html(&mock_server, "/section", index_html(&[format!("{}/story/2", base)])).await;
    mount_html(&mock_server, "/story/2", index_html(&[format!("{}/story/3", base)])).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let ctx = context(&dir);

    let mut config = content_source("wire", format!("{}/", base));
    config.recursion_level = Some(2);
    let engine = engine(SourceProfile::from_config(&config, 1).expect("Invalid profile"));

    let discovered: BTreeSet<String> = engine.discover_urls(&ctx).await.into_iter().collect();
    let expected: BTreeSet<String> = [format!("{}/story/1", base), format!("{}/story/2", base)]
        .into_iter()
        .collect();
    assert_eq!(discovered, expected);

    // Discovered URLs are written to pending before they are returned
    for url in &expected {
        assert_eq!(
            ctx.history.locate(url).expect("Lookup failed"),
            vec![HistoryTable::Pending]
        );
    }
}

#[tokio::test]
async fn test_discovery_skips_fetched_urls_and_resumes_backlog() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_html(
        &mock_server,
        "/",
        index_html(&[format!("{}/story/1", base), format!("{}/story/2", base)]),
    )
    .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let ctx = context(&dir);
    let backlog = format!("{}/story/old", base);
    ctx.history
        .add_pending(&[backlog.clone()], "wire")
        .expect("add_pending failed");

    let mut done = gleaner::FetchOutcome::unsuccessful(
        &format!("{}/story/1", base),
        "wire",
        FetchStatus::Saved,
    );
    done.text_size = 500;
    ctx.history
        .record_completed(&[done])
        .expect("record_completed failed");

    let engine = engine(
        SourceProfile::from_config(&content_source("wire", format!("{}/", base)), 1)
            .expect("Invalid profile"),
    );
    let discovered: BTreeSet<String> = engine.discover_urls(&ctx).await.into_iter().collect();

    let expected: BTreeSet<String> = [format!("{}/story/2", base), backlog].into_iter().collect();
    assert_eq!(discovered, expected);
}

#[tokio::test]
async fn test_fetch_outcomes() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_html(
        &mock_server,
        "/story/good",
        article_html("Good story", &long_body("markets"), Some("2024-04-30T08:00:00+00:00")),
    )
    .await;
    mount_html(
        &mock_server,
        "/story/short",
        article_html(
            "Short story",
            "Too brief to keep, padded with markup only.",
            Some("2024-04-30T08:00:00+00:00"),
        ),
    )
    .await;
    mount_html(
        &mock_server,
        "/story/undated",
        article_html("Undated story", &long_body("weather"), None),
    )
    .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let ctx = context(&dir);

    let mut config = content_source("wire", format!("{}/", base));
    config.id_patterns = vec![IdPatternConfig {
        pattern: r"/story/([a-z]+)".to_string(),
        group: 1,
    }];
    let engine = engine(SourceProfile::from_config(&config, 1).expect("Invalid profile"));

    let good = engine.fetch_and_extract(&format!("{}/story/good", base), &ctx).await;
    assert_eq!(good.status, FetchStatus::Saved);
    assert_eq!(good.article_id.as_deref(), Some("good"));
    assert_eq!(
        good.publish_date.map(|d| d.to_rfc3339()).as_deref(),
        Some("2024-04-30T08:00:00+00:00")
    );
    let saved = good.saved_path.expect("No saved path");
    assert!(saved.ends_with("wire/2024-05-01/wire_good.json"));
    let record = read_article(&saved).expect("Failed to read article");
    assert_eq!(record.title.as_deref(), Some("Good story"));
    assert_eq!(record.text.len(), good.text_size);

    let short = engine.fetch_and_extract(&format!("{}/story/short", base), &ctx).await;
    assert_eq!(short.status, FetchStatus::TooShort);
    assert!(short.saved_path.is_none());

    let undated = engine.fetch_and_extract(&format!("{}/story/undated", base), &ctx).await;
    assert_eq!(undated.status, FetchStatus::NoPublishDate);

    // Unmocked paths answer 404, which exhausts the single attempt
    let missing = engine.fetch_and_extract(&format!("{}/story/missing", base), &ctx).await;
    assert_eq!(missing.status, FetchStatus::NetworkFailure);

    // The main URL is an index page and is never fetched as an article
    let index = engine.fetch_and_extract(&format!("{}/", base), &ctx).await;
    assert_eq!(index.status, FetchStatus::NonContentUrl);
}

#[tokio::test]
async fn test_small_download_is_no_content() {
    let mock_server = MockServer::start().await;
    mount_html(&mock_server, "/story/tiny", "<p>tiny</p>".to_string()).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let ctx = context(&dir);
    let engine = engine(
        SourceProfile::from_config(&content_source("wire", format!("{}/", mock_server.uri())), 1)
            .expect("Invalid profile"),
    );

    let outcome = engine
        .fetch_and_extract(&format!("{}/story/tiny", mock_server.uri()), &ctx)
        .await;
    assert_eq!(outcome.status, FetchStatus::NoContent);
    assert_eq!(outcome.raw_size, 11);
    assert!(!outcome.success());
}

use crate::common::{
    article_html, content_source, create_test_config, index_html, long_body, mount_html, run_date,
};
use gleaner::config::SourceConfig;
use gleaner::sources::BatchReport;
use gleaner::storage::{open_history, HistoryStore, HistoryTable};
use gleaner::{FetchOutcome, FetchStatus, QueueManager, SourceKind, SourceState};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Two sources with two story links each on their front pages
async fn mount_two_sources(server: &MockServer) {
    let base = server.uri();
    for name in ["alpha", "beta"] {
        mount_html(
            server,
            &format!("/{}/", name),
            index_html(&[
                format!("{}/{}/story/1", base, name),
                format!("{}/{}/story/2", base, name),
            ]),
        )
        .await;
    }
}

fn two_sources(base: &str) -> Vec<SourceConfig> {
    vec![
        content_source("alpha", format!("{}/alpha/", base)),
        content_source("beta", format!("{}/beta/", base)),
    ]
}

fn frontier_urls(manager: &QueueManager) -> BTreeSet<String> {
    manager.frontier().values().flatten().cloned().collect()
}

#[tokio::test]
async fn test_discovery_skips_completed_history() {
    let mock_server = MockServer::start().await;
    mount_two_sources(&mock_server).await;
    let base = mock_server.uri();

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(dir.path(), two_sources(&base));
    let history = Arc::new(
        open_history(Path::new(&config.history.database_path)).expect("Failed to open history"),
    );

    // One of the four URLs was completed by an earlier run
    let earlier = FetchOutcome::unsuccessful(
        &format!("{}/alpha/story/1", base),
        "alpha",
        FetchStatus::Saved,
    );
    history
        .record_completed(&[earlier])
        .expect("record_completed failed");

    let mut manager = QueueManager::with_history(&config, run_date(), 1, history.clone())
        .expect("Failed to configure queue manager");
    let queued = manager.run_discovery_phase().await;

    assert_eq!(queued, 3);
    assert_eq!(history.statistics().expect("Stats failed").pending, 3);
    assert!(!frontier_urls(&manager).contains(&format!("{}/alpha/story/1", base)));

    for name in ["alpha", "beta"] {
        let source = manager.registry().get(name).expect("Source missing");
        assert_eq!(source.descriptor.state(), SourceState::FetchingContent);
    }
}

#[tokio::test]
async fn test_failing_source_does_not_block_others() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/alpha/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_html(
        &mock_server,
        "/beta/",
        index_html(&[
            format!("{}/beta/story/1", base),
            format!("{}/beta/story/2", base),
        ]),
    )
    .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(dir.path(), two_sources(&base));
    let history = Arc::new(
        open_history(Path::new(&config.history.database_path)).expect("Failed to open history"),
    );

    let mut manager = QueueManager::with_history(&config, run_date(), 2, history.clone())
        .expect("Failed to configure queue manager");
    assert_eq!(manager.run_discovery_phase().await, 2);

    assert!(!manager.frontier().contains_key("alpha"));
    assert_eq!(
        manager.frontier().get("beta"),
        Some(&vec![
            format!("{}/beta/story/1", base),
            format!("{}/beta/story/2", base),
        ])
    );
    assert_eq!(manager.metrics().task_errors, 0);

    let stats = history.statistics().expect("Stats failed");
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.per_source.get("beta").map(|c| c.pending), Some(2));
    assert!(!stats.per_source.contains_key("alpha"));
}

#[tokio::test]
async fn test_rediscovery_is_idempotent() {
    let mock_server = MockServer::start().await;
    mount_two_sources(&mock_server).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(dir.path(), two_sources(&mock_server.uri()));
    let history = Arc::new(
        open_history(Path::new(&config.history.database_path)).expect("Failed to open history"),
    );

    let mut first = QueueManager::with_history(&config, run_date(), 2, history.clone())
        .expect("Failed to configure queue manager");
    first.run_discovery_phase().await;

    let mut second = QueueManager::with_history(&config, run_date(), 3, history.clone())
        .expect("Failed to configure queue manager");
    second.run_discovery_phase().await;

    assert_eq!(frontier_urls(&first).len(), 4);
    assert_eq!(frontier_urls(&first), frontier_urls(&second));
    assert_eq!(history.statistics().expect("Stats failed").pending, 4);
}

#[tokio::test]
async fn test_full_run_records_history_and_sweeps_duplicates() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_html(
        &mock_server,
        "/alpha/",
        index_html(&[
            format!("{}/alpha/story/1", base),
            format!("{}/alpha/story/2", base),
            format!("{}/alpha/story/gone", base),
        ]),
    )
    .await;

    // Two stories carrying the same text; the gone story has no mock and answers 404
    let body = long_body("identical");
    for story in ["1", "2"] {
        mount_html(
            &mock_server,
            &format!("/alpha/story/{}", story),
            article_html(
                &format!("Story {}", story),
                &body,
                Some("2024-04-30T08:00:00+00:00"),
            ),
        )
        .await;
    }

    let dir = TempDir::new().expect("Failed to create temp dir");
    let sweeper = SourceConfig {
        name: "dedupe".to_string(),
        kind: SourceKind::DataProcessor,
        plugin: "duplicate-sweeper".to_string(),
        ..SourceConfig::default()
    };
    let config = create_test_config(
        dir.path(),
        vec![content_source("alpha", format!("{}/alpha/", base)), sweeper],
    );
    let history = Arc::new(
        open_history(Path::new(&config.history.database_path)).expect("Failed to open history"),
    );

    let mut manager = QueueManager::with_history(&config, run_date(), 2, history.clone())
        .expect("Failed to configure queue manager");
    let summary = manager.run().await;

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.saved, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.task_errors, 0);
    assert_eq!(
        summary.processed,
        vec![(
            "dedupe".to_string(),
            BatchReport {
                examined: 2,
                removed: 1
            }
        )]
    );

    let stats = history.statistics().expect("Stats failed");
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(
        history
            .locate(&format!("{}/alpha/story/gone", base))
            .expect("Lookup failed"),
        vec![HistoryTable::Failed]
    );

    let articles = gleaner::output::list_articles(&dir.path().join("data"), run_date())
        .expect("Failed to list articles");
    assert_eq!(articles.len(), 1);

    for (_, _, state) in manager.registry().status_report() {
        assert_eq!(state, SourceState::Stopped);
    }

    // Nothing is fetched twice: a second run finds no work
    let mut again = QueueManager::with_history(&config, run_date(), 2, history.clone())
        .expect("Failed to configure queue manager");
    assert_eq!(again.run_discovery_phase().await, 0);
}

#[tokio::test]
async fn test_aggregator_urls_routed_to_owner() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    let feed = format!(
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Digest</title>
<item><title>Owned</title><link>{}/beta/story/9</link></item>
<item><title>Elsewhere</title><link>https://unclaimed.example.org/story/1</link></item>
</channel></rss>"#,
        base
    );
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(feed)
                .insert_header("content-type", "application/rss+xml"),
        )
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/beta/", index_html(&[])).await;

    let digest = SourceConfig {
        name: "digest".to_string(),
        kind: SourceKind::Aggregator,
        plugin: "feed-aggregator".to_string(),
        feeds: vec![format!("{}/feed.xml", base)],
        ..SourceConfig::default()
    };
    let mut beta = content_source("beta", format!("{}/beta/", base));
    beta.allowed_domains = vec!["127.0.0.1".to_string()];

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(dir.path(), vec![digest, beta]);
    let history = Arc::new(
        open_history(Path::new(&config.history.database_path)).expect("Failed to open history"),
    );

    let mut manager = QueueManager::with_history(&config, run_date(), 2, history.clone())
        .expect("Failed to configure queue manager");
    assert_eq!(manager.run_discovery_phase().await, 1);

    let owned = format!("{}/beta/story/9", base);
    assert_eq!(manager.frontier().get("beta"), Some(&vec![owned.clone()]));
    assert!(!manager.frontier().contains_key("digest"));

    let stats = history.statistics().expect("Stats failed");
    assert_eq!(stats.per_source.get("beta").map(|c| c.pending), Some(1));

    let digest = manager.registry().get("digest").expect("Source missing");
    assert_eq!(digest.descriptor.state(), SourceState::Stopped);
}

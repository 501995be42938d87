use crate::common::network_config;
use gleaner::crawler::{FetchError, NetworkFetcher};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_exhausts_retries_on_server_errors() {
    let mock_server = MockServer::start().await;

    // Every attempt fails; exactly retry_count requests must arrive
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = NetworkFetcher::new(&network_config(3)).expect("Failed to build fetcher");
    let result = fetcher
        .fetch(&format!("{}/flaky", mock_server.uri()), "wire")
        .await;

    match result {
        Err(FetchError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("Expected exhausted retries, got {:?}", other.map(|p| p.final_url)),
    }
}

#[tokio::test]
async fn test_timeouts_are_retried_then_given_up() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1500)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut config = network_config(2);
    config.read_timeout = 0.3;
    let fetcher = NetworkFetcher::new(&config).expect("Failed to build fetcher");

    let result = fetcher
        .fetch(&format!("{}/slow", mock_server.uri()), "wire")
        .await;
    assert!(matches!(
        result,
        Err(FetchError::Exhausted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn test_redirect_loop_aborts_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/loop", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;

    let fetcher = NetworkFetcher::new(&network_config(3)).expect("Failed to build fetcher");
    let result = fetcher
        .fetch(&format!("{}/loop", mock_server.uri()), "wire")
        .await;
    assert!(matches!(result, Err(FetchError::Aborted { .. })));
}

#[tokio::test]
async fn test_user_agent_rotates_every_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", "ua-one"))
        .respond_with(ResponseTemplate::new(200).set_body_string("first"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", "ua-two"))
        .respond_with(ResponseTemplate::new(200).set_body_string("second"))
        .mount(&mock_server)
        .await;

    let fetcher = NetworkFetcher::new(&network_config(1)).expect("Failed to build fetcher");
    let url = format!("{}/page", mock_server.uri());

    let mut bodies = Vec::new();
    for _ in 0..3 {
        let page = fetcher.fetch(&url, "wire").await.expect("Fetch failed");
        bodies.push(page.text);
    }
    assert_eq!(bodies, vec!["first", "second", "first"]);
}

#[tokio::test]
async fn test_post_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_string_contains("q=rates"))
        .respond_with(ResponseTemplate::new(200).set_body_string("results"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = NetworkFetcher::new(&network_config(1)).expect("Failed to build fetcher");
    let data = fetcher
        .post_http_data(
            &format!("{}/search", mock_server.uri()),
            "wire",
            &[("q", "rates")],
        )
        .await
        .expect("POST failed");

    assert_eq!(data.status, 200);
    assert_eq!(data.body, b"results".to_vec());
}

#[tokio::test]
async fn test_declared_charset_is_decoded() {
    let mock_server = MockServer::start().await;

    // "café" in ISO-8859-1
    let body: Vec<u8> = vec![b'c', b'a', b'f', 0xE9];
    Mock::given(method("GET"))
        .and(path("/latin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("content-type", "text/html; charset=iso-8859-1"),
        )
        .mount(&mock_server)
        .await;

    let fetcher = NetworkFetcher::new(&network_config(1)).expect("Failed to build fetcher");
    let page = fetcher
        .fetch(&format!("{}/latin", mock_server.uri()), "wire")
        .await
        .expect("Fetch failed");

    assert_eq!(page.text, "café");
    assert_eq!(page.bytes.len(), 4);
}

//! Network fetcher
//!
//! This module handles all HTTP requests made on behalf of sources, including:
//! - Building one HTTP client per configured proxy
//! - Rotating user-agent strings round-robin across attempts
//! - Retry logic with a fixed wait plus random jitter after every attempt
//! - Error classification (transient vs. abort)
//! - Response charset detection and decoding

use crate::config::NetworkConfig;
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Proxy, RequestBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// How many leading bytes are searched for a `<meta charset>` declaration
const CHARSET_SNIFF_WINDOW: usize = 4096;

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#)
        .expect("charset regex")
});

/// Errors returned once the fetcher gives up on a URL
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url}: all {attempts} attempts failed (last error: {last_error})")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("{url}: retries abandoned after unrecoverable error: {error}")]
    Aborted { url: String, error: String },
}

/// Full response for sources that need more than the decoded body
#[derive(Debug, Clone)]
pub struct HttpResponseData {
    /// Final URL after redirects
    pub final_url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponseData {
    /// Decodes the body using the declared or sniffed charset
    pub fn into_page(self) -> FetchedPage {
        let (text, encoding) = decode_body(&self.body, self.content_type.as_deref());
        FetchedPage {
            final_url: self.final_url,
            bytes: self.body,
            text,
            encoding,
        }
    }
}

/// A fetched document with its raw bytes and decoded text
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub bytes: Vec<u8>,
    pub text: String,
    /// Name of the encoding the text was decoded with
    pub encoding: &'static str,
}

/// Builds an HTTP client with the configured timeouts and optional proxy
///
/// # Arguments
///
/// * `config` - The network configuration
/// * `proxy` - Proxy URL to route every request through, if any
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client or parse the proxy
pub fn build_http_client(
    config: &NetworkConfig,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout_duration())
        .timeout(config.read_timeout_duration())
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// HTTP fetcher shared by every source in a run
///
/// The user-agent and proxy cursors are atomic so a single fetcher can serve
/// all workers concurrently.
pub struct NetworkFetcher {
    clients: Vec<Client>,
    user_agents: Vec<String>,
    agent_index: AtomicUsize,
    proxy_index: AtomicUsize,
    retry_count: u32,
    retry_wait: Duration,
    min_jitter: f64,
    max_jitter: f64,
}

impl NetworkFetcher {
    /// Creates a fetcher from the network configuration
    pub fn new(config: &NetworkConfig) -> Result<Self, reqwest::Error> {
        let clients = if config.proxies.is_empty() {
            vec![build_http_client(config, None)?]
        } else {
            config
                .proxies
                .iter()
                .map(|proxy| build_http_client(config, Some(proxy)))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut user_agents = config.user_agent_list();
        if user_agents.is_empty() {
            user_agents.push(format!("gleaner/{}", env!("CARGO_PKG_VERSION")));
        }

        Ok(Self {
            clients,
            user_agents,
            agent_index: AtomicUsize::new(0),
            proxy_index: AtomicUsize::new(0),
            retry_count: config.retry_count.max(1),
            retry_wait: config.retry_wait_duration(),
            min_jitter: config.min_jitter,
            max_jitter: config.max_jitter,
        })
    }

    /// Fetches a URL and decodes its body
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `source` - Name of the source the request is made for (logging only)
    pub async fn fetch(&self, url: &str, source: &str) -> Result<FetchedPage, FetchError> {
        let data = self.get_http_data(url, source).await?;
        Ok(data.into_page())
    }

    /// Issues a GET and returns the full response
    pub async fn get_http_data(
        &self,
        url: &str,
        source: &str,
    ) -> Result<HttpResponseData, FetchError> {
        self.execute(url, source, |client| client.get(url)).await
    }

    /// Issues a form-encoded POST and returns the full response
    pub async fn post_http_data(
        &self,
        url: &str,
        source: &str,
        form: &[(&str, &str)],
    ) -> Result<HttpResponseData, FetchError> {
        self.execute(url, source, |client| client.post(url).form(form))
            .await
    }

    /// User agent the next attempt will send
    pub fn current_user_agent(&self) -> &str {
        let index = self.agent_index.load(Ordering::Relaxed) % self.user_agents.len();
        &self.user_agents[index]
    }

    /// Retry loop shared by every request kind
    ///
    /// Every attempt, successful or not, advances the user agent and is
    /// followed by the throttling pause.
    async fn execute<F>(
        &self,
        url: &str,
        source: &str,
        build: F,
    ) -> Result<HttpResponseData, FetchError>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let mut last_error = String::new();

        for attempt in 1..=self.retry_count {
            let client = self.next_client();
            let request = build(client).header(USER_AGENT, self.current_user_agent());

            let result = send(request).await;

            self.agent_index.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(self.pause()).await;

            match result {
                Ok(data) => {
                    tracing::debug!(
                        source,
                        attempt,
                        status = data.status,
                        bytes = data.body.len(),
                        "Fetched {}",
                        url
                    );
                    return Ok(data);
                }
                Err(e) if is_transient(&e) => {
                    tracing::warn!(
                        source,
                        attempt,
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        self.retry_count,
                        url,
                        e
                    );
                    last_error = e.to_string();
                }
                Err(e) => {
                    tracing::error!(source, "Giving up on {}: {}", url, e);
                    return Err(FetchError::Aborted {
                        url: url.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.retry_count,
            last_error,
        })
    }

    fn next_client(&self) -> &Client {
        let index = self.proxy_index.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }

    /// Fixed wait plus a random jitter in `[min_jitter, max_jitter]`
    fn pause(&self) -> Duration {
        let jitter = if self.max_jitter.is_finite() && self.max_jitter > self.min_jitter {
            rand::rng().random_range(self.min_jitter..=self.max_jitter)
        } else {
            self.min_jitter
        };
        self.retry_wait + Duration::try_from_secs_f64(jitter).unwrap_or(Duration::ZERO)
    }
}

async fn send(request: RequestBuilder) -> Result<HttpResponseData, reqwest::Error> {
    let response = request.send().await?.error_for_status()?;

    let final_url = response.url().to_string();
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponseData {
        final_url,
        status,
        headers,
        content_type,
        body,
    })
}

/// Timeouts, connection failures, HTTP error statuses and request/body errors
/// are retried; anything else (redirect loops, decoding, builder errors) is not.
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout()
        || error.is_connect()
        || error.is_status()
        || error.is_request()
        || error.is_body()
}

/// Decodes a response body
///
/// A charset declared in the Content-Type header wins. Without one, the
/// document is searched for a `<meta charset>` declaration, and UTF-8 is
/// assumed when that fails too. A byte-order mark overrides all of these.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> (String, &'static str) {
    let encoding = content_type
        .and_then(declared_charset)
        .or_else(|| sniff_charset(body))
        .unwrap_or(UTF_8);

    let (text, used, _had_errors) = encoding.decode(body);
    (text.into_owned(), used.name())
}

fn declared_charset(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Encoding::for_label(value.trim().trim_matches('"').as_bytes())
        } else {
            None
        }
    })
}

fn sniff_charset(body: &[u8]) -> Option<&'static Encoding> {
    let window = &body[..body.len().min(CHARSET_SNIFF_WINDOW)];
    let head = String::from_utf8_lossy(window);
    let label = META_CHARSET.captures(&head)?.get(1)?.as_str().to_string();
    Encoding::for_label(label.as_bytes())
}

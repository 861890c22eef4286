//! Document fetching over HTTP
//!
//! One GET per usable row, bounded by the configured timeout, never retried.
//! Redirects and TLS follow the reqwest defaults.

use crate::config::FetchConfig;
use crate::error::Result;
use crate::types::FetchOutcome;
use async_trait::async_trait;
use std::time::Duration;

/// Fetches the document behind a manifest URL
///
/// Implementations never return an error: every failure is folded into
/// [`FetchOutcome`] so the caller can report it and move on to the next row.
///
/// # Examples
///
/// ```no_run
/// use manifest_dl::config::FetchConfig;
/// use manifest_dl::fetcher::{DocumentFetcher, HttpFetcher};
/// use manifest_dl::types::FetchOutcome;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpFetcher::new(&FetchConfig::default())?;
///
/// match fetcher.fetch("https://example.com/cv.pdf").await {
///     FetchOutcome::Success(bytes) => println!("got {} bytes", bytes.len()),
///     FetchOutcome::HttpFailure(status) => println!("status {status}"),
///     FetchOutcome::TransportFailure(message) => println!("failed: {message}"),
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Perform a single GET for `url`
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// [`DocumentFetcher`] backed by a shared reqwest client
///
/// The client is built once and reused across rows and runs, so connections
/// to the same document host are pooled.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher with the configured timeout and User-Agent
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    fn describe(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            format!("timed out after {} seconds ({})", self.timeout.as_secs(), error)
        } else if error.is_connect() {
            format!("connection failed ({})", error)
        } else {
            error.to_string()
        }
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url, error = %e, "request failed");
                return FetchOutcome::TransportFailure(self.describe(&e));
            }
        };

        // only an exact 200 counts, not the whole 2xx range
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::debug!(url, status = status.as_u16(), "unexpected status");
            return FetchOutcome::HttpFailure(status.as_u16());
        }

        match response.bytes().await {
            Ok(bytes) => FetchOutcome::Success(bytes.to_vec()),
            Err(e) => {
                tracing::debug!(url, error = %e, "failed to read response body");
                FetchOutcome::TransportFailure(self.describe(&e))
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_with_timeout(timeout: Duration) -> HttpFetcher {
        HttpFetcher::new(&FetchConfig {
            timeout,
            user_agent: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn status_200_returns_body() {
        let mock_server = MockServer::start().await;
        let body = vec![7u8; 1024];

        Mock::given(method("GET"))
            .and(path("/cv.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = fetcher_with_timeout(Duration::from_secs(5));
        let outcome = fetcher
            .fetch(&format!("{}/cv.pdf", mock_server.uri()))
            .await;

        assert_eq!(outcome, FetchOutcome::Success(body));
    }

    #[tokio::test]
    async fn status_404_is_http_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = fetcher_with_timeout(Duration::from_secs(5));
        let outcome = fetcher
            .fetch(&format!("{}/missing.pdf", mock_server.uri()))
            .await;

        assert_eq!(outcome, FetchOutcome::HttpFailure(404));
    }

    #[tokio::test]
    async fn other_2xx_statuses_are_failures() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/created"))
            .respond_with(ResponseTemplate::new(201).set_body_bytes(b"x".to_vec()))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let fetcher = fetcher_with_timeout(Duration::from_secs(5));

        assert_eq!(
            fetcher
                .fetch(&format!("{}/created", mock_server.uri()))
                .await,
            FetchOutcome::HttpFailure(201)
        );
        assert_eq!(
            fetcher.fetch(&format!("{}/empty", mock_server.uri())).await,
            FetchOutcome::HttpFailure(204)
        );
    }

    #[tokio::test]
    async fn slow_response_times_out_as_transport_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_bytes(b"late".to_vec()),
            )
            .mount(&mock_server)
            .await;

        let fetcher = fetcher_with_timeout(Duration::from_millis(200));
        let outcome = fetcher
            .fetch(&format!("{}/slow.pdf", mock_server.uri()))
            .await;

        match outcome {
            FetchOutcome::TransportFailure(message) => {
                assert!(message.contains("timed out"), "got: {message}")
            }
            other => panic!("expected transport failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_transport_failure() {
        // bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = fetcher_with_timeout(Duration::from_secs(5));
        let outcome = fetcher.fetch(&format!("http://{addr}/cv.pdf")).await;

        assert!(
            matches!(outcome, FetchOutcome::TransportFailure(_)),
            "got {outcome:?}"
        );
    }

    #[tokio::test]
    async fn unparseable_url_is_transport_failure() {
        let fetcher = fetcher_with_timeout(Duration::from_secs(5));
        let outcome = fetcher.fetch("not a url").await;

        assert!(matches!(outcome, FetchOutcome::TransportFailure(_)));
    }

    #[tokio::test]
    async fn configured_user_agent_is_sent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cv.pdf"))
            .and(header("user-agent", "manifest-dl-test"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&FetchConfig {
            timeout: Duration::from_secs(5),
            user_agent: Some("manifest-dl-test".to_string()),
        })
        .unwrap();

        let outcome = fetcher
            .fetch(&format!("{}/cv.pdf", mock_server.uri()))
            .await;
        assert_eq!(outcome, FetchOutcome::Success(b"ok".to_vec()));
    }
}

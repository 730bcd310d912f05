use crate::config::Config;
use crate::util::{validate_feed_url, UrlValidationError};
use futures::StreamExt;
use reqwest::redirect::Policy;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("feedview/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 3;

/// Why a feed download produced no text.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS or DNS failure, or a redirect the policy refused.
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    /// Still answering 429 once the retries ran out.
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// The body is bigger than `max_feed_bytes`.
    #[error("Response too large")]
    ResponseTooLarge,
    /// The connection closed before `Content-Length` bytes arrived.
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Downloads feed documents as text.
///
/// Cloning is cheap; the underlying `reqwest::Client` is reference-counted.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
    max_retries: u32,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect_policy(config.allow_private_hosts))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            timeout: config.request_timeout(),
            max_bytes: usize::try_from(config.max_feed_bytes).unwrap_or(usize::MAX),
            max_retries: config.max_retries,
        }
    }

    /// Fetches `url` and returns the body as text.
    ///
    /// # Behavior
    ///
    /// - Each request is bounded by the configured timeout
    /// - 429 and 5xx responses back off exponentially (1s, 2s, 4s, ...) up to
    ///   `max_retries` times; other non-2xx statuses fail immediately
    /// - Bodies larger than `max_feed_bytes` are rejected
    /// - Invalid UTF-8 is replaced rather than rejected
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let mut retry_count = 0;

        let bytes = loop {
            let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(FetchError::Network)?;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if retry_count >= self.max_retries {
                    return Err(if status.is_server_error() {
                        FetchError::HttpStatus(status.as_u16())
                    } else {
                        FetchError::RateLimited(self.max_retries)
                    });
                }
                let delay_secs = 1u64 << retry_count;
                tracing::warn!(
                    url = %url,
                    status = %status,
                    retry = retry_count,
                    delay_secs = delay_secs,
                    "Feed server refused request, backing off"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            match self.read_body(response).await {
                Ok(bytes) => break bytes,
                Err(FetchError::IncompleteResponse { expected, received })
                    if retry_count < self.max_retries =>
                {
                    let delay_secs = 1u64 << retry_count;
                    tracing::debug!(
                        url = %url,
                        expected = expected,
                        received = received,
                        delay_secs = delay_secs,
                        "Retrying incomplete download"
                    );
                    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        };

        tracing::debug!(url = %url, bytes = bytes.len(), "Fetched feed");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Collects the body, refusing to hold more than `max_bytes`.
    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let declared = response.content_length();
        let capacity = match declared {
            Some(len) if len > self.max_bytes as u64 => {
                return Err(FetchError::ResponseTooLarge);
            }
            Some(len) => len as usize,
            None => 0,
        };

        let mut body = Vec::with_capacity(capacity);
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::ResponseTooLarge);
            }
            body.extend_from_slice(&chunk);
        }

        match declared {
            Some(expected) if (body.len() as u64) < expected => {
                Err(FetchError::IncompleteResponse {
                    expected,
                    received: body.len(),
                })
            }
            _ => Ok(body),
        }
    }
}

/// Why a redirect hop was refused.
#[derive(Debug, Error, PartialEq, Eq)]
enum RedirectRefused {
    #[error("too many redirects")]
    TooMany,
    #[error("redirect loop back to {0}")]
    Loop(String),
    #[error("redirect target rejected: {0}")]
    Target(#[from] UrlValidationError),
}

/// Decides whether to follow a hop to `next` after visiting `previous`.
///
/// Redirect targets get the same address checks as submitted URLs, so a
/// public feed cannot bounce the fetcher onto a private host.
fn check_redirect(
    next: &Url,
    previous: &[Url],
    allow_private_hosts: bool,
) -> Result<(), RedirectRefused> {
    if previous.len() >= MAX_REDIRECTS {
        return Err(RedirectRefused::TooMany);
    }
    if previous.iter().any(|seen| seen == next) {
        return Err(RedirectRefused::Loop(next.to_string()));
    }
    validate_feed_url(next.as_str(), allow_private_hosts)?;
    Ok(())
}

fn redirect_policy(allow_private_hosts: bool) -> Policy {
    Policy::custom(move |attempt| {
        match check_redirect(attempt.url(), attempt.previous(), allow_private_hosts) {
            Ok(()) => {
                tracing::debug!(
                    to = %attempt.url(),
                    hop = attempt.previous().len(),
                    "Following redirect"
                );
                attempt.follow()
            }
            Err(reason) => {
                tracing::warn!(to = %attempt.url(), reason = %reason, "Refusing redirect");
                attempt.error(reason)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{any, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = "<rss><channel><title>T</title><description>D</description></channel></rss>";

    fn fetcher(max_retries: u32) -> Fetcher {
        let config = Config {
            max_retries,
            max_feed_bytes: 1024,
            ..Config::default()
        };
        Fetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/rss+xml"),
            )
            .mount(&mock_server)
            .await;

        let body = fetcher(0)
            .fetch_text(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(body, VALID_RSS);
    }

    #[tokio::test]
    async fn test_fetch_404_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = fetcher(3)
            .fetch_text(&format!("{}/feed", mock_server.uri()))
            .await;
        match result {
            Err(FetchError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_500_without_retries_fails_once() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = fetcher(0)
            .fetch_text(&format!("{}/feed", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_fetch_503_retry_then_success() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let body = fetcher(1)
            .fetch_text(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(body, VALID_RSS);
    }

    #[tokio::test]
    async fn test_fetch_rate_limited() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let result = fetcher(0)
            .fetch_text(&format!("{}/feed", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::RateLimited(0))));
    }

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_redirect_to_private_host_refused() {
        let previous = [url("https://feeds.example.com/rss")];
        for target in [
            "http://169.254.169.254/latest/meta-data/",
            "http://127.0.0.1/admin",
            "http://localhost:8080/",
            "http://10.0.0.5/rss",
        ] {
            assert!(
                matches!(
                    check_redirect(&url(target), &previous, false),
                    Err(RedirectRefused::Target(_))
                ),
                "{} should be refused",
                target
            );
            assert_eq!(check_redirect(&url(target), &previous, true), Ok(()));
        }
    }

    #[test]
    fn test_redirect_to_public_host_followed() {
        let previous = [url("https://example.com/rss")];
        assert_eq!(
            check_redirect(&url("https://www.example.com/rss"), &previous, false),
            Ok(())
        );
    }

    #[test]
    fn test_redirect_scheme_change_refused() {
        let previous = [url("https://example.com/rss")];
        assert!(matches!(
            check_redirect(&url("file:///etc/passwd"), &previous, true),
            Err(RedirectRefused::Target(UrlValidationError::UnsupportedScheme(_)))
        ));
    }

    #[test]
    fn test_redirect_hop_limit_and_loops() {
        let a = url("https://a.example.com/");
        let b = url("https://b.example.com/");
        let c = url("https://c.example.com/");
        let d = url("https://d.example.com/");
        assert_eq!(
            check_redirect(&d, &[a.clone(), b.clone(), c], false),
            Err(RedirectRefused::TooMany)
        );
        assert!(matches!(
            check_redirect(&a, &[a.clone(), b], false),
            Err(RedirectRefused::Loop(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_refuses_redirect_onto_loopback() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/feed"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/internal", mock_server.uri())),
            )
            .mount(&mock_server)
            .await;
        Mock::given(path("/internal"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = fetcher(0)
            .fetch_text(&format!("{}/feed", mock_server.uri()))
            .await;
        match result {
            Err(FetchError::Network(e)) => assert!(e.is_redirect()),
            other => panic!("Expected refused redirect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_follows_redirect_when_private_hosts_allowed() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/feed"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/moved", mock_server.uri())),
            )
            .mount(&mock_server)
            .await;
        Mock::given(path("/moved"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let config = Config {
            allow_private_hosts: true,
            max_retries: 0,
            ..Config::default()
        };
        let body = Fetcher::new(&config)
            .unwrap()
            .fetch_text(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(body, VALID_RSS);
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
            .mount(&mock_server)
            .await;

        let result = fetcher(0)
            .fetch_text(&format!("{}/feed", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::ResponseTooLarge)));
    }
}

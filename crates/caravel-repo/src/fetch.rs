//! The injected transport capability
//!
//! Everything the engine downloads goes through [`Fetcher`], so the
//! synchronization and resolution logic is testable against fakes and
//! carries no transport assumptions of its own.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::credentials::ScopedCredentials;
use crate::error::{RepoError, Result};

/// Default bound on a single fetch (index or artifact)
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_REDIRECTS: u32 = 10;

/// Narrow fetch capability: a URL and a deadline in, bytes out
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, deadline: Duration) -> Result<Vec<u8>>;
}

/// HTTP fetcher with scoped credentials and redirect protection.
///
/// Redirects are followed manually so credentials are never forwarded to a
/// different origin than the one they were scoped to.
pub struct HttpFetcher {
    client: reqwest::Client,
    credentials: ScopedCredentials,
}

impl HttpFetcher {
    /// Create a fetcher carrying the given credential scopes
    pub fn new(credentials: ScopedCredentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            // Redirects are handled manually below so the credential
            // same-origin check sees every hop.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| RepoError::FetchFailed {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// Create a fetcher without credentials (public repositories)
    pub fn public() -> Result<Self> {
        Self::new(ScopedCredentials::default())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, deadline: Duration) -> Result<Vec<u8>> {
        let started = std::time::Instant::now();
        let original_url = url.to_string();
        let mut current_url = url.to_string();
        let mut redirects = 0;

        loop {
            let remaining = deadline
                .checked_sub(started.elapsed())
                .ok_or_else(|| RepoError::FetchFailed {
                    url: original_url.clone(),
                    message: format!("deadline of {}s exceeded", deadline.as_secs()),
                })?;

            let mut request = self.client.get(&current_url).timeout(remaining);

            if ScopedCredentials::same_origin(&original_url, &current_url) {
                if let Some(creds) = self.credentials.for_url(&current_url) {
                    request = request.header("Authorization", creds.auth_header());
                }
            } else {
                tracing::warn!(
                    "cross-origin redirect from {} to {} - credentials not forwarded",
                    original_url,
                    current_url
                );
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_redirection() {
                redirects += 1;
                if redirects > MAX_REDIRECTS {
                    return Err(RepoError::FetchFailed {
                        url: original_url,
                        message: format!("too many redirects (max {})", MAX_REDIRECTS),
                    });
                }
                let location = response
                    .headers()
                    .get("Location")
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| RepoError::FetchFailed {
                        url: current_url.clone(),
                        message: "redirect without Location header".to_string(),
                    })?;
                let base = Url::parse(&current_url).map_err(|e| RepoError::FetchFailed {
                    url: current_url.clone(),
                    message: e.to_string(),
                })?;
                let next = base.join(location).map_err(|e| RepoError::FetchFailed {
                    url: current_url.clone(),
                    message: e.to_string(),
                })?;
                current_url = next.to_string();
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(RepoError::AuthFailed {
                    message: format!("access denied to {}", current_url),
                });
            }
            if !status.is_success() {
                return Err(RepoError::HttpStatus {
                    status: status.as_u16(),
                    url: current_url,
                });
            }

            let bytes = response.bytes().await.map_err(|e| RepoError::FetchFailed {
                url: current_url.clone(),
                message: e.to_string(),
            })?;
            return Ok(bytes.to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"apiVersion: v1".to_vec()))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::public().unwrap();
        let bytes = fetcher
            .fetch(&format!("{}/index.yaml", server.uri()), DEFAULT_FETCH_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(bytes, b"apiVersion: v1");
    }

    #[tokio::test]
    async fn test_fetch_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::public().unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", server.uri()), DEFAULT_FETCH_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_follows_same_origin_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"moved".to_vec()))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::public().unwrap();
        let bytes = fetcher
            .fetch(&format!("{}/old", server.uri()), DEFAULT_FETCH_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(bytes, b"moved");
    }
}

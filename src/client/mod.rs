//! Secure HTTP client for the Mesos API.
//!
//! Every request goes through [`HttpClient::fetch`], which:
//! - verifies TLS against the configured [`CertPool`] (system roots when empty),
//! - bounds the whole exchange, redirects and body included, by one timeout,
//! - follows redirects hop by hop, only to hosts in [`TrustedRedirects`],
//!   re-attaching [`Credentials`] to each trusted hop.
//!
//! A redirect to any other host is not followed: the redirect response itself
//! is returned and a warning is logged.

pub mod auth;
pub mod error;
pub mod redirect;
pub mod trust;

pub use auth::Credentials;
pub use error::FetchError;
pub use trust::{CertPool, TrustedRedirects};

use redirect::{Hop, MAX_REDIRECTS};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};
use url::Url;

/// A response as obtained, after the redirect policy has run.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// URL of the last request actually sent.
    pub url: Url,
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Settings shared by every client built for one target.
#[derive(Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub credentials: Option<Credentials>,
    pub cert_pool: Arc<CertPool>,
    pub trusted_redirects: Arc<TrustedRedirects>,
}

impl ClientConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            credentials: None,
            cert_pool: Arc::new(CertPool::default()),
            trusted_redirects: Arc::new(TrustedRedirects::default()),
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn with_cert_pool(mut self, pool: Arc<CertPool>) -> Self {
        self.cert_pool = pool;
        self
    }

    #[must_use]
    pub fn with_trusted_redirects(mut self, trusted: Arc<TrustedRedirects>) -> Self {
        self.trusted_redirects = trusted;
        self
    }
}

/// HTTP client bound to one Mesos base URL. Cheap to clone.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    credentials: Option<Credentials>,
    trusted_redirects: Arc<TrustedRedirects>,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns [`FetchError::Build`] if the TLS backend rejects the configuration.
    pub fn new(base_url: Url, config: &ClientConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));

        if !config.cert_pool.is_empty() {
            builder = builder.tls_built_in_root_certs(false);
            for cert in config.cert_pool.certificates() {
                builder = builder.add_root_certificate(cert.clone());
            }
        }

        let inner = builder.build().map_err(FetchError::Build)?;

        Ok(Self {
            inner,
            base_url,
            timeout: config.timeout,
            credentials: config.credentials.clone(),
            trusted_redirects: Arc::clone(&config.trusted_redirects),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL (trailing slash trimmed) followed by `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the result doesn't parse.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, FetchError> {
        let raw = format!("{}{path}", self.base_url.as_str().trim_end_matches('/'));
        Url::parse(&raw).map_err(|source| FetchError::InvalidUrl { url: raw, source })
    }

    /// GET `url`, applying the redirect policy on every hop.
    ///
    /// The status is not checked here; a 5xx or an unfollowed redirect is
    /// returned like any other response.
    ///
    /// # Errors
    ///
    /// Transport and TLS failures, the timeout, an unusable `Location` header,
    /// or too many redirects.
    #[instrument(skip(self, url), level = "debug", fields(url = %url), err)]
    pub async fn fetch(&self, url: Url) -> Result<Fetched, FetchError> {
        match timeout(self.timeout, self.follow(url.clone())).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url,
                timeout: self.timeout,
            }),
        }
    }

    async fn follow(&self, mut url: Url) -> Result<Fetched, FetchError> {
        let mut hops = 0;

        loop {
            let mut request = self.inner.get(url.clone());
            if let Some(credentials) = &self.credentials {
                request = credentials.apply(request);
            }

            let response = request
                .send()
                .await
                .map_err(|source| FetchError::Transport {
                    url: url.clone(),
                    source,
                })?;

            let status = response.status();

            let hop = redirect::next_hop(
                &url,
                status,
                response.headers(),
                &self.trusted_redirects,
            )
            .map_err(|reason| FetchError::Redirect {
                url: url.clone(),
                reason,
            })?;

            match hop {
                Hop::Done => {}
                Hop::Untrusted { target, host } => {
                    warn!(%host, %target, "Redirect to '{host}' not trusted");
                }
                Hop::Follow(target) => {
                    hops += 1;
                    if hops > MAX_REDIRECTS {
                        return Err(FetchError::TooManyRedirects(MAX_REDIRECTS));
                    }
                    debug!(from = %url, to = %target, "following trusted redirect");
                    url = target;
                    continue;
                }
            }

            let body = response
                .bytes()
                .await
                .map_err(|source| FetchError::Transport {
                    url: url.clone(),
                    source,
                })?
                .to_vec();

            return Ok(Fetched { url, status, body });
        }
    }

    /// Fetch `path` relative to the base URL and decode the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Any [`fetch`](Self::fetch) error, a non-2xx status, or a body that
    /// doesn't decode into `T`.
    pub async fn fetch_and_decode<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.endpoint_url(path)?;
        debug!("Fetching url: {url}");

        let fetched = self.fetch(url).await?;

        if !fetched.status.is_success() {
            return Err(FetchError::Status {
                url: fetched.url,
                status: fetched.status,
            });
        }

        serde_json::from_slice(&fetched.body).map_err(|source| FetchError::Decode {
            url: fetched.url,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpClient {
        let config = ClientConfig::new(Duration::from_secs(5));
        HttpClient::new(Url::parse(base).expect("valid url"), &config).expect("client")
    }

    #[test]
    fn test_endpoint_url_trims_trailing_slash() -> Result<(), FetchError> {
        let c = client("http://agent.mesos:5051/");
        assert_eq!(
            c.endpoint_url("/monitor/statistics")?.as_str(),
            "http://agent.mesos:5051/monitor/statistics"
        );
        Ok(())
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() -> Result<(), FetchError> {
        let c = client("https://dcos.example.com/mesos");
        assert_eq!(
            c.endpoint_url("/metrics/snapshot")?.as_str(),
            "https://dcos.example.com/mesos/metrics/snapshot"
        );
        Ok(())
    }

    #[test]
    fn test_config_builders() {
        let creds = Credentials::from_parts(
            Some("admin".into()),
            Some(secrecy::SecretString::from("secret")),
        );
        let config = ClientConfig::new(Duration::from_secs(2))
            .with_credentials(creds)
            .with_trusted_redirects(Arc::new(TrustedRedirects::new(["leader.mesos"])));

        assert_eq!(config.timeout, Duration::from_secs(2));
        assert!(config.credentials.is_some());
        assert!(config.trusted_redirects.contains("leader.mesos"));
        assert!(config.cert_pool.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport_error() -> Result<(), FetchError> {
        // Port 9 (discard) is not expected to be listening on localhost.
        let c = client("http://127.0.0.1:9");
        let err = c
            .fetch_and_decode::<serde_json::Value>("/metrics/snapshot")
            .await
            .err();

        assert!(matches!(
            err,
            Some(FetchError::Transport { .. } | FetchError::Timeout { .. })
        ));
        Ok(())
    }
}

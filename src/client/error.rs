use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

/// Errors returned by [`HttpClient`](super::HttpClient).
///
/// Every variant is recoverable at the collector boundary: the collector logs
/// it, counts it and emits nothing for the current scrape.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {}s", .timeout.as_secs_f64())]
    Timeout { url: Url, timeout: Duration },

    #[error("invalid redirect from {url}: {reason}")]
    Redirect { url: Url, reason: String },

    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),

    #[error("unexpected status {status} from {url}")]
    Status { url: Url, status: StatusCode },

    #[error("error decoding response body from {url}: {source}")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_names_url_and_status() -> Result<(), url::ParseError> {
        let err = FetchError::Status {
            url: Url::parse("http://mesos:5051/monitor/statistics")?,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };

        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("http://mesos:5051/monitor/statistics"));
        Ok(())
    }

    #[test]
    fn test_timeout_error_message() -> Result<(), url::ParseError> {
        let err = FetchError::Timeout {
            url: Url::parse("http://mesos:5050/metrics/snapshot")?,
            timeout: Duration::from_millis(1500),
        };

        assert_eq!(
            err.to_string(),
            "request to http://mesos:5050/metrics/snapshot timed out after 1.5s"
        );
        Ok(())
    }

    #[test]
    fn test_too_many_redirects_message() {
        assert_eq!(
            FetchError::TooManyRedirects(10).to_string(),
            "stopped after 10 redirects"
        );
    }
}

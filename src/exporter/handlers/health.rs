use crate::exporter::{GIT_COMMIT_HASH, Upstream};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    role: String,
    upstream: String,
}

// Probe the upstream process through the same client the collectors use
async fn check_upstream_health(upstream: &Upstream) -> Result<(), StatusCode> {
    let url = upstream.client.endpoint_url("/health").map_err(|e| {
        error!("Failed to build upstream health URL: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    match upstream.client.fetch(url).await {
        Ok(response) if response.status.is_success() => Ok(()),
        Ok(response) => {
            error!(
                "Upstream {} health check returned {}",
                upstream.role, response.status
            );
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
        Err(e) => {
            error!("Upstream {} health check failed: {}", upstream.role, e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

fn create_health_response(upstream: &Upstream, result: &Result<(), StatusCode>) -> Health {
    Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        role: upstream.role.to_string(),
        upstream: if result.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    }
}

fn create_response_body(method: &Method, health: &Health) -> Body {
    if method == Method::GET {
        Json(health).into_response().into_body()
    } else {
        Body::empty()
    }
}

fn create_app_headers(health: &Health) -> HeaderMap {
    let short_hash = health.commit.get(0..7).unwrap_or("");

    let header_value = format!("{}:{}:{}", health.name, health.version, short_hash);

    match header_value.parse::<HeaderValue>() {
        Ok(x_app_header_value) => {
            debug!("X-App header: {:?}", x_app_header_value);
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        }
        Err(err) => {
            debug!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        }
    }
}

pub async fn health(method: Method, Extension(upstream): Extension<Upstream>) -> impl IntoResponse {
    let result = check_upstream_health(&upstream).await;
    let health = create_health_response(&upstream, &result);
    let body = create_response_body(&method, &health);
    let headers = create_app_headers(&health);

    match result {
        Ok(()) => {
            debug!("Upstream is healthy");
            (StatusCode::OK, headers, body)
        }
        Err(status_code) => {
            debug!("Upstream is unhealthy");
            (status_code, headers, body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health(commit: &str, upstream: &str) -> Health {
        Health {
            commit: commit.to_string(),
            name: "mesos_exporter".to_string(),
            version: "0.1.0".to_string(),
            role: "slave".to_string(),
            upstream: upstream.to_string(),
        }
    }

    #[test]
    fn test_app_header_uses_short_hash() {
        let headers = create_app_headers(&health("0123456789abcdef", "ok"));
        assert_eq!(
            headers.get("X-App").and_then(|v| v.to_str().ok()),
            Some("mesos_exporter:0.1.0:0123456")
        );
    }

    #[test]
    fn test_app_header_without_hash() {
        let headers = create_app_headers(&health(":-(", "ok"));
        assert_eq!(
            headers.get("X-App").and_then(|v| v.to_str().ok()),
            Some("mesos_exporter:0.1.0:")
        );
    }

    #[test]
    fn test_options_has_empty_body() {
        let body = create_response_body(&Method::OPTIONS, &health("abc", "ok"));
        assert_eq!(axum::body::HttpBody::size_hint(&body).exact(), Some(0));
    }
}

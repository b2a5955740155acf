use crate::{
    cli::{
        actions::{ClientSettings, Target},
        telemetry::shutdown_tracer,
    },
    client::{CertPool, ClientConfig, HttpClient, TrustedRedirects},
    collectors::{Role, config::CollectorConfig, registry::CollectorRegistry},
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::{Next, from_fn},
    response::Response,
    routing::get,
};
use opentelemetry::global;
use opentelemetry::trace::{TraceContextExt, TraceId};
use opentelemetry_http::HeaderExtractor;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use ulid::Ulid;

mod handlers;
mod shutdown;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = if let Some(hash) = built_info::GIT_COMMIT_HASH {
    hash
} else {
    ":-("
};

/// The scraped process, shared with the health handler.
#[derive(Clone)]
pub struct Upstream {
    pub client: HttpClient,
    pub role: Role,
}

/// Build the secure client for `target` from the command line settings.
///
/// # Errors
///
/// Unreadable or invalid certificate files are fatal, as is a TLS setup the
/// backend rejects.
pub fn build_client(target: &Target, settings: &ClientSettings) -> Result<HttpClient> {
    let cert_pool = CertPool::from_pem_files(&settings.cert_files)?;
    if !cert_pool.is_empty() {
        info!(
            "Trusting {} certificate(s) instead of the system roots",
            cert_pool.len()
        );
    }

    let trusted_redirects = TrustedRedirects::new(&settings.trusted_redirects);

    let config = ClientConfig::new(settings.timeout)
        .with_credentials(settings.credentials.clone())
        .with_cert_pool(Arc::new(cert_pool))
        .with_trusted_redirects(Arc::new(trusted_redirects));

    HttpClient::new(target.url.clone(), &config).context("Failed to build HTTP client")
}

/// Build the app routes for an already configured client and registry.
pub fn router(upstream: Upstream, registry: CollectorRegistry) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(make_span)
        .on_response(on_response);

    Router::new()
        .route("/", get(handlers::index))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(trace_layer)
                .layer(from_fn(add_trace_headers))
                .layer(Extension(upstream))
                .layer(Extension(registry)),
        )
}

/// Start the exporter and serve until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the client, the collectors or the listener can't be
/// set up.
pub async fn new(
    port: u16,
    listen: Option<String>,
    target: Target,
    settings: ClientSettings,
    collectors: Vec<String>,
) -> Result<()> {
    let client = build_client(&target, &settings)?;

    let config = CollectorConfig::new().with_enabled(&collectors);
    let registry = CollectorRegistry::new(&config, client.clone(), target.role)?;

    let active = registry.collector_names();

    let app = router(
        Upstream {
            client,
            role: target.role,
        },
        registry,
    );

    let (listener, bind_addr) = bind(port, listen.as_deref()).await?;

    println!(
        "{} {} - Listening on {bind_addr}\n\nMesos {}: {}\n\nEnabled collectors:\n{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        target.role,
        target.url,
        format_list(&active),
    );

    if !settings.trusted_redirects.is_empty() {
        println!(
            "\nTrusted redirects:\n{}",
            format_list(&settings.trusted_redirects)
        );
    }

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
    {
        error!(error=%e, "server error");
    }

    info!("shutting down");

    shutdown_tracer();

    Ok(())
}

async fn bind(port: u16, listen: Option<&str>) -> Result<(TcpListener, String)> {
    if let Some(addr) = listen {
        let ip = addr.parse::<std::net::IpAddr>().map_err(|_| {
            anyhow!(
                "Invalid IP address: '{addr}'. Expected IPv4 (e.g., 0.0.0.0, 127.0.0.1) or IPv6 (e.g., ::, ::1)"
            )
        })?;

        let bind_addr = std::net::SocketAddr::new(ip, port);
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {bind_addr}"))?;

        return Ok((listener, bind_addr.to_string()));
    }

    // Auto: try IPv6 first, fallback to IPv4
    match TcpListener::bind(format!("[::]:{port}")).await {
        Ok(l) => Ok((l, format!("[::]:{port}"))),
        Err(_) => {
            let bind_addr = format!("0.0.0.0:{port}");
            let listener = TcpListener::bind(&bind_addr)
                .await
                .with_context(|| format!("Failed to bind to {bind_addr}"))?;
            Ok((listener, bind_addr))
        }
    }
}

// Helper to format a list of items with a leading dash and indentation for the
// start up message
fn format_list<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn make_span(request: &Request<Body>) -> Span {
    let parent_cx =
        global::get_text_map_propagator(|prop| prop.extract(&HeaderExtractor(request.headers())));

    let method = request.method().as_str();

    let path = request.uri().path();

    let target = request.uri().to_string();

    let scheme = request.uri().scheme_str().unwrap_or("http");

    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let span = info_span!(
        "http.server.request",
        otel.kind = "server",
        otel.status_code = tracing::field::Empty,
        http.method = method,
        http.route = path,
        http.target = target,
        http.scheme = scheme,
        http.user_agent = user_agent,
        request_id = request_id,
    );

    let _ = span.set_parent(parent_cx);

    span
}

fn on_response<B>(response: &axum::http::Response<B>, latency: Duration, span: &Span) {
    if response.status().is_server_error() {
        span.record("otel.status_code", "ERROR");
    } else {
        span.record("otel.status_code", "OK");
    }

    let elapsed_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);

    let cx = span.context();
    let trace_id = cx.span().span_context().trace_id();

    if trace_id == TraceId::INVALID {
        info!(
            parent: span,
            status = response.status().as_u16(),
            elapsed_ms,
            "request completed"
        );
    } else {
        info!(
            parent: span,
            status = response.status().as_u16(),
            elapsed_ms,
            trace_id = %trace_id,
            "request completed"
        );
    }
}

async fn add_trace_headers(req: Request<Body>, next: Next) -> Response {
    let mut res = next.run(req).await;

    let span = Span::current();

    let cx = span.context();

    // Clone the SpanContext to avoid borrowing a temporary
    let span_context = cx.span().span_context().clone();

    if span_context.is_valid()
        && let Ok(val) = HeaderValue::from_str(&span_context.trace_id().to_string())
    {
        res.headers_mut()
            .insert(HeaderName::from_static("x-trace-id"), val);
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Response, StatusCode};
    use std::path::PathBuf;
    use url::Url;

    fn settings() -> ClientSettings {
        ClientSettings {
            timeout: Duration::from_secs(1),
            cert_files: Vec::new(),
            trusted_redirects: vec!["leader.mesos".to_string()],
            credentials: None,
        }
    }

    fn target() -> Target {
        Target {
            role: Role::Master,
            url: Url::parse("http://leader.mesos:5050").expect("valid url"),
        }
    }

    #[test]
    fn test_git_commit_hash_exists() {
        let is_hex = GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit());
        let is_fallback = GIT_COMMIT_HASH == ":-(";

        assert!(GIT_COMMIT_HASH.len() >= 3);
        assert!(is_hex || is_fallback);
    }

    #[test]
    fn test_format_list() {
        assert_eq!(format_list::<String>(&[]), "");
        assert_eq!(format_list(&["monitor"]), "  - monitor");
        assert_eq!(
            format_list(&["monitor", "snapshot"]),
            "  - monitor\n  - snapshot"
        );
    }

    #[test]
    fn test_build_client() -> Result<()> {
        let client = build_client(&target(), &settings())?;
        assert_eq!(client.base_url().as_str(), "http://leader.mesos:5050/");
        Ok(())
    }

    #[test]
    fn test_build_client_missing_cert_is_fatal() {
        let mut settings = settings();
        settings.cert_files = vec![PathBuf::from("/nonexistent/ca.pem")];

        let err = build_client(&target(), &settings).err().map(|e| format!("{e:#}"));
        assert!(
            err.is_some_and(|e| e.contains("/nonexistent/ca.pem")),
            "missing certificate file should fail with its path"
        );
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_ip() {
        assert!(bind(0, Some("not-an-ip")).await.is_err());
    }

    #[tokio::test]
    async fn test_bind_explicit_ip() -> Result<()> {
        let (listener, addr) = bind(0, Some("127.0.0.1")).await?;
        assert!(addr.starts_with("127.0.0.1:"));
        assert!(listener.local_addr()?.ip().is_loopback());
        Ok(())
    }

    #[test]
    fn test_on_response_status_codes() {
        let span = info_span!("test");
        let latency = Duration::from_millis(100);

        let ok = Response::builder()
            .status(StatusCode::OK)
            .body(())
            .expect("response");
        on_response(&ok, latency, &span);

        let err = Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(())
            .expect("response");
        on_response(&err, latency, &span);
    }

    #[test]
    fn test_make_span_creates_span() {
        let request = Request::builder()
            .method("GET")
            .uri("/metrics")
            .header("x-request-id", "test-id-12345")
            .header("user-agent", "prometheus")
            .body(Body::empty())
            .expect("request");

        let span = make_span(&request);

        // Disabled when no subscriber is installed
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "http.server.request");
        }
    }
}

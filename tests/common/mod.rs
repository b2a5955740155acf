#![allow(dead_code)]

use anyhow::Result;
use mesos_exporter::cli::actions::{ClientSettings, Target};
use mesos_exporter::client::{ClientConfig, Credentials, HttpClient, TrustedRedirects};
use mesos_exporter::collectors::{CollectorContext, Role};
use prometheus::IntCounter;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

pub const USERNAME: &str = "ops";
pub const PASSWORD: &str = "s3cret";
/// `Basic base64("ops:s3cret")`
pub const BASIC_AUTH: &str = "Basic b3BzOnMzY3JldA==";

/// Find an available port for testing (returns port > 1024)
pub fn get_available_port() -> u16 {
    use std::net::TcpListener;

    // Bind to port 0 lets the OS assign an available ephemeral port
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let port = listener
        .local_addr()
        .expect("Failed to get local addr")
        .port();

    assert!(port > 1024, "Assigned port {port} should be > 1024");

    port
}

/// Wait for server to be ready on the given port
///
/// # Arguments
/// * `port` - The port number to connect to
/// * `max_attempts` - Maximum number of connection attempts (e.g., 50 = 5 seconds at 100ms intervals)
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    use tokio::time::{Duration, sleep};

    for attempt in 1..=max_attempts {
        if tokio::net::TcpStream::connect(format!("127.0.0.1:{port}"))
            .await
            .is_ok()
        {
            return true;
        }

        if attempt % 10 == 0 {
            eprintln!("Still waiting for server on port {port} (attempt {attempt}/{max_attempts})");
        }

        sleep(Duration::from_millis(100)).await;
    }

    eprintln!("Failed to connect to server on port {port} after {max_attempts} attempts");
    false
}

/// Get base URL for test server
pub fn get_test_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

pub fn credentials() -> Option<Credentials> {
    Credentials::from_parts(
        Some(USERNAME.to_string()),
        Some(SecretString::from(PASSWORD)),
    )
}

/// Client for `base` with a short timeout and the given trust settings.
pub fn client(
    base: &str,
    trusted: &[&str],
    credentials: Option<Credentials>,
) -> Result<HttpClient> {
    let config = ClientConfig::new(Duration::from_secs(2))
        .with_credentials(credentials)
        .with_trusted_redirects(Arc::new(TrustedRedirects::new(trusted)));

    Ok(HttpClient::new(Url::parse(base)?, &config)?)
}

/// Collector context against `base`, with a fresh error counter.
pub fn context(base: &str, role: Role) -> Result<(CollectorContext, IntCounter)> {
    let errors = IntCounter::new("test_collector_errors_total", "test errors")?;
    let ctx = CollectorContext {
        client: client(base, &[], None)?,
        role,
        errors: errors.clone(),
    };
    Ok((ctx, errors))
}

pub fn settings() -> ClientSettings {
    ClientSettings {
        timeout: Duration::from_secs(2),
        cert_files: Vec::new(),
        trusted_redirects: Vec::new(),
        credentials: None,
    }
}

/// Run the exporter on 127.0.0.1:`port` against `upstream`.
pub fn spawn_exporter(
    port: u16,
    role: Role,
    upstream: &str,
    collectors: &[&str],
) -> Result<JoinHandle<Result<()>>> {
    let target = Target {
        role,
        url: Url::parse(upstream)?,
    };
    let collectors: Vec<String> = collectors.iter().map(ToString::to_string).collect();

    Ok(tokio::spawn(async move {
        mesos_exporter::exporter::new(
            port,
            Some("127.0.0.1".to_string()),
            target,
            settings(),
            collectors,
        )
        .await
    }))
}

pub const EXECUTORS: &str = r#"[
  {
    "executor_id": "e1",
    "executor_name": "Command Executor",
    "framework_id": "f1",
    "source": "s1",
    "statistics": {
      "cpus_limit": 2.0,
      "cpus_system_time_secs": 1.5,
      "cpus_user_time_secs": 12.25,
      "mem_limit_bytes": 268435456,
      "mem_rss_bytes": 1048576,
      "net_rx_bytes": 100,
      "net_tx_bytes": 200,
      "timestamp": 1700000000.0
    }
  }
]"#;

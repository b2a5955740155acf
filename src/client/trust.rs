//! Trust configuration shared by every outbound request:
//! - `CertPool`: trust anchors loaded from PEM files, replacing the system roots.
//! - `TrustedRedirects`: hosts allowed to receive followed redirects (and credentials).

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use x509_parser::pem::Pem;

/// A parsed trust anchor.
#[derive(Clone)]
struct Anchor {
    subject: String,
    not_after: i64,
    certificate: reqwest::Certificate,
}

/// Certificates trusted for TLS connections to Mesos endpoints.
///
/// Built once at startup. An empty pool means "use the system roots".
#[derive(Clone, Default)]
pub struct CertPool {
    anchors: Vec<Anchor>,
}

impl CertPool {
    /// Load every certificate from the given PEM files.
    ///
    /// # Errors
    ///
    /// Returns an error if a file can't be read or contains no parseable
    /// certificate. Callers treat this as a startup failure.
    pub fn from_pem_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut anchors = Vec::new();

        for path in paths {
            let path = path.as_ref();
            let data = fs::read(path)
                .with_context(|| format!("Failed to read certificate file {}", path.display()))?;

            let parsed = parse_pem_certificates(&data)
                .with_context(|| format!("Error parsing .pem file {}", path.display()))?;

            info!(
                "Loaded {} trusted certificate(s) from {}",
                parsed.len(),
                path.display()
            );

            anchors.extend(parsed);
        }

        let now = Utc::now().timestamp();
        for anchor in &anchors {
            if anchor.not_after < now {
                warn!(
                    subject = %anchor.subject,
                    not_after = %format_timestamp(anchor.not_after),
                    "trusted certificate has expired"
                );
            }
        }

        Ok(Self { anchors })
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Subjects of the loaded certificates, in load order.
    pub fn subjects(&self) -> Vec<&str> {
        self.anchors.iter().map(|a| a.subject.as_str()).collect()
    }

    pub(crate) fn certificates(&self) -> impl Iterator<Item = &reqwest::Certificate> {
        self.anchors.iter().map(|a| &a.certificate)
    }
}

// Blocks that aren't certificates or fail to parse are skipped; parsing stops
// at the first malformed PEM envelope.
fn parse_pem_certificates(data: &[u8]) -> Result<Vec<Anchor>> {
    let mut anchors = Vec::new();

    for pem in Pem::iter_from_buffer(data) {
        let pem: Pem = match pem {
            Ok(pem) => pem,
            Err(e) => {
                debug!("Stopped reading PEM data: {e:?}");
                break;
            }
        };

        if pem.label != "CERTIFICATE" {
            debug!("Skipping PEM block with label {}", pem.label);
            continue;
        }

        let (subject, not_after) = match pem.parse_x509() {
            Ok(cert) => (
                cert.subject().to_string(),
                cert.validity().not_after.timestamp(),
            ),
            Err(e) => {
                debug!("Skipping unparseable certificate: {e:?}");
                continue;
            }
        };

        let certificate = reqwest::Certificate::from_der(&pem.contents)?;

        anchors.push(Anchor {
            subject,
            not_after,
            certificate,
        });
    }

    if anchors.is_empty() {
        return Err(anyhow!("no certificates found"));
    }

    Ok(anchors)
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0).map_or_else(|| "invalid".to_string(), |dt| dt.to_rfc3339())
}

/// Hostnames (no ports, no wildcards) that redirects may be followed to.
#[derive(Clone, Debug, Default)]
pub struct TrustedRedirects {
    hosts: HashSet<String>,
}

impl TrustedRedirects {
    /// Never fails; blank entries are ignored and names are compared
    /// case-insensitively, matching how `url` normalizes hosts.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        Self { hosts }
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(&host.to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn self_signed_pem(host: &str) -> String {
        rcgen::generate_simple_self_signed(vec![host.to_string()])
            .expect("generate certificate")
            .cert
            .pem()
    }

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn test_trusted_redirects_empty() {
        let trusted = TrustedRedirects::new(Vec::<String>::new());
        assert!(trusted.is_empty());
        assert!(!trusted.contains("mesos-master"));
    }

    #[test]
    fn test_trusted_redirects_normalizes_entries() {
        let trusted = TrustedRedirects::new(["  Leader.Mesos ", "", "10.0.0.7"]);

        assert_eq!(trusted.len(), 2);
        assert!(trusted.contains("leader.mesos"));
        assert!(trusted.contains("LEADER.mesos"));
        assert!(trusted.contains("10.0.0.7"));
        assert!(!trusted.contains("10.0.0.8"));
    }

    #[test]
    fn test_trusted_redirects_no_wildcards_or_ports() {
        let trusted = TrustedRedirects::new(["*.mesos", "master:5050"]);

        assert!(!trusted.contains("leader.mesos"));
        assert!(!trusted.contains("master"));
    }

    #[test]
    fn test_cert_pool_loads_certificates() -> Result<()> {
        let bundle = format!(
            "{}{}",
            self_signed_pem("master.mesos"),
            self_signed_pem("agent.mesos")
        );
        let file = write_temp(&bundle);

        let pool = CertPool::from_pem_files(&[file.path()])?;

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.certificates().count(), 2);
        assert!(pool.subjects().iter().all(|s| s.contains("rcgen")));
        Ok(())
    }

    #[test]
    fn test_cert_pool_skips_non_certificate_blocks() -> Result<()> {
        let key = rcgen::KeyPair::generate().expect("generate key");
        let bundle = format!("{}{}", key.serialize_pem(), self_signed_pem("master.mesos"));
        let file = write_temp(&bundle);

        let pool = CertPool::from_pem_files(&[file.path()])?;

        assert_eq!(pool.len(), 1);
        Ok(())
    }

    #[test]
    fn test_cert_pool_missing_file_fails() {
        let result = CertPool::from_pem_files(&["/nonexistent/mesos-ca.pem"]);

        let err = result.err().expect("missing file should fail");
        assert!(err.to_string().contains("/nonexistent/mesos-ca.pem"));
    }

    #[test]
    fn test_cert_pool_file_without_certificates_fails() {
        let file = write_temp("this is not a certificate\n");

        let result = CertPool::from_pem_files(&[file.path()]);

        let err = result.err().expect("garbage file should fail");
        assert!(format!("{err:#}").contains("no certificates found"));
    }

    #[test]
    fn test_cert_pool_fails_if_any_file_is_bad() {
        let good = write_temp(&self_signed_pem("master.mesos"));
        let bad = write_temp("");

        let result = CertPool::from_pem_files(&[good.path(), bad.path()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cert_pool_empty_input() -> Result<()> {
        let pool = CertPool::from_pem_files::<&str>(&[])?;
        assert!(pool.is_empty());
        Ok(())
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00+00:00");
    }
}

use super::trust::TrustedRedirects;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION};
use url::{Host, Url};

/// Hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// What to do with a response, evaluated once per hop.
#[derive(Debug, PartialEq, Eq)]
pub enum Hop {
    /// Not a redirect, or a redirect without a `Location`: hand the response back.
    Done,
    /// Follow to a trusted host; credentials may be re-attached.
    Follow(Url),
    /// Redirect to a host outside the allow-list: hand the redirect response back.
    Untrusted { target: Url, host: String },
}

pub fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Host part of a URL without brackets or port, the form redirect targets are
/// matched on.
pub fn hostname(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_string()),
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

/// Decide the next hop for a response received from `current`.
///
/// # Errors
///
/// Returns a description of the problem when `Location` is present but can't
/// be used as a URL.
pub fn next_hop(
    current: &Url,
    status: StatusCode,
    headers: &HeaderMap,
    trusted: &TrustedRedirects,
) -> Result<Hop, String> {
    if !is_redirect(status) {
        return Ok(Hop::Done);
    }

    let Some(location) = headers.get(LOCATION) else {
        return Ok(Hop::Done);
    };

    let location = location
        .to_str()
        .map_err(|e| format!("Location header is not valid UTF-8: {e}"))?;

    let target = current
        .join(location)
        .map_err(|e| format!("failed to parse Location header {location:?}: {e}"))?;

    let host = hostname(&target).unwrap_or_default();

    if trusted.contains(&host) {
        Ok(Hop::Follow(target))
    } else {
        Ok(Hop::Untrusted { target, host })
    }
}

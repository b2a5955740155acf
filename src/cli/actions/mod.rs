pub mod run;

use crate::client::Credentials;
use crate::collectors::Role;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// The Mesos process to scrape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub role: Role,
    pub url: Url,
}

/// How to talk to the target: timeout, trust and credentials.
#[derive(Clone, Debug)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub cert_files: Vec<PathBuf>,
    pub trusted_redirects: Vec<String>,
    pub credentials: Option<Credentials>,
}

#[derive(Debug)]
pub enum Action {
    Run {
        port: u16,
        listen: Option<String>,
        target: Target,
        client: ClientSettings,
        collectors: Vec<String>,
    },
}

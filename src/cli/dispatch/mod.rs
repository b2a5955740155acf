use crate::{
    cli::actions::{Action, ClientSettings, Target},
    client::Credentials,
    collectors::{COLLECTOR_NAMES, Role, default_enabled},
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Turn parsed arguments into the action to run.
///
/// # Errors
///
/// Returns an error for a missing or unparseable target URL.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    // Get the port or return an error
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .ok_or_else(|| anyhow!("Port is required. Please provide it using the --port flag."))?;

    // Get the listen address (None means auto-detect)
    let listen = matches.get_one::<String>("listen").map(ToString::to_string);

    let target = get_target(matches)?;

    info!("Scraping Mesos {} at {}", target.role, target.url);

    Ok(Action::Run {
        port,
        listen,
        target,
        client: get_client_settings(matches),
        collectors: get_enabled_collectors(matches),
    })
}

fn get_target(matches: &ArgMatches) -> Result<Target> {
    let (role, raw) = if let Some(url) = matches.get_one::<String>("master") {
        (Role::Master, url)
    } else if let Some(url) = matches.get_one::<String>("slave") {
        (Role::Slave, url)
    } else {
        return Err(anyhow!(
            "A target is required. Please provide it using the --master or --slave flag."
        ));
    };

    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid {role} URL '{raw}'"))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "Invalid {role} URL '{raw}': scheme must be http or https"
        ));
    }

    Ok(Target { role, url })
}

fn get_list(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|vals| {
            vals.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn get_client_settings(matches: &ArgMatches) -> ClientSettings {
    let timeout = matches
        .get_one::<Duration>("timeout")
        .copied()
        .unwrap_or(Duration::from_secs(5));

    let username = matches.get_one::<String>("username").cloned();
    let password = matches
        .get_one::<String>("password")
        .map(|p| SecretString::from(p.as_str()));

    let has_username = username.as_deref().is_some_and(|u| !u.is_empty());
    let has_password = password.is_some();

    let credentials = Credentials::from_parts(username, password);
    if credentials.is_none() && (has_username || has_password) {
        warn!("Ignoring credentials: both --username and --password are required");
    }

    ClientSettings {
        timeout,
        cert_files: get_list(matches, "trusted-certs")
            .into_iter()
            .map(PathBuf::from)
            .collect(),
        trusted_redirects: get_list(matches, "trusted-redirects"),
        credentials,
    }
}

pub fn get_enabled_collectors(matches: &ArgMatches) -> Vec<String> {
    COLLECTOR_NAMES
        .iter()
        .filter(|&name| {
            // If explicitly disabled, skip it
            if matches.get_flag(&format!("no-collector.{name}")) {
                return false;
            }

            // If explicitly enabled, include it
            if matches.get_flag(&format!("collector.{name}")) {
                return true;
            }

            default_enabled(name)
        })
        .map(|&name| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    const CLEAN_ENV: [(&str, Option<&str>); 6] = [
        ("MESOS_EXPORTER_MASTER", None),
        ("MESOS_EXPORTER_SLAVE", None),
        ("MESOS_EXPORTER_USERNAME", None),
        ("MESOS_EXPORTER_PASSWORD", None),
        ("MESOS_EXPORTER_TRUSTED_CERTS", None),
        ("MESOS_EXPORTER_TRUSTED_REDIRECTS", None),
    ];

    fn run(args: &[&str]) -> Result<Action> {
        let mut argv = vec!["mesos_exporter"];
        argv.extend_from_slice(args);
        let matches = commands::new().try_get_matches_from(argv)?;
        handler(&matches)
    }

    #[test]
    fn test_handler_slave() {
        temp_env::with_vars(CLEAN_ENV, || {
            let Ok(Action::Run {
                port,
                listen,
                target,
                client,
                collectors,
            }) = run(&["--slave", "http://agent:5051", "--timeout", "3"])
            else {
                panic!("expected a run action");
            };

            assert_eq!(port, 9110);
            assert!(listen.is_none());
            assert_eq!(target.role, Role::Slave);
            assert_eq!(target.url.as_str(), "http://agent:5051/");
            assert_eq!(client.timeout, Duration::from_secs(3));
            assert!(client.cert_files.is_empty());
            assert!(client.credentials.is_none());
            assert_eq!(collectors, vec!["monitor", "snapshot"]);
        });
    }

    #[test]
    fn test_handler_master_with_trust_and_credentials() {
        temp_env::with_vars(CLEAN_ENV, || {
            let Ok(Action::Run { target, client, .. }) = run(&[
                "--master",
                "https://leader.mesos:5050",
                "--trusted-certs",
                "/etc/mesos/ca.pem, ",
                "--trusted-redirects",
                "m1.mesos,m2.mesos",
                "--username",
                "ops",
                "--password",
                "s3cret",
            ]) else {
                panic!("expected a run action");
            };

            assert_eq!(target.role, Role::Master);
            assert_eq!(client.cert_files, vec![PathBuf::from("/etc/mesos/ca.pem")]);
            assert_eq!(client.trusted_redirects, vec!["m1.mesos", "m2.mesos"]);

            let credentials = client.credentials.expect("credentials");
            assert_eq!(credentials.username(), "ops");
            assert_eq!(credentials.password().expose_secret(), "s3cret");
        });
    }

    #[test]
    fn test_username_without_password_is_ignored() {
        temp_env::with_vars(CLEAN_ENV, || {
            let Ok(Action::Run { client, .. }) =
                run(&["--slave", "http://agent:5051", "--username", "ops"])
            else {
                panic!("expected a run action");
            };

            assert!(client.credentials.is_none());
        });
    }

    #[test]
    fn test_invalid_target_url() {
        temp_env::with_vars(CLEAN_ENV, || {
            assert!(run(&["--master", "not a url"]).is_err());
            assert!(run(&["--master", "ftp://leader:5050"]).is_err());
        });
    }

    #[test]
    fn test_get_enabled_collectors_explicit_disable() {
        temp_env::with_vars(CLEAN_ENV, || {
            let matches = commands::new().get_matches_from(vec![
                "mesos_exporter",
                "--slave",
                "http://agent:5051",
                "--no-collector.monitor",
            ]);
            let enabled = get_enabled_collectors(&matches);

            assert!(!enabled.contains(&"monitor".to_string()));
            assert!(enabled.contains(&"snapshot".to_string()));
        });
    }

    #[test]
    fn test_get_enabled_collectors_disable_all() {
        temp_env::with_vars(CLEAN_ENV, || {
            let matches = commands::new().get_matches_from(vec![
                "mesos_exporter",
                "--slave",
                "http://agent:5051",
                "--no-collector.monitor",
                "--no-collector.snapshot",
            ]);

            assert!(get_enabled_collectors(&matches).is_empty());
        });
    }
}

use clap::{
    Arg, ArgAction, ArgGroup, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::time::Duration;

mod collectors;

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let cmd = Command::new("mesos_exporter")
        .about("Mesos metric exporter for Prometheus")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(format!(
            "{} {}",
            env!("CARGO_PKG_VERSION"),
            crate::exporter::GIT_COMMIT_HASH
        ))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("9110")
                .env("MESOS_EXPORTER_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("listen")
                .short('l')
                .long("listen")
                .help("IP address to bind to [default: [::]:<port>, falls back to 0.0.0.0:<port>]")
                .env("MESOS_EXPORTER_LISTEN")
                .value_name("IP"),
        )
        .arg(
            Arg::new("master")
                .long("master")
                .help("Base URL of a Mesos master")
                .env("MESOS_EXPORTER_MASTER")
                .value_name("URL"),
        )
        .arg(
            Arg::new("slave")
                .long("slave")
                .help("Base URL of a Mesos agent")
                .env("MESOS_EXPORTER_SLAVE")
                .value_name("URL"),
        )
        .group(
            ArgGroup::new("target")
                .args(["master", "slave"])
                .required(true)
                .multiple(false),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Timeout for each request to the Mesos endpoint, e.g. 5, 5s, 500ms or 1m")
                .default_value("5s")
                .env("MESOS_EXPORTER_TIMEOUT")
                .value_name("DURATION")
                .value_parser(parse_timeout),
        )
        .arg(
            Arg::new("trusted-certs")
                .long("trusted-certs")
                .help("Comma-separated list of PEM files to trust instead of the system roots")
                .env("MESOS_EXPORTER_TRUSTED_CERTS")
                .value_name("ca.pem,...")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("trusted-redirects")
                .long("trusted-redirects")
                .help("Comma-separated list of hosts that may receive credentials on redirect")
                .env("MESOS_EXPORTER_TRUSTED_REDIRECTS")
                .value_name("host1,host2,...")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("username")
                .long("username")
                .help("Username for HTTP basic authentication")
                .env("MESOS_EXPORTER_USERNAME")
                .value_name("USERNAME"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .help("Password for HTTP basic authentication")
                .env("MESOS_EXPORTER_PASSWORD")
                .hide_env_values(true)
                .value_name("PASSWORD"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase verbosity, -vv for debug")
                .action(ArgAction::Count),
        );

    collectors::add_collectors_args(cmd)
}

/// Parse a positive duration: a bare number is seconds, otherwise one of the
/// `ms`, `s` or `m` suffixes is required.
fn parse_timeout(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let (number, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(at) => value.split_at(at),
        None => (value, "s"),
    };

    let amount: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{value}'"))?;

    let duration = match unit {
        "ms" => Duration::from_millis(amount),
        "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.saturating_mul(60)),
        _ => return Err(format!("unknown unit '{unit}' in '{value}', use ms, s or m")),
    };

    if duration.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }

    Ok(duration)
}

use crate::client::HttpClient;
use prometheus::IntCounter;
use std::collections::HashMap;
use std::fmt;

#[macro_use]
mod register_macro;

pub mod config;
pub mod exposition;
pub mod metric;
pub mod registry;
pub mod table;

pub use metric::{MetricDesc, MetricSpec, MetricTable, Record, Sample, ValueKind};

/// Which Mesos process the exporter is pointed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Master,
    Slave,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Slave => "slave",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a collector needs from the process: the client for the target,
/// its role, and the shared error counter.
#[derive(Clone)]
pub struct CollectorContext {
    pub client: HttpClient,
    pub role: Role,
    pub errors: IntCounter,
}

/// Two-phase metric reporting: `describe` what can be produced, `collect` a
/// fresh set of samples on every scrape.
pub trait Collector {
    fn name(&self) -> &'static str;

    fn enabled_by_default(&self) -> bool;

    /// Whether the collector has anything to report for this role.
    fn supports(&self, role: Role) -> bool {
        let _ = role;
        true
    }

    /// Every metric this collector can ever emit; never touches the network.
    fn describe(&self) -> Vec<MetricDesc>;

    /// Fetch, decode and map. Failures are logged and yield no samples.
    fn collect(&self) -> impl std::future::Future<Output = Vec<Sample>> + Send;
}

// THIS IS THE ONLY PLACE YOU NEED TO ADD NEW COLLECTORS
register_collectors! {
    monitor => MonitorCollector,
    snapshot => SnapshotCollector,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_names() {
        assert_eq!(COLLECTOR_NAMES, &["monitor", "snapshot"]);
    }

    #[test]
    fn test_default_enabled() {
        assert!(default_enabled("monitor"));
        assert!(default_enabled("snapshot"));
        assert!(!default_enabled("state"));
    }

    #[test]
    fn test_factories_match_names() {
        let factories = all_factories();
        for name in COLLECTOR_NAMES {
            assert!(factories.contains_key(name), "missing factory for {name}");
        }
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Master.to_string(), "master");
        assert_eq!(Role::Slave.as_str(), "slave");
    }
}

use crate::collectors::table::{Payload, TableCollector};
use crate::collectors::{
    Collector, CollectorContext, MetricDesc, MetricTable, Record, Role, Sample,
};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// The flat `/metrics/snapshot` object: metric key to number.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Snapshot {
    values: HashMap<String, f64>,
}

impl Snapshot {
    /// Value for `key`, zero when the process doesn't report it.
    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or_default()
    }
}

impl FromIterator<(String, f64)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl Record for Snapshot {}

/// One object, one record.
impl Payload for Snapshot {
    type Record = Self;

    fn into_records(self) -> Vec<Self> {
        vec![self]
    }
}

// Mesos reports memory and disk in megabytes.
fn megabytes(v: f64) -> f64 {
    v * 1024.0 * 1024.0
}

fn system(table: MetricTable<Snapshot>) -> MetricTable<Snapshot> {
    table
        .gauge("mesos_system_cpus", "Number of CPUs available on the host", |s| {
            s.get("system/cpus_total")
        })
        .gauge("mesos_system_load_1m", "Load average over the last minute", |s| {
            s.get("system/load_1min")
        })
        .gauge("mesos_system_load_5m", "Load average over the last 5 minutes", |s| {
            s.get("system/load_5min")
        })
        .gauge(
            "mesos_system_load_15m",
            "Load average over the last 15 minutes",
            |s| s.get("system/load_15min"),
        )
        .gauge("mesos_system_mem_free_bytes", "Free memory on the host in bytes", |s| {
            s.get("system/mem_free_bytes")
        })
        .gauge("mesos_system_mem_total_bytes", "Total memory on the host in bytes", |s| {
            s.get("system/mem_total_bytes")
        })
}

pub static MASTER_TABLE: Lazy<Arc<MetricTable<Snapshot>>> = Lazy::new(|| {
    let table = MetricTable::<Snapshot>::new(&[])
        // Resources
        .gauge("mesos_master_cpus", "Total number of CPUs in the cluster", |s| {
            s.get("master/cpus_total")
        })
        .gauge("mesos_master_cpus_used", "Number of allocated CPUs", |s| {
            s.get("master/cpus_used")
        })
        .gauge("mesos_master_gpus", "Total number of GPUs in the cluster", |s| {
            s.get("master/gpus_total")
        })
        .gauge("mesos_master_gpus_used", "Number of allocated GPUs", |s| {
            s.get("master/gpus_used")
        })
        .gauge("mesos_master_mem_bytes", "Total memory in the cluster in bytes", |s| {
            megabytes(s.get("master/mem_total"))
        })
        .gauge("mesos_master_mem_used_bytes", "Allocated memory in bytes", |s| {
            megabytes(s.get("master/mem_used"))
        })
        .gauge("mesos_master_disk_bytes", "Total disk in the cluster in bytes", |s| {
            megabytes(s.get("master/disk_total"))
        })
        .gauge("mesos_master_disk_used_bytes", "Allocated disk in bytes", |s| {
            megabytes(s.get("master/disk_used"))
        })
        // Tasks
        .gauge("mesos_master_tasks_running", "Number of running tasks", |s| {
            s.get("master/tasks_running")
        })
        .gauge("mesos_master_tasks_staging", "Number of staging tasks", |s| {
            s.get("master/tasks_staging")
        })
        .gauge("mesos_master_tasks_starting", "Number of starting tasks", |s| {
            s.get("master/tasks_starting")
        })
        .counter("mesos_master_tasks_finished_total", "Total number of finished tasks", |s| {
            s.get("master/tasks_finished")
        })
        .counter("mesos_master_tasks_failed_total", "Total number of failed tasks", |s| {
            s.get("master/tasks_failed")
        })
        .counter("mesos_master_tasks_killed_total", "Total number of killed tasks", |s| {
            s.get("master/tasks_killed")
        })
        .counter("mesos_master_tasks_lost_total", "Total number of lost tasks", |s| {
            s.get("master/tasks_lost")
        })
        .counter("mesos_master_tasks_error_total", "Total number of invalid tasks", |s| {
            s.get("master/tasks_error")
        })
        // Frameworks
        .gauge("mesos_master_frameworks_active", "Number of active frameworks", |s| {
            s.get("master/frameworks_active")
        })
        .gauge("mesos_master_frameworks_inactive", "Number of inactive frameworks", |s| {
            s.get("master/frameworks_inactive")
        })
        .gauge("mesos_master_frameworks_connected", "Number of connected frameworks", |s| {
            s.get("master/frameworks_connected")
        })
        .gauge(
            "mesos_master_frameworks_disconnected",
            "Number of disconnected frameworks",
            |s| s.get("master/frameworks_disconnected"),
        )
        // Agents
        .gauge("mesos_master_slaves_active", "Number of active agents", |s| {
            s.get("master/slaves_active")
        })
        .gauge("mesos_master_slaves_inactive", "Number of inactive agents", |s| {
            s.get("master/slaves_inactive")
        })
        .gauge("mesos_master_slaves_connected", "Number of connected agents", |s| {
            s.get("master/slaves_connected")
        })
        .gauge("mesos_master_slaves_disconnected", "Number of disconnected agents", |s| {
            s.get("master/slaves_disconnected")
        })
        .counter(
            "mesos_master_slave_registrations_total",
            "Total number of agents able to cleanly re-join",
            |s| s.get("master/slave_registrations"),
        )
        .counter("mesos_master_slave_removals_total", "Total number of agents removed", |s| {
            s.get("master/slave_removals")
        })
        // Status updates
        .counter(
            "mesos_master_valid_status_updates_total",
            "Total number of valid status update messages",
            |s| s.get("master/valid_status_updates"),
        )
        .counter(
            "mesos_master_invalid_status_updates_total",
            "Total number of invalid status update messages",
            |s| s.get("master/invalid_status_updates"),
        )
        // Master process
        .gauge("mesos_master_elected", "1 if this master is the elected leader", |s| {
            s.get("master/elected")
        })
        .gauge("mesos_master_uptime_seconds", "Uptime of the master in seconds", |s| {
            s.get("master/uptime_secs")
        })
        .gauge(
            "mesos_master_event_queue_messages",
            "Number of messages in the event queue",
            |s| s.get("master/event_queue_messages"),
        )
        .gauge(
            "mesos_master_event_queue_dispatches",
            "Number of dispatches in the event queue",
            |s| s.get("master/event_queue_dispatches"),
        )
        .gauge(
            "mesos_master_event_queue_http_requests",
            "Number of HTTP requests in the event queue",
            |s| s.get("master/event_queue_http_requests"),
        );

    Arc::new(system(table))
});

pub static SLAVE_TABLE: Lazy<Arc<MetricTable<Snapshot>>> = Lazy::new(|| {
    let table = MetricTable::<Snapshot>::new(&[])
        // Resources
        .gauge("mesos_slave_cpus", "Total number of CPUs on the agent", |s| {
            s.get("slave/cpus_total")
        })
        .gauge("mesos_slave_cpus_used", "Number of allocated CPUs", |s| {
            s.get("slave/cpus_used")
        })
        .gauge("mesos_slave_gpus", "Total number of GPUs on the agent", |s| {
            s.get("slave/gpus_total")
        })
        .gauge("mesos_slave_gpus_used", "Number of allocated GPUs", |s| {
            s.get("slave/gpus_used")
        })
        .gauge("mesos_slave_mem_bytes", "Total memory on the agent in bytes", |s| {
            megabytes(s.get("slave/mem_total"))
        })
        .gauge("mesos_slave_mem_used_bytes", "Allocated memory in bytes", |s| {
            megabytes(s.get("slave/mem_used"))
        })
        .gauge("mesos_slave_disk_bytes", "Total disk on the agent in bytes", |s| {
            megabytes(s.get("slave/disk_total"))
        })
        .gauge("mesos_slave_disk_used_bytes", "Allocated disk in bytes", |s| {
            megabytes(s.get("slave/disk_used"))
        })
        // Tasks
        .gauge("mesos_slave_tasks_running", "Number of running tasks", |s| {
            s.get("slave/tasks_running")
        })
        .gauge("mesos_slave_tasks_staging", "Number of staging tasks", |s| {
            s.get("slave/tasks_staging")
        })
        .gauge("mesos_slave_tasks_starting", "Number of starting tasks", |s| {
            s.get("slave/tasks_starting")
        })
        .counter("mesos_slave_tasks_finished_total", "Total number of finished tasks", |s| {
            s.get("slave/tasks_finished")
        })
        .counter("mesos_slave_tasks_failed_total", "Total number of failed tasks", |s| {
            s.get("slave/tasks_failed")
        })
        .counter("mesos_slave_tasks_killed_total", "Total number of killed tasks", |s| {
            s.get("slave/tasks_killed")
        })
        .counter("mesos_slave_tasks_lost_total", "Total number of lost tasks", |s| {
            s.get("slave/tasks_lost")
        })
        // Executors
        .gauge("mesos_slave_executors_running", "Number of running executors", |s| {
            s.get("slave/executors_running")
        })
        .gauge("mesos_slave_executors_registering", "Number of registering executors", |s| {
            s.get("slave/executors_registering")
        })
        .gauge("mesos_slave_executors_terminating", "Number of terminating executors", |s| {
            s.get("slave/executors_terminating")
        })
        .counter(
            "mesos_slave_executors_terminated_total",
            "Total number of terminated executors",
            |s| s.get("slave/executors_terminated"),
        )
        // Agent process
        .gauge("mesos_slave_frameworks_active", "Number of active frameworks", |s| {
            s.get("slave/frameworks_active")
        })
        .gauge("mesos_slave_registered", "1 if the agent is registered with a master", |s| {
            s.get("slave/registered")
        })
        .gauge("mesos_slave_uptime_seconds", "Uptime of the agent in seconds", |s| {
            s.get("slave/uptime_secs")
        })
        .counter(
            "mesos_slave_recovery_errors_total",
            "Total number of errors encountered during agent recovery",
            |s| s.get("slave/recovery_errors"),
        )
        .counter(
            "mesos_slave_valid_status_updates_total",
            "Total number of valid status update messages",
            |s| s.get("slave/valid_status_updates"),
        )
        .counter(
            "mesos_slave_invalid_status_updates_total",
            "Total number of invalid status update messages",
            |s| s.get("slave/invalid_status_updates"),
        )
        .counter(
            "mesos_slave_container_destroy_errors_total",
            "Total number of containers that failed to be destroyed",
            |s| s.get("containerizer/mesos/container_destroy_errors"),
        );

    Arc::new(system(table))
});

/// Exposes the process-level counters and gauges from `/metrics/snapshot`,
/// using the master or agent table depending on the target.
#[derive(Clone)]
pub struct SnapshotCollector {
    inner: TableCollector<Snapshot>,
}

impl SnapshotCollector {
    pub const ENABLED_BY_DEFAULT: bool = true;
    pub const PATH: &'static str = "/metrics/snapshot";

    pub fn new(ctx: &CollectorContext) -> Self {
        let table = match ctx.role {
            Role::Master => Arc::clone(&MASTER_TABLE),
            Role::Slave => Arc::clone(&SLAVE_TABLE),
        };

        Self {
            inner: TableCollector::new("snapshot", Self::PATH, ctx, table),
        }
    }
}

impl Collector for SnapshotCollector {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn enabled_by_default(&self) -> bool {
        Self::ENABLED_BY_DEFAULT
    }

    fn describe(&self) -> Vec<MetricDesc> {
        self.inner.describe()
    }

    async fn collect(&self) -> Vec<Sample> {
        self.inner.collect().await
    }
}

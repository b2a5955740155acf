use crate::collectors::table::TableCollector;
use crate::collectors::{
    Collector, CollectorContext, MetricDesc, MetricTable, Record, Role, Sample,
};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::sync::Arc;

/// Resource usage of one executor, from the agent's `/monitor/statistics`.
///
/// Fields Mesos leaves out (isolators that aren't enabled, for example)
/// decode as zero.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Statistics {
    pub cpus_limit: f64,
    pub cpus_system_time_secs: f64,
    pub cpus_user_time_secs: f64,
    pub cpus_throttled_time_secs: f64,

    pub mem_limit_bytes: f64,
    pub mem_rss_bytes: f64,

    pub net_rx_bytes: f64,
    pub net_rx_dropped: f64,
    pub net_rx_errors: f64,
    pub net_rx_packets: f64,
    pub net_tx_bytes: f64,
    pub net_tx_dropped: f64,
    pub net_tx_errors: f64,
    pub net_tx_packets: f64,
}

const NO_STATISTICS: Statistics = Statistics {
    cpus_limit: 0.0,
    cpus_system_time_secs: 0.0,
    cpus_user_time_secs: 0.0,
    cpus_throttled_time_secs: 0.0,
    mem_limit_bytes: 0.0,
    mem_rss_bytes: 0.0,
    net_rx_bytes: 0.0,
    net_rx_dropped: 0.0,
    net_rx_errors: 0.0,
    net_rx_packets: 0.0,
    net_tx_bytes: 0.0,
    net_tx_dropped: 0.0,
    net_tx_errors: 0.0,
    net_tx_packets: 0.0,
};

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Executor {
    #[serde(rename = "executor_id")]
    pub id: String,
    #[serde(rename = "executor_name")]
    pub name: String,
    pub framework_id: String,
    pub source: String,
    pub statistics: Option<Statistics>,
}

impl Executor {
    /// Statistics, or all zeros when the agent sent none.
    pub fn stats(&self) -> &Statistics {
        self.statistics.as_ref().unwrap_or(&NO_STATISTICS)
    }
}

impl Record for Executor {
    fn label_values(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.framework_id.clone(),
            self.source.clone(),
        ]
    }
}

pub const LABELS: &[&str] = &["id", "framework_id", "source"];

/// Per-executor resource usage table.
pub static TABLE: Lazy<Arc<MetricTable<Executor>>> = Lazy::new(|| {
    Arc::new(
        MetricTable::<Executor>::new(LABELS)
            // CPU
            .gauge(
                "mesos_slave_stats_cpus_limit",
                "Current limit of CPUs for task",
                |e| e.stats().cpus_limit,
            )
            .counter(
                "mesos_slave_stats_cpu_system_seconds_total",
                "Total system CPU seconds",
                |e| e.stats().cpus_system_time_secs,
            )
            .counter(
                "mesos_slave_stats_cpu_user_seconds_total",
                "Total user CPU seconds",
                |e| e.stats().cpus_user_time_secs,
            )
            .counter(
                "mesos_slave_stats_cpu_throttled_seconds_total",
                "Total time CPU was throttled",
                |e| e.stats().cpus_throttled_time_secs,
            )
            // Memory
            .gauge(
                "mesos_slave_stats_mem_limit_bytes",
                "Current memory limit in bytes",
                |e| e.stats().mem_limit_bytes,
            )
            .gauge(
                "mesos_slave_stats_mem_rss_bytes",
                "Current rss memory usage",
                |e| e.stats().mem_rss_bytes,
            )
            // Network RX
            .counter(
                "mesos_slave_stats_network_receive_bytes_total",
                "Total bytes received",
                |e| e.stats().net_rx_bytes,
            )
            .counter(
                "mesos_slave_stats_network_receive_dropped_total",
                "Total packets dropped while receiving",
                |e| e.stats().net_rx_dropped,
            )
            .counter(
                "mesos_slave_stats_network_receive_errors_total",
                "Total errors while receiving",
                |e| e.stats().net_rx_errors,
            )
            .counter(
                "mesos_slave_stats_network_receive_packets_total",
                "Total packets received",
                |e| e.stats().net_rx_packets,
            )
            // Network TX
            .counter(
                "mesos_slave_stats_network_transmit_bytes_total",
                "Total bytes transmitted",
                |e| e.stats().net_tx_bytes,
            )
            .counter(
                "mesos_slave_stats_network_transmit_dropped_total",
                "Total packets dropped while transmitting",
                |e| e.stats().net_tx_dropped,
            )
            .counter(
                "mesos_slave_stats_network_transmit_errors_total",
                "Total errors while transmitting",
                |e| e.stats().net_tx_errors,
            )
            .counter(
                "mesos_slave_stats_network_transmit_packets_total",
                "Total packets transmitted",
                |e| e.stats().net_tx_packets,
            ),
    )
});

/// Exposes executor resource usage from the agent's `/monitor/statistics`:
/// - mesos_slave_stats_cpu* (CPU limit and CPU time counters)
/// - mesos_slave_stats_mem_* (Gauges)
/// - mesos_slave_stats_network_* (Counters)
///
/// all labeled by executor id, framework id and source.
#[derive(Clone)]
pub struct MonitorCollector {
    inner: TableCollector<Vec<Executor>>,
}

impl MonitorCollector {
    pub const ENABLED_BY_DEFAULT: bool = true;
    pub const PATH: &'static str = "/monitor/statistics";

    pub fn new(ctx: &CollectorContext) -> Self {
        Self::with_table(ctx, Arc::clone(&TABLE))
    }

    /// Same endpoint with a custom table.
    pub fn with_table(ctx: &CollectorContext, table: Arc<MetricTable<Executor>>) -> Self {
        Self {
            inner: TableCollector::new("monitor", Self::PATH, ctx, table),
        }
    }
}

impl Collector for MonitorCollector {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn enabled_by_default(&self) -> bool {
        Self::ENABLED_BY_DEFAULT
    }

    fn supports(&self, role: Role) -> bool {
        role == Role::Slave
    }

    fn describe(&self) -> Vec<MetricDesc> {
        self.inner.describe()
    }

    async fn collect(&self) -> Vec<Sample> {
        self.inner.collect().await
    }
}

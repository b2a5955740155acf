use crate::client::HttpClient;
use crate::collectors::config::CollectorConfig;
use crate::collectors::exposition::Exposition;
use crate::collectors::{
    COLLECTOR_NAMES, Collector, CollectorContext, CollectorType, MetricDesc, Role, all_factories,
};
use anyhow::{Result, anyhow};
use futures::stream::{FuturesUnordered, StreamExt};
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub const ERRORS_TOTAL: &str = "mesos_collector_errors_total";

/// The enabled collectors for one target plus the process-wide self metrics.
#[derive(Clone)]
pub struct CollectorRegistry {
    collectors: Arc<[CollectorType]>,
    internal: Registry,
}

impl CollectorRegistry {
    /// Build the enabled collectors and check every descriptor up front, so a
    /// naming problem stops the exporter before the first scrape.
    ///
    /// # Errors
    ///
    /// Invalid metric or label names, or the same metric name declared twice.
    pub fn new(config: &CollectorConfig, client: HttpClient, role: Role) -> Result<Self> {
        let errors = IntCounter::with_opts(Opts::new(
            ERRORS_TOTAL,
            "Total number of internal mesos-collector errors.",
        ))?;

        let internal = Registry::new();
        internal.register(Box::new(errors.clone()))?;

        let ctx = CollectorContext {
            client,
            role,
            errors,
        };

        let factories = all_factories();
        let collectors: Vec<CollectorType> = COLLECTOR_NAMES
            .iter()
            .filter(|name| config.is_enabled(name))
            .filter_map(|name| factories.get(name).map(|f| f(&ctx)))
            .filter(|c| {
                let supported = c.supports(role);
                if !supported {
                    info!("Collector '{}' does not apply to a {role}, skipping", c.name());
                }
                supported
            })
            .collect();

        validate(&collectors)?;

        Ok(Self {
            collectors: collectors.into(),
            internal,
        })
    }

    /// Run every collector concurrently and encode the result in the text
    /// exposition format, followed by the self metrics.
    ///
    /// # Errors
    ///
    /// Only if encoding fails; collector failures just leave their metrics out.
    pub async fn gather(&self) -> Result<String> {
        let descs: Vec<MetricDesc> = self.collectors.iter().flat_map(Collector::describe).collect();
        let exposition = Exposition::new(&descs)?;

        let mut pending: FuturesUnordered<_> = self
            .collectors
            .iter()
            .map(|c| async move { (c.name(), c.collect().await) })
            .collect();

        while let Some((name, samples)) = pending.next().await {
            debug!("Collected {} samples from '{}'", samples.len(), name);
            for sample in &samples {
                exposition.observe(sample);
            }
        }

        let mut families = exposition.gather();
        families.extend(self.internal.gather());

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }

    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(Collector::name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

fn validate(collectors: &[CollectorType]) -> Result<()> {
    let mut seen: HashMap<&'static str, &'static str> = HashMap::new();
    seen.insert(ERRORS_TOTAL, "internal");

    for collector in collectors {
        for desc in collector.describe() {
            desc.to_desc()?;

            if let Some(owner) = seen.insert(desc.name, collector.name()) {
                return Err(anyhow!(
                    "metric {} is declared by both '{}' and '{}'",
                    desc.name,
                    owner,
                    collector.name()
                ));
            }
        }
    }

    Ok(())
}

//! Turns one scrape's samples into Prometheus metric families.
//!
//! A fresh `prometheus::Registry` is built per scrape, so nothing survives
//! between scrapes. Gauges use a `GaugeVec`. Counters carry the upstream value
//! as-is, including negative or non-finite values, so they are exported through
//! a small custom collector instead of a `CounterVec`.

use crate::collectors::{MetricDesc, Sample, ValueKind};
use anyhow::Result;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{Counter, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{GaugeVec, Opts, Registry};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Counter values keyed by label values, last write wins.
#[derive(Clone)]
struct CounterFamily {
    desc: Desc,
    values: Arc<Mutex<BTreeMap<Vec<String>, f64>>>,
}

impl CounterFamily {
    fn new(desc: &MetricDesc) -> Result<Self> {
        let desc = Desc::new(
            desc.name.to_string(),
            desc.help.to_string(),
            desc.labels.iter().map(ToString::to_string).collect(),
            HashMap::new(),
        )?;

        Ok(Self {
            desc,
            values: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    fn set(&self, label_values: &[String], value: f64) -> Result<()> {
        let expected = self.desc.variable_labels.len();
        if label_values.len() != expected {
            anyhow::bail!(
                "inconsistent label cardinality: expected {expected}, got {}",
                label_values.len()
            );
        }

        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(label_values.to_vec(), value);
        Ok(())
    }

    fn metric(&self, label_values: &[String], value: f64) -> Metric {
        let mut pairs: Vec<LabelPair> = self
            .desc
            .variable_labels
            .iter()
            .zip(label_values)
            .map(|(name, value)| {
                let mut pair = LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                pair
            })
            .collect();
        pairs.sort();

        let mut counter = Counter::default();
        counter.set_value(value);

        let mut metric = Metric::from_label(pairs);
        metric.set_counter(counter);
        metric
    }
}

impl Collector for CounterFamily {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);

        let mut family = MetricFamily::default();
        family.set_name(self.desc.fq_name.clone());
        family.set_help(self.desc.help.clone());
        family.set_field_type(MetricType::COUNTER);
        family.set_metric(
            values
                .iter()
                .map(|(labels, value)| self.metric(labels, *value))
                .collect(),
        );

        vec![family]
    }
}

enum Family {
    Counter(CounterFamily),
    Gauge(GaugeVec),
}

pub struct Exposition {
    registry: Registry,
    families: HashMap<&'static str, Family>,
}

impl Exposition {
    /// Register every described metric.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names or a metric described twice.
    pub fn new<'a, I>(descs: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a MetricDesc>,
    {
        let registry = Registry::new();
        let mut families = HashMap::new();

        for desc in descs {
            let family = match desc.kind {
                ValueKind::Counter => {
                    let counters = CounterFamily::new(desc)?;
                    registry.register(Box::new(counters.clone()))?;
                    Family::Counter(counters)
                }
                ValueKind::Gauge => {
                    let vec = GaugeVec::new(Opts::new(desc.name, desc.help), desc.labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    Family::Gauge(vec)
                }
            };
            families.insert(desc.name, family);
        }

        Ok(Self { registry, families })
    }

    /// Record one sample. A duplicate label set overwrites the previous value;
    /// samples whose labels don't match their description are logged and dropped.
    pub fn observe(&self, sample: &Sample) {
        let Some(family) = self.families.get(sample.desc.name) else {
            warn!(metric = sample.desc.name, "sample for undescribed metric");
            return;
        };

        match family {
            Family::Gauge(vec) => {
                let labels: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
                match vec.get_metric_with_label_values(&labels) {
                    Ok(gauge) => gauge.set(sample.value),
                    Err(e) => warn!(metric = sample.desc.name, "dropping sample: {e}"),
                }
            }
            Family::Counter(counters) => {
                if let Err(e) = counters.set(&sample.label_values, sample.value) {
                    warn!(metric = sample.desc.name, "dropping sample: {e}");
                }
            }
        }
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

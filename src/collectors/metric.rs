//! Declarative metric tables.
//!
//! A [`MetricTable`] is an ordered list of [`MetricSpec`]s sharing one set of
//! label names. Each spec maps a decoded record to one value through a plain
//! function, so tables are data and can be tested without any network.

use anyhow::{Result, anyhow};
use prometheus::core::Desc;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Monotonic by convention; the upstream value is trusted as is.
    Counter,
    Gauge,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter => f.write_str("counter"),
            Self::Gauge => f.write_str("gauge"),
        }
    }
}

/// Identity and shape of one metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
    pub kind: ValueKind,
}

impl MetricDesc {
    /// Validated Prometheus descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid metric or label names, or an empty help.
    pub fn to_desc(&self) -> Result<Desc> {
        Desc::new(
            self.name.to_string(),
            self.help.to_string(),
            self.labels.iter().map(ToString::to_string).collect(),
            HashMap::new(),
        )
        .map_err(|e| anyhow!("invalid metric {}: {e}", self.name))
    }
}

/// A decoded upstream record.
pub trait Record {
    /// Label values, positionally aligned with the table's label names.
    fn label_values(&self) -> Vec<String> {
        Vec::new()
    }
}

pub struct MetricSpec<R> {
    pub desc: MetricDesc,
    extract: fn(&R) -> f64,
}

impl<R> MetricSpec<R> {
    pub fn value(&self, record: &R) -> f64 {
        (self.extract)(record)
    }
}

impl<R> fmt::Debug for MetricSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricSpec").field("desc", &self.desc).finish()
    }
}

/// One observation produced during a collect cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub desc: MetricDesc,
    pub value: f64,
    pub label_values: Vec<String>,
}

pub struct MetricTable<R> {
    labels: &'static [&'static str],
    specs: Vec<MetricSpec<R>>,
}

impl<R: Record> MetricTable<R> {
    pub fn new(labels: &'static [&'static str]) -> Self {
        Self {
            labels,
            specs: Vec::new(),
        }
    }

    #[must_use]
    pub fn gauge(self, name: &'static str, help: &'static str, extract: fn(&R) -> f64) -> Self {
        self.push(name, help, ValueKind::Gauge, extract)
    }

    #[must_use]
    pub fn counter(self, name: &'static str, help: &'static str, extract: fn(&R) -> f64) -> Self {
        self.push(name, help, ValueKind::Counter, extract)
    }

    fn push(
        mut self,
        name: &'static str,
        help: &'static str,
        kind: ValueKind,
        extract: fn(&R) -> f64,
    ) -> Self {
        self.specs.push(MetricSpec {
            desc: MetricDesc {
                name,
                help,
                labels: self.labels,
                kind,
            },
            extract,
        });
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn describe(&self) -> Vec<MetricDesc> {
        self.specs.iter().map(|s| s.desc).collect()
    }

    /// Append one sample per spec for `record`.
    pub fn samples_into(&self, record: &R, out: &mut Vec<Sample>) {
        let label_values = record.label_values();

        out.extend(self.specs.iter().map(|spec| Sample {
            desc: spec.desc,
            value: spec.value(record),
            label_values: label_values.clone(),
        }));
    }
}

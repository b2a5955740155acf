use crate::client::{FetchError, HttpClient};
use crate::collectors::{CollectorContext, MetricDesc, MetricTable, Record, Sample};
use prometheus::IntCounter;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info_span, warn};
use tracing_futures::Instrument as _;

/// Shape of an endpoint's JSON body.
pub trait Payload: DeserializeOwned + Send {
    type Record: Record;

    fn into_records(self) -> Vec<Self::Record>;
}

/// Endpoints returning a JSON array of records.
impl<R> Payload for Vec<R>
where
    R: Record + DeserializeOwned + Send,
{
    type Record = R;

    fn into_records(self) -> Vec<R> {
        self
    }
}

/// Binds one endpoint path to a metric table.
///
/// Each collect is one fetch: every record of that single snapshot is run
/// through every spec of the table, or nothing is emitted at all.
pub struct TableCollector<P: Payload> {
    name: &'static str,
    path: &'static str,
    client: HttpClient,
    table: Arc<MetricTable<P::Record>>,
    errors: IntCounter,
    _payload: PhantomData<fn() -> P>,
}

impl<P: Payload> Clone for TableCollector<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            path: self.path,
            client: self.client.clone(),
            table: Arc::clone(&self.table),
            errors: self.errors.clone(),
            _payload: PhantomData,
        }
    }
}

impl<P: Payload> TableCollector<P> {
    pub fn new(
        name: &'static str,
        path: &'static str,
        ctx: &CollectorContext,
        table: Arc<MetricTable<P::Record>>,
    ) -> Self {
        Self {
            name,
            path,
            client: ctx.client.clone(),
            table,
            errors: ctx.errors.clone(),
            _payload: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn describe(&self) -> Vec<MetricDesc> {
        self.table.describe()
    }

    /// One fetch and decode, then one sample per (record, spec).
    ///
    /// # Errors
    ///
    /// Any [`FetchError`] from the client; no samples are produced then.
    pub async fn try_collect(&self) -> Result<Vec<Sample>, FetchError> {
        let payload: P = self.client.fetch_and_decode(self.path).await?;
        let records = payload.into_records();

        let mut samples = Vec::with_capacity(records.len() * self.table.len());
        for record in &records {
            self.table.samples_into(record, &mut samples);
        }

        Ok(samples)
    }

    /// Like [`try_collect`](Self::try_collect), but a failure is logged,
    /// counted in `mesos_collector_errors_total` and yields no samples.
    pub async fn collect(&self) -> Vec<Sample> {
        let span = info_span!(
            "http.client.request",
            otel.kind = "client",
            collector = self.name,
            http.method = "GET",
            url.path = self.path,
        );

        match self.try_collect().instrument(span).await {
            Ok(samples) => {
                debug!(
                    collector = self.name,
                    samples = samples.len(),
                    "collected samples"
                );
                samples
            }
            Err(e) => {
                warn!("Collector '{}' failed: {}", self.name, e);
                self.errors.inc();
                Vec::new()
            }
        }
    }
}

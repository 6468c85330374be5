use std::{
    collections::BTreeMap,
    sync::{Arc, Weak},
    time::Duration,
};

use opentelemetry_sdk::{
    error::OTelSdkResult,
    metrics::{
        InstrumentKind, ManualReader, Pipeline, Temporality,
        data::{AggregatedMetrics, MetricData, ResourceMetrics},
        reader::MetricReader,
    },
};
use snafu::ResultExt;

use crate::{CollectSnafu, ObservabilityError};

/// A pull-based metric reader.
///
/// Nothing is exported on a schedule. Clone the reader before handing it to
/// [`crate::init_observability`] to keep a handle for collecting on demand.
#[derive(Clone, Debug)]
pub struct MetricsReader {
    inner: Arc<ManualReader>,
}

impl MetricsReader {
    pub fn new(temporality: Temporality) -> Self {
        let inner = ManualReader::builder()
            .with_temporality(temporality)
            .build();
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Collects every `u64` counter, summed over its attribute sets and keyed by name.
    pub fn counter_totals(&self) -> Result<BTreeMap<String, u64>, ObservabilityError> {
        let mut rm = ResourceMetrics::default();
        self.inner.collect(&mut rm).context(CollectSnafu {})?;

        let mut totals = BTreeMap::new();
        for scope_metrics in rm.scope_metrics() {
            for metric in scope_metrics.metrics() {
                let AggregatedMetrics::U64(MetricData::Sum(sum)) = metric.data() else {
                    continue;
                };

                let total: &mut u64 = totals.entry(metric.name().to_string()).or_default();
                for dp in sum.data_points() {
                    *total += dp.value();
                }
            }
        }

        Ok(totals)
    }
}

impl Default for MetricsReader {
    fn default() -> Self {
        Self::new(Temporality::Cumulative)
    }
}

impl MetricReader for MetricsReader {
    fn register_pipeline(&self, pipeline: Weak<Pipeline>) {
        self.inner.register_pipeline(pipeline);
    }

    fn collect(&self, rm: &mut ResourceMetrics) -> OTelSdkResult {
        self.inner.collect(rm)
    }

    fn force_flush(&self) -> OTelSdkResult {
        self.inner.force_flush()
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> OTelSdkResult {
        self.inner.shutdown_with_timeout(timeout)
    }

    fn temporality(&self, kind: InstrumentKind) -> Temporality {
        self.inner.temporality(kind)
    }
}

use opentelemetry::global;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use snafu::{ResultExt, Snafu};
use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::{prelude::*, registry::LookupSpan};

pub use opentelemetry::{
    KeyValue,
    metrics::{Counter, Gauge, Histogram, Meter, UpDownCounter},
};

pub use crate::metrics::MetricsReader;

mod metrics;

const LOG_FORMAT_ENV: &str = "RUST_LOG_FORMAT";

pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

#[derive(Debug, Snafu)]
pub enum ObservabilityError {
    #[snafu(display("Failed to install tracing subscriber"))]
    Subscriber {
        source: tracing_subscriber::util::TryInitError,
    },
    #[snafu(display("Failed to collect metrics"))]
    Collect {
        source: opentelemetry_sdk::error::OTelSdkError,
    },
}

/// Returns a meter from the global meter provider.
///
/// Instruments created before [`init_observability`] is called are no-ops.
pub fn meter(name: &'static str) -> Meter {
    global::meter(name)
}

/// Installs the process-wide tracing subscriber and meter provider.
///
/// Logs are written to stderr, filtered by `RUST_LOG` (default `info`).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
pub fn init_observability(
    package_name: &'static str,
    metrics_reader: MetricsReader,
) -> Result<SdkMeterProvider, ObservabilityError> {
    let meter_provider = init_metrics(package_name, metrics_reader);

    tracing_subscriber::registry()
        .with(stderr())
        .try_init()
        .context(SubscriberSnafu {})?;

    Ok(meter_provider)
}

/// Installs the global meter provider, read through `metrics_reader`.
pub fn init_metrics(
    package_name: &'static str,
    metrics_reader: MetricsReader,
) -> SdkMeterProvider {
    let resource = Resource::builder().with_service_name(package_name).build();

    let meter_provider = SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(metrics_reader)
        .build();

    global::set_meter_provider(meter_provider.clone());

    meter_provider
}

fn stderr<S>() -> BoxedLayer<S>
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let log_env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO"));

    let json_fmt = std::env::var(LOG_FORMAT_ENV)
        .map(|val| val == "json")
        .unwrap_or(false);

    if json_fmt {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true)
            .json()
            .with_filter(log_env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .compact()
            .with_filter(log_env_filter)
            .boxed()
    }
}

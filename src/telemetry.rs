use std::time::Duration;

use opentelemetry::{KeyValue, global};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{self, Protocol, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>;

pub const SERVICE_NAME: &str = "ecosphere-server";
pub const TRACER_NAME: &str = "ecosphere-tracer";

const DEFAULT_FILTER: &str = "ecosphere_server=debug,tower_http=debug,axum=debug,sqlx=info,info";

/// OTLP providers for traces, logs and metrics, exported over gRPC to a
/// collector. When no collector endpoint is configured the subscriber runs
/// fmt-only; see [`Telemetry::init`].
#[derive(Debug)]
pub struct Telemetry {
    logger_provider: SdkLoggerProvider,
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl Telemetry {
    /// Installs the global subscriber. Returns a handle only when an OTLP
    /// pipeline was set up; the handle's [`shutdown`](Self::shutdown)
    /// flushes the batch exporters.
    pub fn init(collector_url: Option<&str>) -> Result<Option<Telemetry>> {
        let Some(collector_url) = collector_url else {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt_layer())
                .init();

            return Ok(None);
        };

        let base_resource = base_attrs(SERVICE_NAME, env!("CARGO_PKG_VERSION"));

        let logger_provider = build_logger_provider(collector_url, base_resource.clone())?;
        let meter_provider = build_meter_provider(collector_url, base_resource.clone())?;
        let tracer_provider = build_tracer_provider(collector_url, base_resource)?;

        global::set_tracer_provider(tracer_provider.clone());
        let tracer = global::tracer(TRACER_NAME);
        let trace_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let log_layer = OpenTelemetryTracingBridge::new(&logger_provider);
        let meter_layer = tracing_opentelemetry::MetricsLayer::new(meter_provider.clone());

        tracing_subscriber::registry()
            .with(trace_layer)
            .with(log_layer)
            .with(meter_layer)
            .with(env_filter())
            .with(fmt_layer())
            .init();

        Ok(Some(Self {
            logger_provider,
            tracer_provider,
            meter_provider,
        }))
    }

    pub fn shutdown(self) {
        if let Err(e) = self.meter_provider.shutdown() {
            eprintln!("error during metering shutdown: {e:?}");
        }

        if let Err(e) = self.logger_provider.shutdown() {
            eprintln!("error during logging shutdown: {e:?}");
        }

        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("error during tracing shutdown: {e:?}");
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn fmt_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
}

fn build_logger_provider(collector_url: &str, base_resource: Resource) -> Result<SdkLoggerProvider> {
    let exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_protocol(Protocol::Grpc)
        .with_endpoint(Endpoint::Logs.to_url(collector_url))
        .with_timeout(Duration::from_secs(5))
        .build()?;

    Ok(SdkLoggerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(base_resource)
        .build())
}

fn build_tracer_provider(collector_url: &str, base_resource: Resource) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_protocol(Protocol::Grpc)
        .with_endpoint(Endpoint::Traces.to_url(collector_url))
        .with_timeout(Duration::from_secs(5))
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(base_resource)
        .build())
}

fn build_meter_provider(collector_url: &str, base_resource: Resource) -> Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_protocol(Protocol::Grpc)
        .with_endpoint(Endpoint::Metrics.to_url(collector_url))
        .with_timeout(Duration::from_secs(5))
        .build()?;

    Ok(SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(base_resource)
        .build())
}

fn base_attrs(name: &'static str, version: &'static str) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", name),
            KeyValue::new("service.version", version),
        ])
        .build()
}

enum Endpoint {
    Logs,
    Traces,
    Metrics,
}

impl Endpoint {
    fn to_url(&self, collector_endpoint: &str) -> String {
        let location: &str = match self {
            Endpoint::Logs => "/v1/logs",
            Endpoint::Traces => "/v1/traces",
            Endpoint::Metrics => "/v1/metrics",
        };
        format!("{collector_endpoint}{location}")
    }
}

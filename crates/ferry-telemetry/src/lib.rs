//! Telemetry for ferry
//!
//! Structured logging through `tracing`, with optional OpenTelemetry export
//! of traces and metrics

mod metadata;
pub mod metrics;

use std::time::Duration;

use anyhow::Context;
use ferry_config::TelemetryConfig;
use ferry_config::telemetry::exporters::{ExportProtocol, ExporterConfig};
use ferry_config::telemetry::tracing::TracingConfig;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Shape of log lines written to stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Flushes and shuts down exporters on drop
///
/// Hold it for the lifetime of the process.
#[derive(Default)]
pub struct TelemetryGuard {
    meter_provider: Option<SdkMeterProvider>,
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.meter_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shut down meter provider: {e}");
        }
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shut down tracer provider: {e}");
        }
    }
}

/// Install the global subscriber and, when configured, OTLP exporters
///
/// `log_filter` uses `EnvFilter` directive syntax; an invalid filter falls
/// back to `info`.
///
/// # Errors
///
/// Returns an error if an OTLP exporter cannot be built
pub fn init(config: Option<&TelemetryConfig>, log_filter: &str, format: LogFormat) -> anyhow::Result<TelemetryGuard> {
    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let (text_layer, json_layer) = match format {
        LogFormat::Text => (Some(fmt::layer().with_target(true)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_current_span(true))),
    };

    let mut guard = TelemetryGuard::default();
    let mut otel_layer = None;

    if let Some(telemetry) = config {
        let resource = metadata::build_resource(telemetry);

        if let Some(exporter) = telemetry.metrics_exporter() {
            let provider = meter_provider(exporter, resource.clone())?;
            global::set_meter_provider(provider.clone());
            guard.meter_provider = Some(provider);
        }

        if let Some(exporter) = telemetry.trace_exporter() {
            let provider = tracer_provider(telemetry.tracing.as_ref(), exporter, resource)?;
            otel_layer = Some(tracing_opentelemetry::layer().with_tracer(provider.tracer("ferry")));
            global::set_tracer_provider(provider.clone());
            guard.tracer_provider = Some(provider);
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .init();

    Ok(guard)
}

fn meter_provider(exporter: &ExporterConfig, resource: Resource) -> anyhow::Result<SdkMeterProvider> {
    let endpoint = exporter.endpoint.as_str();
    let timeout = Duration::from_secs(exporter.timeout);
    let metric_exporter = match exporter.protocol {
        ExportProtocol::Grpc => MetricExporter::builder().with_tonic().with_endpoint(endpoint).with_timeout(timeout).build(),
        ExportProtocol::HttpProto => MetricExporter::builder().with_http().with_endpoint(endpoint).with_timeout(timeout).build(),
    }
    .with_context(|| format!("failed to build {:?} metrics exporter for {endpoint}", exporter.protocol))?;

    let reader = PeriodicReader::builder(metric_exporter)
        .with_interval(Duration::from_secs(exporter.export_interval))
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

fn tracer_provider(
    tracing: Option<&TracingConfig>,
    exporter: &ExporterConfig,
    resource: Resource,
) -> anyhow::Result<SdkTracerProvider> {
    let endpoint = exporter.endpoint.as_str();
    let timeout = Duration::from_secs(exporter.timeout);
    let span_exporter = match exporter.protocol {
        ExportProtocol::Grpc => SpanExporter::builder().with_tonic().with_endpoint(endpoint).with_timeout(timeout).build(),
        ExportProtocol::HttpProto => SpanExporter::builder().with_http().with_endpoint(endpoint).with_timeout(timeout).build(),
    }
    .with_context(|| format!("failed to build {:?} span exporter for {endpoint}", exporter.protocol))?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(sampler(tracing))
        .with_batch_exporter(span_exporter)
        .build())
}

fn sampler(tracing: Option<&TracingConfig>) -> Sampler {
    let rate = tracing.map_or(1.0, |t| t.sampling_rate);

    let root = if rate >= 1.0 {
        Sampler::AlwaysOn
    } else if rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(rate)
    };

    if tracing.is_none_or(|t| t.parent_based) {
        Sampler::ParentBased(Box::new(root))
    } else {
        root
    }
}

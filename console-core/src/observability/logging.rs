use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, runtime, trace as sdktrace};
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;

/// Install the global subscriber: env filter, JSON fmt layer and, when an OTLP
/// endpoint is configured, an OpenTelemetry span exporter.
///
/// Must be called from within a tokio runtime when OTLP export is enabled.
pub fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level));

    let Some(endpoint) = settings.otlp_endpoint.as_deref() else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer())
            .init();
        return;
    };

    let otlp_exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);

    let tracer = match opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(otlp_exporter)
        .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
            KeyValue::new("service.name", settings.service_name.clone()),
        ])))
        .install_batch(runtime::Tokio)
    {
        Ok(t) => Some(t),
        Err(e) => {
            eprintln!(
                "Failed to initialize OTLP tracer for '{}' at endpoint '{}': {}",
                settings.service_name, endpoint, e
            );
            None
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t)))
        .with(json_layer())
        .init();
}

/// JSON event output with source locations, built per subscriber stack.
fn json_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .json()
        .flatten_event(true)
}

//! OTel tracing layer and sampler.

use opentelemetry::trace::{
    Link, SamplingDecision, SamplingResult, SpanKind, TraceContextExt, TraceId, TraceState,
    TracerProvider as _,
};
use opentelemetry::{Context, KeyValue, global};
use opentelemetry_otlp::{ExporterBuildError, SpanExporter};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider, ShouldSample, SpanLimits};
use thiserror::Error;
use tracing_opentelemetry::OpenTelemetryLayer;

use crate::sample_rate;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("building OTLP exporter: {0}")]
    Exporter(#[from] ExporterBuildError),
}

/// Shuts the tracer provider down on drop, flushing pending spans.
pub struct OtelGuard {
    provider: SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(e) = self.provider.shutdown() {
            eprintln!("OTel shutdown error: {e}");
        }
    }
}

/// Build an OpenTelemetry layer for `tracing_subscriber::registry()`.
///
/// Must be called inside a Tokio runtime; the gRPC exporter spawns onto it.
/// Hold the guard for the life of the process.
pub fn otel_layer<S>(
    service_name: &str,
) -> Result<(OpenTelemetryLayer<S, SdkTracer>, OtelGuard), TelemetryError>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let exporter = SpanExporter::builder().with_tonic().build()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(CategorySampler)
        .with_resource(resource)
        .with_span_limits(SpanLimits::default())
        .build();

    global::set_tracer_provider(provider.clone());

    let tracer = provider.tracer("rolematch");
    let layer = tracing_opentelemetry::layer().with_tracer(tracer);
    Ok((layer, OtelGuard { provider }))
}

/// Samples by span name prefix (see [`sample_rate`]), keeping children of
/// sampled parents and every span flagged as an error.
#[derive(Debug, Clone)]
struct CategorySampler;

impl ShouldSample for CategorySampler {
    fn should_sample(
        &self,
        parent_context: Option<&Context>,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult {
        if let Some(cx) = parent_context {
            let parent = cx.span();
            let parent_ctx = parent.span_context();
            if parent_ctx.is_sampled() {
                return SamplingResult {
                    decision: SamplingDecision::RecordAndSample,
                    attributes: vec![],
                    trace_state: parent_ctx.trace_state().clone(),
                };
            }
        }

        let is_error = attributes.iter().any(|kv| {
            (kv.key.as_str() == "otel.status_code" && kv.value.as_str() == "ERROR")
                || (kv.key.as_str() == "error" && kv.value.as_str() == "true")
        });
        if is_error {
            return SamplingResult {
                decision: SamplingDecision::RecordAndSample,
                attributes: vec![],
                trace_state: TraceState::default(),
            };
        }

        Sampler::TraceIdRatioBased(sample_rate(name)).should_sample(
            parent_context,
            trace_id,
            name,
            span_kind,
            attributes,
            links,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(name: &str, attributes: &[KeyValue]) -> SamplingDecision {
        CategorySampler
            .should_sample(
                None,
                TraceId::from_bytes([0xff; 16]),
                name,
                &SpanKind::Internal,
                attributes,
                &[],
            )
            .decision
    }

    #[test]
    fn test_full_rate_categories_always_sampled() {
        assert_eq!(decide("save.document", &[]), SamplingDecision::RecordAndSample);
        assert_eq!(decide("auth.redeem", &[]), SamplingDecision::RecordAndSample);
    }

    #[test]
    fn test_errors_always_sampled() {
        let attrs = [KeyValue::new("otel.status_code", "ERROR")];
        assert_eq!(decide("remote.apply", &attrs), SamplingDecision::RecordAndSample);
    }
}

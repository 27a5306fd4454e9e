//! OpenTelemetry integration for rolematch.
//!
//! Span export is opt-in through the standard OTel environment variables:
//!
//! ```bash
//! OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 rolematch show
//! ```
//!
//! Set `OTEL_SDK_DISABLED=true` to disable export even when an endpoint is
//! set. Without the `telemetry` feature only [`otel_enabled`] and
//! [`sample_rate`] are available.

#[cfg(feature = "telemetry")]
mod otel;

#[cfg(feature = "telemetry")]
pub use otel::{OtelGuard, TelemetryError, otel_layer};

/// Whether the environment asks for OTel export.
///
/// True when `OTEL_SDK_DISABLED` is not `"true"` and either
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set or `OTEL_TRACES_EXPORTER` is set to
/// something other than `"none"`.
pub fn otel_enabled() -> bool {
    enabled_from(|name| std::env::var(name).ok())
}

fn enabled_from(var: impl Fn(&str) -> Option<String>) -> bool {
    if var("OTEL_SDK_DISABLED").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
        return false;
    }
    if var("OTEL_EXPORTER_OTLP_ENDPOINT").is_some() {
        return true;
    }
    var("OTEL_TRACES_EXPORTER").is_some_and(|exporter| !exporter.eq_ignore_ascii_case("none"))
}

/// Sampling rate for a root span, by name prefix.
///
/// | Prefix      | Rate | Volume                                |
/// |-------------|------|---------------------------------------|
/// | `auth.*`    | 100% | A handful per session                 |
/// | `load.*`    | 100% | Once per open                         |
/// | `save.*`    | 100% | One per debounce window               |
/// | `remote.*`  |  10% | One per foreign write, per client     |
/// | other       |  10% |                                       |
///
/// Spans carrying an error status are always sampled by the exporter.
pub fn sample_rate(span_name: &str) -> f64 {
    const FULL: [&str; 3] = ["auth.", "load.", "save."];
    if FULL.iter().any(|prefix| span_name.starts_with(prefix)) {
        1.0
    } else {
        0.1
    }
}

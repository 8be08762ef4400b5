//! Decode Metrics
//!
//! Prometheus counters for decode planning, kept in a crate-owned registry so
//! embedding processes can merge or ignore them.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::error::{Error, Result};

struct DecodeMetrics {
    registry: Registry,
    plans: IntCounterVec,
    failures: IntCounterVec,
    virtual_symbols: IntCounterVec,
}

impl DecodeMetrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let plans = IntCounterVec::new(
            Opts::new("lrc_decode_plans_total", "Decode plans built, by strategy"),
            &["scheme", "strategy"],
        )?;
        let failures = IntCounterVec::new(
            Opts::new("lrc_decode_failures_total", "Decode requests rejected, by reason"),
            &["scheme", "reason"],
        )?;
        let virtual_symbols = IntCounterVec::new(
            Opts::new(
                "lrc_virtual_symbols_total",
                "Virtual symbols synthesized by global maintenance",
            ),
            &["scheme"],
        )?;

        registry.register(Box::new(plans.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(virtual_symbols.clone()))?;

        Ok(Self {
            registry,
            plans,
            failures,
            virtual_symbols,
        })
    }
}

static METRICS: Lazy<Option<DecodeMetrics>> = Lazy::new(|| match DecodeMetrics::new() {
    Ok(m) => Some(m),
    Err(e) => {
        warn!(error = %e, "decode metrics disabled");
        None
    }
});

/// Count one successfully planned decode
pub fn record_plan(scheme: &str, strategy: &str) {
    if let Some(m) = METRICS.as_ref() {
        m.plans.with_label_values(&[scheme, strategy]).inc();
    }
}

/// Count one rejected decode request
pub fn record_failure(scheme: &str, error: &Error) {
    if let Some(m) = METRICS.as_ref() {
        m.failures.with_label_values(&[scheme, error.reason()]).inc();
    }
}

/// Add to the virtual-symbol counter
pub fn record_virtual_symbols(scheme: &str, count: usize) {
    if let Some(m) = METRICS.as_ref() {
        m.virtual_symbols
            .with_label_values(&[scheme])
            .inc_by(count as u64);
    }
}

/// Render all decode metrics in the Prometheus text exposition format
pub fn render() -> Result<String> {
    let Some(m) = METRICS.as_ref() else {
        return Ok(String::new());
    };

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&m.registry.gather(), &mut buffer)
        .map_err(|e| Error::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| Error::Metrics(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_series() {
        record_plan("metrics-test", "single_repair");
        record_failure("metrics-test", &Error::UnsupportedParityMaintenance { index: 12 });
        record_virtual_symbols("metrics-test", 3);

        let text = render().unwrap();
        assert!(text.contains("lrc_decode_plans_total"));
        assert!(text.contains("strategy=\"single_repair\""));
        assert!(text.contains("reason=\"unsupported_parity_maintenance\""));
        assert!(text.contains("lrc_virtual_symbols_total"));
    }
}

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

use crate::{AdapterError, Result};

lazy_static! {
    // Request metrics
    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("prometheus_io_requests_total", "Total number of adapter calls"),
        &["operation"]
    ).unwrap();

    pub static ref REQUEST_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("prometheus_io_request_failures_total", "Total number of failed adapter calls"),
        &["operation"]
    ).unwrap();

    pub static ref REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "prometheus_io_request_duration_seconds",
            "Adapter call duration in seconds"
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["operation"]
    ).unwrap();

    // Marshaling metrics
    pub static ref SAMPLES_COPIED_TOTAL: IntCounter = IntCounter::new(
        "prometheus_io_samples_copied_total",
        "Total number of samples written into caller buffers"
    ).unwrap();

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        registry.register(Box::new(REQUESTS_TOTAL.clone())).unwrap();
        registry.register(Box::new(REQUEST_FAILURES_TOTAL.clone())).unwrap();
        registry.register(Box::new(REQUEST_DURATION.clone())).unwrap();
        registry.register(Box::new(SAMPLES_COPIED_TOTAL.clone())).unwrap();
        registry
    };
}

/// Counts a call on creation and records its duration when dropped.
pub struct RequestTimer {
    operation: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn new(operation: &'static str) -> Self {
        REQUESTS_TOTAL.with_label_values(&[operation]).inc();
        Self {
            operation,
            start: Instant::now(),
        }
    }

    /// Passes `result` through, counting it as a failure if it is an error.
    pub fn track<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            record_failure(self.operation);
        }
        result
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        REQUEST_DURATION
            .with_label_values(&[self.operation])
            .observe(duration);
    }
}

pub fn record_failure(operation: &str) {
    REQUEST_FAILURES_TOTAL.with_label_values(&[operation]).inc();
}

pub fn record_samples_copied(count: usize) {
    SAMPLES_COPIED_TOTAL.inc_by(count as u64);
}

/// Renders the adapter's own metrics in text exposition format.
pub fn gather_text() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| AdapterError::Runtime(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| AdapterError::Runtime(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_counts_requests_and_failures() {
        let before = REQUESTS_TOTAL.with_label_values(&["unit_test_op"]).get();
        let failures_before = REQUEST_FAILURES_TOTAL.with_label_values(&["unit_test_op"]).get();
        {
            let timer = RequestTimer::new("unit_test_op");
            let ok: Result<u8> = Ok(1);
            assert!(timer.track(ok).is_ok());
            let err: Result<u8> = Err(AdapterError::Query("boom".into()));
            assert!(timer.track(err).is_err());
        }
        assert_eq!(REQUESTS_TOTAL.with_label_values(&["unit_test_op"]).get(), before + 1);
        assert_eq!(
            REQUEST_FAILURES_TOTAL.with_label_values(&["unit_test_op"]).get(),
            failures_before + 1
        );
    }

    #[test]
    fn test_gather_text_exposes_metrics() {
        let _timer = RequestTimer::new("gather_test_op");
        record_samples_copied(3);
        let text = gather_text().unwrap();
        assert!(text.contains("prometheus_io_requests_total"));
        assert!(text.contains("prometheus_io_samples_copied_total"));
    }

    #[test]
    fn test_gather_text_parses_with_exposition_parser() {
        let _timer = RequestTimer::new("parse_test_op");
        let text = gather_text().unwrap();
        let scrape =
            prometheus_parse::Scrape::parse(text.lines().map(|l| Ok(l.to_string()))).unwrap();
        assert!(scrape
            .samples
            .iter()
            .any(|s| s.metric == "prometheus_io_requests_total"));
    }
}

use crate::diagnostics::{Operation, Outcome};
use crate::error::Result;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Decision counters and latencies for the IAM hook.
pub struct GatewayMetrics {
    pub decisions: IntCounterVec,
    pub decision_latency: HistogramVec,
    pub registry: Registry,
}

impl GatewayMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let decisions = IntCounterVec::new(
            Opts::new("iam_hook_decisions_total", "Total number of IAM hook decisions"),
            &["operation", "outcome"],
        )?;

        let decision_latency = HistogramVec::new(
            HistogramOpts::new(
                "iam_hook_decision_latency_seconds",
                "Round trip latency of IAM hook decisions",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
            &["operation"],
        )?;

        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(decision_latency.clone()))?;

        Ok(Self {
            decisions,
            decision_latency,
            registry,
        })
    }

    pub fn record(&self, operation: Operation, outcome: &Outcome, elapsed: Duration) {
        self.decisions
            .with_label_values(&[operation.as_str(), outcome.label()])
            .inc();
        self.decision_latency
            .with_label_values(&[operation.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    pub fn decision_count(&self, operation: Operation, outcome_label: &str) -> u64 {
        self.decisions
            .with_label_values(&[operation.as_str(), outcome_label])
            .get()
    }

    /// Prometheus text exposition of every registered metric.
    pub fn encode_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[test]
    fn test_record_counts_by_outcome() {
        let metrics = GatewayMetrics::new().unwrap();
        metrics.record(Operation::Authenticate, &Outcome::Allowed, Duration::from_millis(3));
        metrics.record(
            Operation::Authenticate,
            &Outcome::TransportError(TransportError::Closed),
            Duration::from_millis(5),
        );
        metrics.record(
            Operation::Authorize,
            &Outcome::Denied { reason: "nope".into() },
            Duration::from_millis(1),
        );

        assert_eq!(metrics.decision_count(Operation::Authenticate, "allowed"), 1);
        assert_eq!(metrics.decision_count(Operation::Authenticate, "transport_error"), 1);
        assert_eq!(metrics.decision_count(Operation::Authorize, "denied"), 1);
        assert_eq!(metrics.decision_count(Operation::Authorize, "allowed"), 0);
    }

    #[test]
    fn test_encode_text() {
        let metrics = GatewayMetrics::new().unwrap();
        metrics.record(Operation::Authorize, &Outcome::Allowed, Duration::from_millis(2));

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("iam_hook_decisions_total"));
        assert!(text.contains("iam_hook_decision_latency_seconds"));
    }
}

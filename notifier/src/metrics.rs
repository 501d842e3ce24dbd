//! Prometheus metrics exporter.
//!
//! Renders the delivery counters in Prometheus text format.

use std::fmt::Write;
use std::sync::Arc;

use crate::delivery::DeliveryStats;

/// Prometheus exporter over [`DeliveryStats`].
pub struct PrometheusExporter {
    stats: Arc<DeliveryStats>,
    namespace: String,
}

impl PrometheusExporter {
    pub fn new(stats: Arc<DeliveryStats>) -> Self {
        Self::with_namespace(stats, "notifier")
    }

    pub fn with_namespace(stats: Arc<DeliveryStats>, namespace: impl Into<String>) -> Self {
        Self {
            stats,
            namespace: namespace.into(),
        }
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> String {
        let snapshot = self.stats.snapshot();
        let mut output = String::new();

        self.write_counter(
            &mut output,
            "notifications_submitted_total",
            "Notifications accepted by the delivery engine",
            snapshot.submitted,
        );

        let name = "notifications_delivered_total";
        self.write_header(
            &mut output,
            name,
            "Delivery tasks by terminal outcome",
            "counter",
        );
        for (outcome, value) in [
            ("sent", snapshot.sent),
            ("skipped", snapshot.skipped),
            ("failed", snapshot.failed),
        ] {
            self.write_sample(&mut output, name, &[("outcome", outcome)], value);
        }

        self.write_gauge(
            &mut output,
            "notifications_in_flight",
            "Delivery tasks currently held by a worker",
            snapshot.in_flight,
        );

        output
    }

    fn full_name(&self, name: &str) -> String {
        format!("{}_{}", self.namespace, name)
    }

    fn write_header(&self, output: &mut String, name: &str, help: &str, kind: &str) {
        let full_name = self.full_name(name);
        let _ = writeln!(output, "# HELP {full_name} {help}");
        let _ = writeln!(output, "# TYPE {full_name} {kind}");
    }

    fn write_sample(&self, output: &mut String, name: &str, labels: &[(&str, &str)], value: u64) {
        let full_name = self.full_name(name);
        if labels.is_empty() {
            let _ = writeln!(output, "{full_name} {value}");
            return;
        }
        let labels = labels
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(output, "{full_name}{{{labels}}} {value}");
    }

    fn write_counter(&self, output: &mut String, name: &str, help: &str, value: u64) {
        self.write_header(output, name, help, "counter");
        self.write_sample(output, name, &[], value);
    }

    fn write_gauge(&self, output: &mut String, name: &str, help: &str, value: u64) {
        self.write_header(output, name, help, "gauge");
        self.write_sample(output, name, &[], value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{DeliveryOutcome, FailureReason};

    #[test]
    fn test_export_counters() {
        let stats = Arc::new(DeliveryStats::new());
        for _ in 0..4 {
            stats.record_start();
        }
        stats.record(&DeliveryOutcome::Sent { receivers: 3 });
        stats.record(&DeliveryOutcome::Skipped);
        stats.record(&DeliveryOutcome::Failed(FailureReason::Panic));

        let output = PrometheusExporter::new(stats).export();
        assert!(output.contains("# TYPE notifier_notifications_submitted_total counter\n"));
        assert!(output.contains("notifier_notifications_submitted_total 4\n"));
        assert!(output.contains("notifier_notifications_delivered_total{outcome=\"sent\"} 1\n"));
        assert!(output.contains("notifier_notifications_delivered_total{outcome=\"failed\"} 1\n"));
        assert!(output.contains("# TYPE notifier_notifications_in_flight gauge\n"));
        assert!(output.contains("notifier_notifications_in_flight 1\n"));
    }

    #[test]
    fn test_custom_namespace() {
        let output =
            PrometheusExporter::with_namespace(Arc::new(DeliveryStats::new()), "f8").export();
        assert!(output.contains("f8_notifications_in_flight 0\n"));
        assert_eq!(output.matches("# HELP").count(), 3);
    }
}

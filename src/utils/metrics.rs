use std::time::Duration;

use crate::core::{source::FetchError, types::ScanStatus};

/// Abstraction over scan runtime metrics, allowing a no-op implementation when disabled.
pub trait ScanMetrics: Send + Sync {
    fn record_page_fetch_success(&self, records: usize);
    fn record_page_fetch_failure(&self, error: &FetchError);
    fn record_admission(&self, decision: &'static str);
    fn record_queue_depth(&self, depth: usize);
    fn record_scan_finished(&self, status: ScanStatus, duration: Duration, txns_processed: u64);
}

#[derive(Default)]
pub struct NoopScanMetrics;

impl NoopScanMetrics {
    pub fn new() -> Self {
        Self
    }
}

impl ScanMetrics for NoopScanMetrics {
    fn record_page_fetch_success(&self, _records: usize) {}

    fn record_page_fetch_failure(&self, _error: &FetchError) {}

    fn record_admission(&self, _decision: &'static str) {}

    fn record_queue_depth(&self, _depth: usize) {}

    fn record_scan_finished(&self, _status: ScanStatus, _duration: Duration, _txns: u64) {}
}

pub struct PrometheusScanMetrics {
    source: String,
}

impl PrometheusScanMetrics {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl ScanMetrics for PrometheusScanMetrics {
    fn record_page_fetch_success(&self, records: usize) {
        let source = self.source.clone();
        metrics::counter!(
            "walletscan_page_fetch_success_total",
            1,
            "source" => source.clone()
        );
        metrics::counter!(
            "walletscan_records_fetched_total",
            records as u64,
            "source" => source
        );
    }

    fn record_page_fetch_failure(&self, error: &FetchError) {
        let source = self.source.clone();
        metrics::counter!(
            "walletscan_page_fetch_failure_total",
            1,
            "source" => source,
            "reason" => error.kind()
        );
    }

    fn record_admission(&self, decision: &'static str) {
        metrics::counter!(
            "walletscan_admissions_total",
            1,
            "decision" => decision
        );
    }

    fn record_queue_depth(&self, depth: usize) {
        metrics::gauge!("walletscan_queue_depth", depth as f64);
    }

    fn record_scan_finished(&self, status: ScanStatus, duration: Duration, txns_processed: u64) {
        let source = self.source.clone();
        metrics::counter!(
            "walletscan_scans_finished_total",
            1,
            "source" => source.clone(),
            "status" => status.as_str()
        );
        metrics::histogram!(
            "walletscan_scan_duration_seconds",
            duration.as_secs_f64(),
            "source" => source.clone()
        );
        if txns_processed > 0 {
            metrics::counter!(
                "walletscan_txns_processed_total",
                txns_processed,
                "source" => source
            );
        }
    }
}

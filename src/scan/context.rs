use std::sync::Arc;

use crate::{
    config::ScanConfig,
    core::{notifier::Notifier, source::TransactionSource},
    utils::metrics::ScanMetrics,
};

/// Shared handles every worker and the orchestrator need.
#[derive(Clone)]
pub struct ScanContext {
    pub config: Arc<ScanConfig>,
    pub source: Arc<dyn TransactionSource>,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Arc<dyn ScanMetrics>,
}

impl ScanContext {
    pub fn new(
        config: Arc<ScanConfig>,
        source: Arc<dyn TransactionSource>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<dyn ScanMetrics>,
    ) -> Self {
        Self {
            config,
            source,
            notifier,
            metrics,
        }
    }
}

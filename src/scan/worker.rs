use std::collections::HashSet;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use super::{
    context::ScanContext,
    progress::{ProgressThrottle, StatusReporter},
    render,
};
use crate::{
    core::types::{ScanOutcome, ScanRequest, ScanSummary},
    sources::wallet::page::{RecordKind, classify},
};

/// Worker-local aggregation state. Never shared.
#[derive(Debug)]
pub struct ScanState {
    pub unique_addresses: HashSet<String>,
    pub txns_processed: u64,
    /// 1-based number of the page being processed
    pub current_page: u64,
    pub last_progress_time: Instant,
}

impl ScanState {
    pub fn new(now: Instant) -> Self {
        Self {
            unique_addresses: HashSet::new(),
            txns_processed: 0,
            current_page: 1,
            last_progress_time: now,
        }
    }

    /// Fold one page of records in; returns how many counted as transactions.
    pub fn absorb(&mut self, records: &[serde_json::Value]) -> u64 {
        let mut counted = 0;
        for record in records {
            match classify(record) {
                RecordKind::Transaction { counterpart } => {
                    if let Some(address) = counterpart {
                        self.unique_addresses.insert(address.to_lowercase());
                    }
                    counted += 1;
                }
                RecordKind::Other => {}
                RecordKind::Malformed => {
                    debug!(page = self.current_page, "Skipping malformed record");
                }
            }
        }
        self.txns_processed += counted;
        counted
    }

    pub fn summary(&self, address: &str, pages: u64) -> ScanSummary {
        ScanSummary {
            address: address.to_string(),
            txns_processed: self.txns_processed,
            unique_counterparts: self.unique_addresses.len(),
            pages,
        }
    }
}

/// Walks one address's history page by page.
///
/// The worker reports `Completed` and `Failed` itself. The deadline and
/// internal faults are handled by the orchestrator's supervisor.
#[derive(Clone)]
pub struct ScanWorker {
    ctx: ScanContext,
}

impl ScanWorker {
    pub fn new(ctx: ScanContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, request: &ScanRequest) -> ScanOutcome {
        let mut status = StatusReporter::for_request(self.ctx.notifier.clone(), request);
        let throttle = ProgressThrottle::from_config(&self.ctx.config);
        let mut state = ScanState::new(Instant::now());
        let mut pages = 0u64;

        let mut url = match self
            .ctx
            .source
            .first_page_url(&request.address, self.ctx.config.page_size)
        {
            Ok(url) => url,
            Err(e) => {
                error!(address = %request.address, "❌ Failed to prepare scan: {}", e);
                status.update(&render::failed(&e)).await;
                return ScanOutcome::Failed(e.to_string());
            }
        };

        info!(
            user_id = request.user_id,
            address = %request.address,
            "🔄 Starting full transaction scan"
        );

        loop {
            debug!(page = state.current_page, "📥 Fetching transaction page");
            let page = match self.ctx.source.fetch_page(&url).await {
                Ok(page) => page,
                Err(e) => {
                    self.ctx.metrics.record_page_fetch_failure(&e);
                    error!(
                        address = %request.address,
                        page = state.current_page,
                        "❌ Stopping scan: {}", e
                    );
                    status.update(&render::failed(&e)).await;
                    return ScanOutcome::Failed(e.to_string());
                }
            };
            self.ctx.metrics.record_page_fetch_success(page.records.len());

            if page.is_empty() {
                info!(page = state.current_page, "Reached end of transaction history");
                break;
            }

            let counted = state.absorb(&page.records);
            pages += 1;
            debug!(
                page = state.current_page,
                counted,
                unique = state.unique_addresses.len(),
                "Processed transaction page"
            );

            let now = Instant::now();
            if throttle.is_due(state.current_page, state.last_progress_time, now) {
                let text = render::progress(
                    state.current_page,
                    state.txns_processed,
                    state.unique_addresses.len(),
                );
                if status.update(&text).await {
                    state.last_progress_time = now;
                }
            }

            state.current_page += 1;
            match page.next {
                Some(next) => {
                    url = next;
                    sleep(self.ctx.config.page_delay()).await;
                }
                None => break,
            }
        }

        let summary = state.summary(&request.address, pages);
        info!(
            address = %request.address,
            txns = summary.txns_processed,
            unique = summary.unique_counterparts,
            "✅ Scan completed"
        );
        if !status.update(&render::completed(&summary)).await {
            warn!(address = %request.address, "⚠️ Final summary could not be delivered");
        }
        ScanOutcome::Completed(summary)
    }
}

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::time::{Instant, timeout};
use tracing::{debug, error, info, warn};

use super::{
    context::ScanContext,
    cooldown::{CooldownDecision, CooldownTracker},
    progress::StatusReporter,
    queue::{ScanQueue, ScanSlot},
    render,
    worker::ScanWorker,
};
use crate::core::types::{ActiveScan, ChatId, MessageId, ScanOutcome, ScanRequest, UserId};

/// Result of one admission attempt. Exactly one reply is produced per attempt.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Admission {
    Started {
        message_id: Option<MessageId>,
    },
    Queued {
        position: usize,
        message_id: Option<MessageId>,
    },
    AlreadyQueued {
        position: usize,
    },
    AlreadyRunning,
    CoolingDown {
        remaining: Duration,
    },
    Closed,
    Dropped {
        reason: String,
    },
}

impl Admission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Admission::Started { .. } => "started",
            Admission::Queued { .. } => "queued",
            Admission::AlreadyQueued { .. } => "already_queued",
            Admission::AlreadyRunning => "already_running",
            Admission::CoolingDown { .. } => "cooling_down",
            Admission::Closed => "closed",
            Admission::Dropped { .. } => "dropped",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Started { .. } | Admission::Queued { .. })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("scanner is shutting down")]
    Closed,
    #[error("no async runtime available to run the scan")]
    NoRuntime,
}

/// Read-only view of the scheduler for status endpoints.
#[derive(Serialize, Debug, Clone)]
pub struct SchedulerSnapshot {
    pub active: Option<ActiveScan>,
    pub queued: Vec<ScanRequest>,
    pub closed: bool,
}

struct SchedulerState {
    slot: ScanSlot,
    queue: ScanQueue,
    cooldowns: CooldownTracker,
}

#[derive(Clone, Copy)]
enum Placement {
    Started,
    Queued(usize),
}

/// Single-slot scan scheduler with a FIFO wait queue and per-user cooldown.
///
/// Scheduler state is only touched inside short, non-suspending critical
/// sections; the lock is never held across an `.await`.
pub struct ScanOrchestrator {
    ctx: ScanContext,
    worker: ScanWorker,
    state: Mutex<SchedulerState>,
    closed: AtomicBool,
}

impl ScanOrchestrator {
    pub fn new(ctx: ScanContext) -> Arc<Self> {
        let cooldowns = CooldownTracker::new(ctx.config.cooldown());
        Arc::new(Self {
            worker: ScanWorker::new(ctx.clone()),
            ctx,
            state: Mutex::new(SchedulerState {
                slot: ScanSlot::default(),
                queue: ScanQueue::new(),
                cooldowns,
            }),
            closed: AtomicBool::new(false),
        })
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let state = self.state();
        SchedulerSnapshot {
            active: state.slot.active().cloned(),
            queued: state.queue.iter().cloned().collect(),
            closed: self.closed.load(Ordering::SeqCst),
        }
    }

    /// No scan running and nobody waiting.
    pub fn is_idle(&self) -> bool {
        let state = self.state();
        !state.slot.is_busy() && state.queue.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Entry point for a scan command.
    ///
    /// Screening and placement share one critical section, so queue order is
    /// admission order however long the acknowledgment takes to send.
    pub async fn admit(self: &Arc<Self>, user_id: UserId, chat_id: ChatId, address: &str) -> Admission {
        let request = ScanRequest {
            user_id,
            chat_id,
            status_message: None,
            address: address.trim().to_string(),
        };
        info!(user_id, address = %request.address, "📨 Scan requested");

        let (placement, depth) = match self.place(&request) {
            Ok(placed) => placed,
            Err(rejection) => {
                let text = match &rejection {
                    Admission::AlreadyQueued { position } => render::already_queued(*position),
                    Admission::AlreadyRunning => render::already_running(),
                    Admission::CoolingDown { remaining } => {
                        render::cooling_down(self.ctx.config.cooldown(), *remaining)
                    }
                    _ => render::closed(),
                };
                info!(user_id, decision = rejection.as_str(), "🚫 Scan request rejected");
                self.reply(chat_id, &text).await;
                self.ctx.metrics.record_admission(rejection.as_str());
                return rejection;
            }
        };

        let message_id = self.reply(chat_id, &render::accepted(&request.address)).await;
        let attached = message_id.is_some_and(|id| {
            let mut state = self.state();
            match placement {
                Placement::Started => state.slot.attach_status(user_id, id),
                Placement::Queued(_) => state.queue.attach_status(user_id, id),
            }
        });
        let request = ScanRequest {
            status_message: message_id,
            ..request
        };

        let admission = match placement {
            Placement::Queued(position) => {
                info!(user_id, position, "⌛ Scanner busy, request queued");
                self.ctx.metrics.record_queue_depth(depth);
                if attached {
                    self.show(chat_id, message_id, &render::queued(position)).await;
                } else {
                    debug!(user_id, "Request left the queue before its acknowledgment landed");
                }
                Admission::Queued {
                    position,
                    message_id,
                }
            }
            Placement::Started => {
                info!(user_id, address = %request.address, "🚀 Scanner free, starting scan");
                if message_id.is_some() {
                    self.show(chat_id, message_id, &render::starting(&request.address))
                        .await;
                }
                if let Err(e) = self.dispatch(request.clone()) {
                    error!(user_id, "❌ Failed to start scan: {}", e);
                    // drop_request records the "dropped" admission
                    self.drop_request(&request, &e).await;
                    self.hand_off(user_id).await;
                    return Admission::Dropped {
                        reason: e.to_string(),
                    };
                }
                Admission::Started { message_id }
            }
        };

        self.ctx.metrics.record_admission(admission.as_str());
        admission
    }

    /// Dedupe, running and cooldown checks, in that order, then queue push or
    /// slot occupation. The cooldown stamp is recorded only when placed.
    fn place(&self, request: &ScanRequest) -> Result<(Placement, usize), Admission> {
        if self.is_closed() {
            return Err(Admission::Closed);
        }

        let mut state = self.state();
        let user_id = request.user_id;
        if let Some(position) = state.queue.position_of(user_id) {
            return Err(Admission::AlreadyQueued { position });
        }
        if state.slot.holder() == Some(user_id) {
            return Err(Admission::AlreadyRunning);
        }
        if let CooldownDecision::Denied { remaining } =
            state.cooldowns.check_and_record(user_id, Instant::now())
        {
            return Err(Admission::CoolingDown { remaining });
        }

        let placement = if state.slot.is_busy() {
            match state.queue.push(request.clone()) {
                Ok(position) => Placement::Queued(position),
                Err(position) => return Err(Admission::AlreadyQueued { position }),
            }
        } else {
            state.slot.occupy(request.clone());
            Placement::Started
        };
        Ok((placement, state.queue.len()))
    }

    fn launcher(&self) -> Result<Handle, DispatchError> {
        if self.is_closed() {
            return Err(DispatchError::Closed);
        }
        Handle::try_current().map_err(|_| DispatchError::NoRuntime)
    }

    fn dispatch(self: &Arc<Self>, request: ScanRequest) -> Result<(), DispatchError> {
        let runtime = self.launcher()?;
        runtime.spawn(Arc::clone(self).supervise(request));
        Ok(())
    }

    /// Run one worker under the deadline, then hand off.
    ///
    /// The hand-off runs even if reporting the outcome panics. Boxed so the
    /// spawn inside `hand_off` does not make this future's type recursive.
    fn supervise(self: Arc<Self>, request: ScanRequest) -> BoxFuture<'static, ()> {
        async move {
            if AssertUnwindSafe(self.run_to_completion(&request))
                .catch_unwind()
                .await
                .is_err()
            {
                error!(
                    user_id = request.user_id,
                    address = %request.address,
                    "💥 Scan supervisor faulted, handing off anyway"
                );
            }
            self.hand_off(request.user_id).await;
        }
        .boxed()
    }

    /// Worker under the deadline: report timeout or crash, log and record the outcome.
    async fn run_to_completion(&self, request: &ScanRequest) -> ScanOutcome {
        let started = Instant::now();
        let deadline = self.ctx.config.timeout();
        let worker = self.worker.clone();
        let job = request.clone();
        let mut task = tokio::spawn(async move { worker.run(&job).await });

        let outcome = match timeout(deadline, &mut task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(
                    user_id = request.user_id,
                    address = %request.address,
                    "💥 Scan worker crashed: {}", e
                );
                self.show(request.chat_id, request.status_message, &render::internal_error())
                    .await;
                ScanOutcome::Failed(render::internal_error())
            }
            Err(_) => {
                task.abort();
                // Wait for the abort to land so no worker edit can follow the timeout notice
                match task.await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(
                            user_id = request.user_id,
                            address = %request.address,
                            "⏰ Scan timed out after {:?}", deadline
                        );
                        self.show(
                            request.chat_id,
                            request.status_message,
                            &render::timed_out(&request.address, deadline),
                        )
                        .await;
                        ScanOutcome::TimedOut
                    }
                }
            }
        };

        info!(
            user_id = request.user_id,
            status = outcome.status().as_str(),
            elapsed = ?started.elapsed(),
            "🏁 Scan finished"
        );
        self.ctx.metrics.record_scan_finished(
            outcome.status(),
            started.elapsed(),
            outcome.txns_processed(),
        );
        outcome
    }

    /// Pass the slot to the queue head, or release it when nobody is waiting.
    ///
    /// A head that cannot be launched is dropped with a notice and the next
    /// one is tried, so the slot is never left busy without a worker.
    async fn hand_off(self: &Arc<Self>, finished: UserId) {
        loop {
            let promoted = {
                let mut state = self.state();
                match state.queue.pop() {
                    Some(next) => {
                        state.slot.transfer(next.clone());
                        Some((next, state.queue.len()))
                    }
                    None => {
                        state.slot.release();
                        None
                    }
                }
            };

            let Some((next, remaining)) = promoted else {
                info!(finished_user = finished, "🔓 Queue empty, scan slot released");
                return;
            };
            self.ctx.metrics.record_queue_depth(remaining);
            info!(
                user_id = next.user_id,
                remaining, "⏭️ Popped next request from queue"
            );

            match self.launcher() {
                Ok(runtime) => {
                    let message_id = self
                        .show(next.chat_id, next.status_message, &render::your_turn(&next.address))
                        .await;
                    let next = ScanRequest {
                        status_message: message_id.or(next.status_message),
                        ..next
                    };
                    runtime.spawn(Arc::clone(self).supervise(next));
                    return;
                }
                Err(e) => {
                    error!(user_id = next.user_id, "❌ Failed to start next scan: {}", e);
                    self.drop_request(&next, &e).await;
                }
            }
        }
    }

    /// Tell a user their request will not run and let them retry right away.
    async fn drop_request(&self, request: &ScanRequest, reason: &DispatchError) {
        self.state().cooldowns.forget(request.user_id);
        self.show(
            request.chat_id,
            request.status_message,
            &render::dropped(&request.address, &reason.to_string()),
        )
        .await;
        self.ctx.metrics.record_admission("dropped");
    }

    /// Refuse further admissions and drop everyone still waiting.
    ///
    /// The running scan, if any, is left to finish and is returned.
    pub async fn close(&self) -> Option<ActiveScan> {
        self.closed.store(true, Ordering::SeqCst);
        let (drained, active) = {
            let mut state = self.state();
            (state.queue.drain(), state.slot.active().cloned())
        };

        if !drained.is_empty() {
            warn!(dropped = drained.len(), "🛑 Dropping queued scans on shutdown");
        }
        for request in &drained {
            self.drop_request(request, &DispatchError::Closed).await;
        }
        self.ctx.metrics.record_queue_depth(0);
        active
    }

    // Notifier calls below never unwind into the scheduler.

    async fn reply(&self, chat_id: ChatId, text: &str) -> Option<MessageId> {
        match AssertUnwindSafe(self.ctx.notifier.send_message(chat_id, text))
            .catch_unwind()
            .await
        {
            Ok(Ok(message_id)) => Some(message_id),
            Ok(Err(e)) => {
                warn!(chat_id, "⚠️ Failed to send reply: {}", e);
                None
            }
            Err(_) => {
                error!(chat_id, "💥 Notifier panicked while sending a reply");
                None
            }
        }
    }

    async fn show(&self, chat_id: ChatId, message_id: Option<MessageId>, text: &str) -> Option<MessageId> {
        let mut status = StatusReporter::new(self.ctx.notifier.clone(), chat_id, message_id);
        match AssertUnwindSafe(status.update(text)).catch_unwind().await {
            Ok(true) => {}
            Ok(false) => debug!(chat_id, "Status text not delivered"),
            Err(_) => error!(chat_id, "💥 Notifier panicked while updating status"),
        }
        status.message_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ScanConfig,
        core::{
            notifier::Notifier,
            source::{FetchError, TransactionPage, TransactionSource},
            types::ScanStatus,
        },
        notify::MessageBoard,
        utils::metrics::{NoopScanMetrics, ScanMetrics},
    };
    use async_trait::async_trait;

    struct EmptySource;

    #[async_trait]
    impl TransactionSource for EmptySource {
        fn first_page_url(&self, address: &str, _size: u32) -> Result<String, FetchError> {
            Ok(format!("mock://{address}"))
        }

        async fn fetch_page(&self, _url: &str) -> Result<TransactionPage, FetchError> {
            Ok(TransactionPage::end())
        }
    }

    fn orchestrator(board: Arc<MessageBoard>) -> Arc<ScanOrchestrator> {
        ScanOrchestrator::new(ScanContext::new(
            Arc::new(ScanConfig {
                page_delay_millis: 0,
                ..ScanConfig::default()
            }),
            Arc::new(EmptySource),
            board,
            Arc::new(NoopScanMetrics::new()),
        ))
    }

    fn request(user_id: UserId, message_id: Option<MessageId>) -> ScanRequest {
        ScanRequest {
            user_id,
            chat_id: user_id as ChatId,
            status_message: message_id,
            address: format!("0xuser{user_id}"),
        }
    }

    #[tokio::test]
    async fn hand_off_drops_heads_that_cannot_start_and_frees_slot() {
        let board = Arc::new(MessageBoard::new());
        let orch = orchestrator(board.clone());

        let b_msg = board.send_message(2, "queued").await.unwrap();
        let c_msg = board.send_message(3, "queued").await.unwrap();
        {
            let mut state = orch.state();
            state.slot.occupy(request(1, None));
            state.queue.push(request(2, Some(b_msg))).unwrap();
            state.queue.push(request(3, Some(c_msg))).unwrap();
            state.cooldowns.check_and_record(2, Instant::now());
        }
        orch.closed.store(true, Ordering::SeqCst);

        orch.hand_off(1).await;

        assert!(orch.is_idle(), "slot must be free and queue empty");
        assert!(board.get(2, b_msg).unwrap().text.contains("was dropped"));
        assert!(board.get(3, c_msg).unwrap().text.contains("was dropped"));
        assert_eq!(
            orch.state().cooldowns.check_and_record(2, Instant::now()),
            CooldownDecision::Allowed,
            "dropped user may retry immediately"
        );
    }

    #[tokio::test]
    async fn hand_off_with_empty_queue_releases_slot() {
        let board = Arc::new(MessageBoard::new());
        let orch = orchestrator(board);
        orch.state().slot.occupy(request(1, None));

        orch.hand_off(1).await;
        assert!(orch.snapshot().active.is_none());
    }

    #[tokio::test]
    async fn closed_orchestrator_refuses_admission() {
        let board = Arc::new(MessageBoard::new());
        let orch = orchestrator(board.clone());
        assert!(orch.close().await.is_none());

        let admission = orch.admit(9, 9, "0xabc").await;
        assert_eq!(admission, Admission::Closed);
        let replies = board.messages_for(9);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text, render::closed());
    }

    #[tokio::test]
    async fn close_drops_waiting_requests() {
        let board = Arc::new(MessageBoard::new());
        let orch = orchestrator(board.clone());
        let msg = board.send_message(2, "queued").await.unwrap();
        {
            let mut state = orch.state();
            state.slot.occupy(request(1, None));
            state.queue.push(request(2, Some(msg))).unwrap();
        }

        let active = orch.close().await;
        assert_eq!(active.map(|a| a.request.user_id), Some(1));
        assert!(orch.snapshot().queued.is_empty());
        assert!(board.get(2, msg).unwrap().text.contains("shutting down"));
    }

    #[derive(Default)]
    struct RecordingMetrics {
        admissions: std::sync::Mutex<Vec<&'static str>>,
    }

    impl ScanMetrics for RecordingMetrics {
        fn record_page_fetch_success(&self, _records: usize) {}
        fn record_page_fetch_failure(&self, _error: &FetchError) {}
        fn record_admission(&self, decision: &'static str) {
            self.admissions.lock().unwrap().push(decision);
        }
        fn record_queue_depth(&self, _depth: usize) {}
        fn record_scan_finished(&self, _status: ScanStatus, _duration: Duration, _txns: u64) {}
    }

    #[test]
    fn failed_first_dispatch_is_recorded_once() {
        let board = Arc::new(MessageBoard::new());
        let metrics = Arc::new(RecordingMetrics::default());
        let orch = ScanOrchestrator::new(ScanContext::new(
            Arc::new(ScanConfig::default()),
            Arc::new(EmptySource),
            board.clone(),
            metrics.clone(),
        ));

        // No tokio runtime here, so the scan cannot be launched
        let admission = futures::executor::block_on(orch.admit(1, 1, "0xa"));
        assert_eq!(
            admission,
            Admission::Dropped {
                reason: DispatchError::NoRuntime.to_string()
            }
        );
        assert_eq!(*metrics.admissions.lock().unwrap(), vec!["dropped"]);
        assert!(orch.is_idle());
        assert_eq!(
            orch.state().cooldowns.check_and_record(1, Instant::now()),
            CooldownDecision::Allowed
        );
        let replies = board.messages_for(1);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].text.contains("was dropped"));
    }

    #[test]
    fn admission_labels() {
        assert_eq!(Admission::AlreadyRunning.as_str(), "already_running");
        assert!(
            Admission::Queued {
                position: 1,
                message_id: None
            }
            .is_accepted()
        );
        assert!(!Admission::Closed.is_accepted());
    }
}

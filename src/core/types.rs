use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type ChatId = i64;
pub type MessageId = u64;

/// A scan request accepted by admission.
///
/// Immutable once created; consumed by exactly one worker run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub user_id: UserId,
    pub chat_id: ChatId,
    /// Message edited with progress and the final result. `None` when the
    /// acknowledgment could not be delivered.
    pub status_message: Option<MessageId>,
    pub address: String,
}

/// Request currently holding the scan slot.
#[derive(Serialize, Debug, Clone)]
pub struct ActiveScan {
    pub request: ScanRequest,
    pub started_at: DateTime<Utc>,
}

/// Terminal state of a scan, used for logging and metrics labels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// History fully walked
    Completed,
    /// Upstream or internal error
    Failed,
    /// Deadline elapsed before completion
    TimedOut,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
            ScanStatus::TimedOut => "timed_out",
        }
    }
}

/// Totals rendered in the final status message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub address: String,
    pub txns_processed: u64,
    pub unique_counterparts: usize,
    /// Number of non-empty pages walked
    pub pages: u64,
}

/// Terminal result of one worker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(ScanSummary),
    Failed(String),
    TimedOut,
}

impl ScanOutcome {
    pub fn status(&self) -> ScanStatus {
        match self {
            ScanOutcome::Completed(_) => ScanStatus::Completed,
            ScanOutcome::Failed(_) => ScanStatus::Failed,
            ScanOutcome::TimedOut => ScanStatus::TimedOut,
        }
    }

    pub fn txns_processed(&self) -> u64 {
        match self {
            ScanOutcome::Completed(summary) => summary.txns_processed,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(ScanStatus::Completed.as_str(), "completed");
        assert_eq!(ScanStatus::TimedOut.as_str(), "timed_out");
    }

    #[test]
    fn outcome_maps_to_status() {
        let summary = ScanSummary {
            address: "0xabc".to_string(),
            txns_processed: 12,
            unique_counterparts: 3,
            pages: 1,
        };
        assert_eq!(
            ScanOutcome::Completed(summary).status(),
            ScanStatus::Completed
        );
        assert_eq!(
            ScanOutcome::Failed("boom".into()).status().as_str(),
            "failed"
        );
        assert_eq!(ScanOutcome::TimedOut.txns_processed(), 0);
    }
}

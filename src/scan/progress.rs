use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    config::ScanConfig,
    core::{
        notifier::{Notifier, NotifyError},
        types::{ChatId, MessageId, ScanRequest},
    },
};

/// Decides when a progress edit is due.
///
/// Either trigger fires on its own: every `every_pages` pages, or when more
/// than `every` has passed since the last delivered update.
#[derive(Debug, Clone, Copy)]
pub struct ProgressThrottle {
    every_pages: u64,
    every: Duration,
}

impl ProgressThrottle {
    pub fn new(every_pages: u64, every: Duration) -> Self {
        Self { every_pages, every }
    }

    pub fn from_config(cfg: &ScanConfig) -> Self {
        Self::new(cfg.progress_interval_pages, cfg.progress_interval())
    }

    pub fn is_due(&self, page: u64, last_update: Instant, now: Instant) -> bool {
        let page_due = self.every_pages > 0 && page % self.every_pages == 0;
        let time_due = now.saturating_duration_since(last_update) > self.every;
        page_due || time_due
    }
}

/// Owns the status message of one scan and keeps editing it.
pub struct StatusReporter {
    notifier: Arc<dyn Notifier>,
    chat_id: ChatId,
    message_id: Option<MessageId>,
}

impl StatusReporter {
    pub fn new(notifier: Arc<dyn Notifier>, chat_id: ChatId, message_id: Option<MessageId>) -> Self {
        Self {
            notifier,
            chat_id,
            message_id,
        }
    }

    pub fn for_request(notifier: Arc<dyn Notifier>, request: &ScanRequest) -> Self {
        Self::new(notifier, request.chat_id, request.status_message)
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    /// Show `text`, editing the status message or sending one if there is none yet.
    ///
    /// Returns whether the message now shows `text`. "Not modified" counts as
    /// delivered; other failures are logged and never propagated.
    pub async fn update(&mut self, text: &str) -> bool {
        let Some(message_id) = self.message_id else {
            return match self.notifier.send_message(self.chat_id, text).await {
                Ok(message_id) => {
                    self.message_id = Some(message_id);
                    true
                }
                Err(e) => {
                    warn!(chat_id = self.chat_id, "⚠️ Failed to send status message: {}", e);
                    false
                }
            };
        };

        match self
            .notifier
            .edit_message(self.chat_id, message_id, text)
            .await
        {
            Ok(()) => true,
            Err(NotifyError::NotModified) => {
                debug!(message_id, "Status message unchanged");
                true
            }
            Err(e) => {
                warn!(
                    chat_id = self.chat_id,
                    message_id, "⚠️ Failed to edit status message: {}", e
                );
                false
            }
        }
    }
}

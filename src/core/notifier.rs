use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{ChatId, MessageId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// Edit carried the same text the message already has. Harmless.
    #[error("message is not modified")]
    NotModified,
    #[error("message {message_id} not found in chat {chat_id}")]
    NotFound { chat_id: ChatId, message_id: MessageId },
    #[error("notification channel error: {0}")]
    Channel(String),
}

/// Chat-like channel used for acknowledgments and status messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a new message, returning its id.
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageId, NotifyError>;

    /// Replace the text of an existing message.
    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), NotifyError>;
}

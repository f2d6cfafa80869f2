use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::core::{
    notifier::{Notifier, NotifyError},
    types::{ChatId, MessageId},
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: String,
    /// Number of accepted edits since the message was sent
    pub revision: u32,
}

pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Default)]
struct BoardInner {
    next_id: MessageId,
    /// Keyed by id; ids only grow, so the first entry is the oldest
    messages: BTreeMap<MessageId, StoredMessage>,
}

/// In-memory message store implementing the notification channel.
///
/// Message ids are unique across chats and start at 1. At most `capacity`
/// messages are kept; the oldest is evicted first, and edits to an evicted
/// message fail with `NotFound`.
pub struct MessageBoard {
    capacity: usize,
    inner: Mutex<BoardInner>,
}

impl Default for MessageBoard {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MessageBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(BoardInner::default()),
        }
    }

    pub fn get(&self, chat_id: ChatId, message_id: MessageId) -> Option<StoredMessage> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .messages
            .get(&message_id)
            .filter(|m| m.chat_id == chat_id)
            .cloned()
    }

    /// All messages in a chat, oldest first.
    pub fn messages_for(&self, chat_id: ChatId) -> Vec<StoredMessage> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .messages
            .values()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .messages
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Notifier for MessageBoard {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageId, NotifyError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.next_id += 1;
        let message_id = inner.next_id;
        inner.messages.insert(
            message_id,
            StoredMessage {
                chat_id,
                message_id,
                text: text.to_string(),
                revision: 0,
            },
        );
        while inner.messages.len() > self.capacity {
            if let Some((evicted, _)) = inner.messages.pop_first() {
                debug!(message_id = evicted, "Evicted oldest message");
            }
        }
        info!(chat_id, message_id, "💬 {}", text);
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), NotifyError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let message = inner
            .messages
            .get_mut(&message_id)
            .filter(|m| m.chat_id == chat_id)
            .ok_or(NotifyError::NotFound {
                chat_id,
                message_id,
            })?;
        if message.text == text {
            return Err(NotifyError::NotModified);
        }
        message.text = text.to_string();
        message.revision += 1;
        debug!(chat_id, message_id, revision = message.revision, "✏️ {}", text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_assigns_increasing_ids() {
        let board = MessageBoard::new();
        let first = board.send_message(1, "hello").await.unwrap();
        let second = board.send_message(2, "world").await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(board.len(), 2);
        assert_eq!(board.get(2, second).unwrap().text, "world");
        assert!(board.get(1, second).is_none());
    }

    #[tokio::test]
    async fn edit_replaces_text_and_bumps_revision() {
        let board = MessageBoard::new();
        let id = board.send_message(7, "queued").await.unwrap();
        board.edit_message(7, id, "running").await.unwrap();

        let stored = board.get(7, id).unwrap();
        assert_eq!(stored.text, "running");
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn identical_edit_is_not_modified() {
        let board = MessageBoard::new();
        let id = board.send_message(7, "same").await.unwrap();
        assert_eq!(
            board.edit_message(7, id, "same").await,
            Err(NotifyError::NotModified)
        );
        assert_eq!(board.get(7, id).unwrap().revision, 0);
    }

    #[tokio::test]
    async fn edit_unknown_message_fails() {
        let board = MessageBoard::new();
        assert_eq!(
            board.edit_message(1, 99, "x").await,
            Err(NotifyError::NotFound {
                chat_id: 1,
                message_id: 99
            })
        );
    }

    #[tokio::test]
    async fn oldest_message_is_evicted_at_capacity() {
        let board = MessageBoard::with_capacity(2);
        let first = board.send_message(1, "a").await.unwrap();
        let second = board.send_message(1, "b").await.unwrap();
        let third = board.send_message(2, "c").await.unwrap();

        assert_eq!(board.len(), 2);
        assert!(board.get(1, first).is_none());
        assert!(board.get(1, second).is_some());
        assert!(board.get(2, third).is_some());
        assert_eq!(
            board.edit_message(1, first, "late").await,
            Err(NotifyError::NotFound {
                chat_id: 1,
                message_id: first
            })
        );
    }

    #[tokio::test]
    async fn edit_in_wrong_chat_is_not_found() {
        let board = MessageBoard::new();
        let id = board.send_message(1, "mine").await.unwrap();
        assert!(matches!(
            board.edit_message(2, id, "hijack").await,
            Err(NotifyError::NotFound { .. })
        ));
        assert_eq!(board.get(1, id).unwrap().text, "mine");
    }

    #[tokio::test]
    async fn messages_for_chat_are_ordered() {
        let board = MessageBoard::new();
        board.send_message(5, "a").await.unwrap();
        board.send_message(6, "other").await.unwrap();
        board.send_message(5, "b").await.unwrap();

        let texts: Vec<_> = board
            .messages_for(5)
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
    }
}

use chrono::Utc;
use std::collections::VecDeque;

use crate::core::types::{ActiveScan, MessageId, ScanRequest, UserId};

/// FIFO of pending scans. A user appears at most once.
#[derive(Debug, Default)]
pub struct ScanQueue {
    pending: VecDeque<ScanRequest>,
}

impl ScanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail and return the 1-based position.
    ///
    /// If the user is already queued the queue is left untouched and their
    /// existing position is returned as the error.
    pub fn push(&mut self, request: ScanRequest) -> Result<usize, usize> {
        if let Some(position) = self.position_of(request.user_id) {
            return Err(position);
        }
        self.pending.push_back(request);
        Ok(self.pending.len())
    }

    pub fn pop(&mut self) -> Option<ScanRequest> {
        self.pending.pop_front()
    }

    /// 1-based position of the user's request, if queued.
    pub fn position_of(&self, user_id: UserId) -> Option<usize> {
        self.pending
            .iter()
            .position(|r| r.user_id == user_id)
            .map(|index| index + 1)
    }

    /// Record the status message of a queued request. False if the user is
    /// no longer waiting.
    pub fn attach_status(&mut self, user_id: UserId, message_id: MessageId) -> bool {
        match self.pending.iter_mut().find(|r| r.user_id == user_id) {
            Some(request) => {
                request.status_message = Some(message_id);
                true
            }
            None => false,
        }
    }

    pub fn drain(&mut self) -> Vec<ScanRequest> {
        self.pending.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScanRequest> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// The single permit that allows one scan to run.
#[derive(Debug, Default)]
pub struct ScanSlot {
    active: Option<ActiveScan>,
}

impl ScanSlot {
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn holder(&self) -> Option<UserId> {
        self.active.as_ref().map(|a| a.request.user_id)
    }

    pub fn active(&self) -> Option<&ActiveScan> {
        self.active.as_ref()
    }

    /// Take the slot for `request`. Returns false (and changes nothing) when busy.
    pub fn occupy(&mut self, request: ScanRequest) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(ActiveScan {
            request,
            started_at: Utc::now(),
        });
        true
    }

    /// Hand the slot straight to another request without passing through free.
    pub fn transfer(&mut self, request: ScanRequest) -> Option<ActiveScan> {
        self.active.replace(ActiveScan {
            request,
            started_at: Utc::now(),
        })
    }

    pub fn attach_status(&mut self, user_id: UserId, message_id: MessageId) -> bool {
        match self.active.as_mut() {
            Some(active) if active.request.user_id == user_id => {
                active.request.status_message = Some(message_id);
                true
            }
            _ => false,
        }
    }

    pub fn release(&mut self) -> Option<ActiveScan> {
        self.active.take()
    }
}

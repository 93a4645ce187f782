use std::collections::VecDeque;

use shared::domain::RowAction;

/// A queued row mutation together with the notices shown when it settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub action: RowAction,
    pub success: String,
    pub error: String,
}

impl QueueEntry {
    pub fn new(action: RowAction, success: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            action,
            success: success.into(),
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Busy,
}

/// FIFO of pending row mutations gated by a busy flag.
///
/// The head entry stays in the queue while it is being applied and is only
/// removed by [`RowActionQueue::settle`], so at most one entry is ever in
/// flight.
#[derive(Debug, Default)]
pub struct RowActionQueue {
    entries: VecDeque<QueueEntry>,
    busy: bool,
}

impl RowActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    /// Marks the queue busy and hands out a copy of the head entry. Returns
    /// `None` while another entry is in flight or when nothing is queued.
    pub fn begin(&mut self) -> Option<QueueEntry> {
        if self.busy {
            return None;
        }
        let head = self.entries.front()?.clone();
        self.busy = true;
        Some(head)
    }

    /// Drops the in-flight head entry and returns to idle.
    pub fn settle(&mut self) -> Option<QueueEntry> {
        if !self.busy {
            return None;
        }
        self.busy = false;
        self.entries.pop_front()
    }

    pub fn state(&self) -> QueueState {
        if self.busy {
            QueueState::Busy
        } else {
            QueueState::Idle
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True while anything is queued or in flight.
    pub fn is_pending(&self) -> bool {
        self.busy || !self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/row_queue_tests.rs"]
mod tests;

use shared::domain::{RowAction, RowId, MAX_QUANTITY};

use crate::serializer::RowEvent;

/// Transient state of one row's quantity control.
///
/// `saved` is the last quantity the store confirmed, `display` what the user
/// currently sees, and `sent` the value most recently handed to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityEditor {
    row: RowId,
    saved: u32,
    display: u32,
    sent: Option<u32>,
}

impl QuantityEditor {
    pub fn new(row: RowId, saved: u32) -> Self {
        Self {
            row,
            saved,
            display: saved,
            sent: None,
        }
    }

    pub fn row(&self) -> RowId {
        self.row
    }

    pub fn value(&self) -> u32 {
        self.display
    }

    pub fn saved(&self) -> u32 {
        self.saved
    }

    pub fn can_decrement(&self) -> bool {
        self.display > 1
    }

    pub fn increment(&mut self) {
        if self.display < MAX_QUANTITY {
            self.display += 1;
        }
    }

    pub fn decrement(&mut self) {
        if self.can_decrement() {
            self.display -= 1;
        }
    }

    /// The action to enqueue for the displayed value, if it differs from the
    /// saved quantity and has not been sent already.
    pub fn commit(&mut self) -> Option<RowAction> {
        if self.display == self.saved || self.sent == Some(self.display) {
            return None;
        }
        self.sent = Some(self.display);
        Some(RowAction::Quantity {
            id: self.row,
            quantity: self.display,
        })
    }

    /// The store confirmed `quantity` for this row.
    pub fn confirm(&mut self, quantity: u32) {
        self.saved = quantity;
        if self.sent == Some(quantity) {
            self.sent = None;
        }
    }

    /// `failed` was refused and `last_good` is what the store still holds.
    /// The display reverts only while it still shows `failed`. Returns
    /// whether the display changed.
    pub fn rollback(&mut self, failed: u32, last_good: u32) -> bool {
        self.saved = last_good;
        if failed != self.display || failed == last_good {
            return false;
        }
        self.display = last_good;
        self.sent = None;
        true
    }

    /// Folds a serializer event for this row into the editor. Returns whether
    /// the displayed value changed.
    pub fn apply_event(&mut self, event: &RowEvent) -> bool {
        match *event {
            RowEvent::QuantitySaved { row, quantity } if row == self.row => {
                self.confirm(quantity);
                false
            }
            RowEvent::QuantityRollback {
                row,
                failed,
                quantity,
            } if row == self.row => self.rollback(failed, quantity),
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "tests/quantity_tests.rs"]
mod tests;

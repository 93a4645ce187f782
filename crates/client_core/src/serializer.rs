use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use shared::domain::{ListRow, RowAction, RowId, ViewRow};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Notify},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    list_view::{ListView, StructuralEdit},
    row_queue::{QueueEntry, QueueState, RowActionQueue},
};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
const NOTICE_TITLE: &str = "Update row";
const MISSING_ROW_MESSAGE: &str = "Error finding row!";

/// A rejected apply call, with whatever explanation the store offered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row action rejected{}", detail_suffix(.detail))]
pub struct ApplyFailure {
    pub detail: Option<String>,
}

impl ApplyFailure {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
        }
    }

    pub fn without_detail() -> Self {
        Self { detail: None }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|detail| format!(": {detail}"))
        .unwrap_or_default()
}

/// Durable side of the row actions.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn apply(&self, action: &RowAction) -> Result<(), ApplyFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowEvent {
    Notice(Notice),
    /// A quantity change for `row` was rejected; `quantity` is the last value
    /// the store accepted and `failed` the one it refused.
    QuantityRollback {
        row: RowId,
        failed: u32,
        quantity: u32,
    },
    /// The store accepted `quantity` for `row`.
    QuantitySaved { row: RowId, quantity: u32 },
    RowsChanged,
}

#[derive(Debug, Clone, Copy)]
pub struct SerializerOptions {
    pub debounce: Duration,
    pub event_capacity: usize,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            event_capacity: 256,
        }
    }
}

struct Shared {
    queue: Mutex<RowActionQueue>,
    view: Mutex<ListView>,
    store: Arc<dyn RowStore>,
    events: broadcast::Sender<RowEvent>,
    wake: Notify,
    debounce: Duration,
}

/// Applies row actions to a [`RowStore`] one at a time, in the order they
/// were enqueued.
///
/// A single worker task drains the queue. It is the only caller of the store
/// and the only writer of the row state while an action settles.
pub struct RowActionSerializer {
    shared: Arc<Shared>,
    worker: JoinHandle<()>,
}

impl RowActionSerializer {
    /// Spawns the drain worker; must be called inside a tokio runtime.
    pub fn new(view: ListView, store: Arc<dyn RowStore>, options: SerializerOptions) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let shared = Arc::new(Shared {
            queue: Mutex::new(RowActionQueue::new()),
            view: Mutex::new(view),
            store,
            events,
            wake: Notify::new(),
            debounce: options.debounce,
        });
        let worker = tokio::spawn(drain(Arc::clone(&shared)));
        Self { shared, worker }
    }

    /// Queues `action`. Never rejected; a pending structural edit only defers
    /// draining.
    pub fn enqueue(
        &self,
        action: RowAction,
        success: impl Into<String>,
        error: impl Into<String>,
    ) {
        let entry = QueueEntry::new(action, success, error);
        let queued = {
            let mut queue = self.shared.lock_queue();
            queue.push(entry);
            queue.len()
        };
        debug!(row = action.row_id().0, kind = action.kind(), queued, "row action queued");
        self.shared.wake.notify_one();
    }

    /// True while actions are queued or in flight, or a structural edit is
    /// open.
    pub fn is_processing(&self) -> bool {
        self.shared.lock_queue().is_pending() || self.shared.lock_view().structural_edit().is_some()
    }

    /// True while actions are queued or in flight.
    pub fn has_pending_actions(&self) -> bool {
        self.shared.lock_queue().is_pending()
    }

    pub fn state(&self) -> QueueState {
        self.shared.lock_queue().state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RowEvent> {
        self.shared.events.subscribe()
    }

    pub fn rows(&self) -> Vec<ListRow> {
        self.shared.lock_view().rows().to_vec()
    }

    pub fn row(&self, id: RowId) -> Option<ListRow> {
        self.shared.lock_view().row(id).cloned()
    }

    pub fn view_rows(&self) -> Vec<ViewRow> {
        self.shared.lock_view().view_rows()
    }

    /// Snapshot of the whole view model.
    pub fn view(&self) -> ListView {
        self.shared.lock_view().clone()
    }

    /// Runs `f` against the view model and announces the change.
    pub fn update_view<R>(&self, f: impl FnOnce(&mut ListView) -> R) -> R {
        let result = f(&mut self.shared.lock_view());
        self.shared.publish(RowEvent::RowsChanged);
        result
    }

    pub fn set_order_by_name(&self, order_by_name: bool) {
        self.update_view(|view| view.order_by_name = order_by_name);
    }

    pub fn set_group_by_category(&self, group_by_category: bool) {
        self.update_view(|view| view.group_by_category = group_by_category);
    }

    /// Opens a structural edit unless row actions are still being processed.
    /// Draining resumes once the returned guard is dropped.
    pub fn begin_structural_edit(&self, edit: StructuralEdit) -> Option<StructuralEditGuard> {
        let queue = self.shared.lock_queue();
        let mut view = self.shared.lock_view();
        if queue.is_pending() || view.structural_edit().is_some() {
            return None;
        }
        view.set_structural_edit(Some(edit));
        debug!(?edit, "structural edit opened");
        Some(StructuralEditGuard {
            shared: Arc::clone(&self.shared),
        })
    }

    /// Waits until every queued action has settled.
    pub async fn drained(&self) {
        let mut events = self.subscribe();
        while self.has_pending_actions() {
            match events.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}

impl Drop for RowActionSerializer {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// Holds the structural-edit gate; releasing it lets queued actions drain.
pub struct StructuralEditGuard {
    shared: Arc<Shared>,
}

impl Drop for StructuralEditGuard {
    fn drop(&mut self) {
        self.shared.lock_view().set_structural_edit(None);
        debug!("structural edit closed");
        self.shared.wake.notify_one();
    }
}

impl Shared {
    fn lock_queue(&self) -> MutexGuard<'_, RowActionQueue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_view(&self) -> MutexGuard<'_, ListView> {
        self.view.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: RowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Idle to busy, unless a structural edit is open.
    fn begin_next(&self) -> Option<(QueueEntry, Option<ListRow>)> {
        let mut queue = self.lock_queue();
        let view = self.lock_view();
        if view.structural_edit().is_some() {
            return None;
        }
        let entry = queue.begin()?;
        let row = view.row(entry.action.row_id()).cloned();
        Some((entry, row))
    }

    async fn process(&self, entry: QueueEntry, row: Option<ListRow>) {
        let action = entry.action;
        let Some(row) = row else {
            self.lock_queue().settle();
            warn!(row = action.row_id().0, kind = action.kind(), "row action for unknown row");
            self.publish(RowEvent::Notice(Notice::error(NOTICE_TITLE, MISSING_ROW_MESSAGE)));
            return;
        };

        debug!(row = row.id.0, kind = action.kind(), "applying row action");
        let outcome = self.store.apply(&action).await;

        match outcome {
            Ok(()) => {
                self.lock_view().merge_action(&action);
                self.lock_queue().settle();
                info!(row = row.id.0, kind = action.kind(), "row action applied");
                self.publish(RowEvent::RowsChanged);
                if let RowAction::Quantity { id, quantity } = action {
                    self.publish(RowEvent::QuantitySaved { row: id, quantity });
                }
                self.publish(RowEvent::Notice(Notice::success(NOTICE_TITLE, entry.success)));
            }
            Err(failure) => {
                let quantity = self
                    .lock_view()
                    .row(row.id)
                    .map(|current| current.quantity)
                    .unwrap_or(row.quantity);
                self.lock_queue().settle();
                warn!(
                    row = row.id.0,
                    kind = action.kind(),
                    detail = ?failure.detail,
                    "row action failed"
                );
                if let RowAction::Quantity { id, quantity: failed } = action {
                    self.publish(RowEvent::QuantityRollback {
                        row: id,
                        failed,
                        quantity,
                    });
                }
                let message = match failure.detail {
                    Some(detail) if !detail.is_empty() => format!("{}: {detail}", entry.error),
                    _ => entry.error,
                };
                self.publish(RowEvent::Notice(Notice::error(NOTICE_TITLE, message)));
            }
        }
    }
}

async fn drain(shared: Arc<Shared>) {
    loop {
        shared.wake.notified().await;
        loop {
            if !shared.debounce.is_zero() {
                tokio::time::sleep(shared.debounce).await;
            }
            let Some((entry, row)) = shared.begin_next() else {
                break;
            };
            shared.process(entry, row).await;
        }
    }
}

#[cfg(test)]
#[path = "tests/serializer_tests.rs"]
mod tests;

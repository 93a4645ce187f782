//! Client side of the shopping list: an HTTP client for the server, the
//! local list view model and the serializer that applies row actions one at
//! a time.

pub mod error;
pub mod http;
pub mod list_view;
pub mod quantity;
pub mod row_queue;
pub mod serializer;
pub mod session;

pub use error::{ClientError, RowFormError};
pub use http::{ClientResult, ShoppingClient};
pub use list_view::{ListView, StructuralEdit};
pub use quantity::QuantityEditor;
pub use row_queue::{QueueEntry, QueueState, RowActionQueue};
pub use serializer::{
    ApplyFailure, Notice, NoticeKind, RowActionSerializer, RowEvent, RowStore, SerializerOptions,
    StructuralEditGuard, DEFAULT_DEBOUNCE,
};
pub use session::ListSession;

use std::sync::Arc;

use shared::{
    domain::{ListRow, RowAction, RowId, ShoppingList},
    protocol::{ListForm, RowForm},
    validation,
};
use tracing::info;

use crate::{
    error::RowFormError,
    http::{ClientResult, ShoppingClient},
    list_view::{ListView, StructuralEdit},
    quantity::QuantityEditor,
    serializer::{RowActionSerializer, RowStore, SerializerOptions, StructuralEditGuard},
};

/// The interactive active list: quick row actions go through the serializer,
/// add/edit/delete go straight to the server behind the structural-edit gate.
pub struct ListSession {
    client: Arc<ShoppingClient>,
    serializer: RowActionSerializer,
}

impl ListSession {
    pub async fn open(client: Arc<ShoppingClient>, options: SerializerOptions) -> ClientResult<Self> {
        let active = client.active_list().await?;
        let products = client.list_products().await?;
        info!(
            list = ?active.list.as_ref().map(|list| list.id.0),
            rows = active.rows.len(),
            products = products.len(),
            "shopping list loaded"
        );
        let view = ListView::new(active.list, active.rows, products);
        let store: Arc<dyn RowStore> = client.clone();
        let serializer = RowActionSerializer::new(view, store, options);
        Ok(Self { client, serializer })
    }

    pub fn serializer(&self) -> &RowActionSerializer {
        &self.serializer
    }

    pub fn list(&self) -> Option<ShoppingList> {
        self.serializer.view().list().cloned()
    }

    pub fn check_row(&self, row: RowId, checked: bool) {
        self.serializer.enqueue(
            RowAction::Check { id: row, checked },
            "Status saved.",
            "Error saving new status",
        );
    }

    /// Flips the checked flag as currently displayed.
    pub fn toggle_row(&self, row: RowId) -> Option<bool> {
        let checked = !self.serializer.row(row)?.checked;
        self.check_row(row, checked);
        Some(checked)
    }

    pub fn change_quantity(&self, row: RowId, quantity: u32) {
        self.serializer.enqueue(
            RowAction::Quantity { id: row, quantity },
            "Quantity updated.",
            "Error updating quantity",
        );
    }

    /// A quantity control for `row`, seeded with the displayed quantity.
    /// Feed it the serializer's events with [`QuantityEditor::apply_event`]
    /// to keep it in step with the store.
    pub fn quantity_editor(&self, row: RowId) -> Option<QuantityEditor> {
        let current = self.serializer.row(row)?;
        Some(QuantityEditor::new(row, current.quantity))
    }

    /// Enqueues the editor's displayed value unless it is already saved or
    /// in flight.
    pub fn commit_quantity(&self, editor: &mut QuantityEditor) -> bool {
        match editor.commit() {
            Some(RowAction::Quantity { id, quantity }) => {
                self.change_quantity(id, quantity);
                true
            }
            _ => false,
        }
    }

    pub async fn start_list(&self, form: &ListForm) -> ClientResult<ShoppingList> {
        let list = self.client.create_list(form).await?;
        info!(list = list.id.0, date = %list.date, "shopping list started");
        self.serializer
            .update_view(|view| view.set_list(Some(list.clone())));
        Ok(list)
    }

    pub async fn update_list(&self, form: &ListForm) -> Result<ShoppingList, RowFormError> {
        let current = self.list().ok_or(RowFormError::NoActiveList)?;
        let list = self.client.update_list(current.id, form).await?;
        self.serializer
            .update_view(|view| view.set_list(Some(list.clone())));
        Ok(list)
    }

    /// Moves the active list to the archive and empties the view.
    pub async fn archive(&self) -> ClientResult<()> {
        let archived = self.client.archive_list().await?;
        info!(lists = ?archived.iter().map(|id| id.0).collect::<Vec<_>>(), "shopping list archived");
        self.serializer.update_view(ListView::clear);
        Ok(())
    }

    pub async fn add_row(&self, form: &RowForm) -> Result<ListRow, RowFormError> {
        let _gate = self.gate(StructuralEdit::Create)?;
        self.save_row(form, None).await
    }

    pub async fn edit_row(&self, row: RowId, form: &RowForm) -> Result<ListRow, RowFormError> {
        let _gate = self.gate(StructuralEdit::Edit(row))?;
        self.save_row(form, Some(row)).await
    }

    pub async fn delete_row(&self, row: RowId) -> Result<ListRow, RowFormError> {
        let _gate = self.gate(StructuralEdit::Delete(row))?;
        let existing = self
            .serializer
            .row(row)
            .ok_or(RowFormError::MissingRow(row))?;
        let applied = self.client.delete_row(row).await?;
        if applied.row_id != row {
            return Err(RowFormError::MissingRow(row));
        }
        self.serializer.update_view(|view| view.remove_row(row));
        info!(row = row.0, "row deleted");
        Ok(existing)
    }

    fn gate(&self, edit: StructuralEdit) -> Result<StructuralEditGuard, RowFormError> {
        self.serializer
            .begin_structural_edit(edit)
            .ok_or(RowFormError::Busy)
    }

    /// Create or update a row. A product already on the list, in a row other
    /// than the one being edited, gets the quantity added to it instead.
    async fn save_row(
        &self,
        form: &RowForm,
        current: Option<RowId>,
    ) -> Result<ListRow, RowFormError> {
        let (product_id, quantity) = validation::row_form(form).map_err(RowFormError::Invalid)?;
        let view = self.serializer.view();
        let product = view
            .product(product_id)
            .cloned()
            .ok_or(RowFormError::UnknownProduct)?;
        let current_row = match current {
            Some(id) => Some(view.row(id).cloned().ok_or(RowFormError::MissingRow(id))?),
            None => None,
        };

        if let Some(existing) = view.row_with_product(product_id, current) {
            let mut merged = existing.clone();
            merged.quantity = existing.quantity + quantity;
            self.client
                .merge_row(merged.id, merged.quantity, current)
                .await
                .map_err(RowFormError::Merge)?;
            self.serializer.update_view(|view| {
                view.replace_row(merged.clone());
                if let Some(id) = current {
                    view.remove_row(id);
                }
            });
            info!(row = merged.id.0, quantity = merged.quantity, removed = ?current.map(|id| id.0), "existing row quantity updated");
            return Ok(merged);
        }

        match current_row {
            None => {
                if view.list().is_none() {
                    return Err(RowFormError::NoActiveList);
                }
                let row = self.client.add_row(form).await?;
                self.serializer.update_view(|view| view.push_row(row.clone()));
                info!(row = row.id.0, product = %row.product.name, "row added");
                Ok(row)
            }
            Some(mut row) => {
                let action = RowAction::Row {
                    id: row.id,
                    product: product_id,
                    quantity,
                };
                let applied = self.client.apply_row_action(&action).await?;
                if applied.row_id != row.id {
                    return Err(RowFormError::MissingRow(row.id));
                }
                row.product = product;
                row.quantity = quantity;
                self.serializer.update_view(|view| view.replace_row(row.clone()));
                info!(row = row.id.0, product = %row.product.name, "row updated");
                Ok(row)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

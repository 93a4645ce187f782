use std::cmp::Ordering;

use shared::domain::{ListRow, Product, ProductId, RowAction, RowId, ShoppingList, ViewRow};
use tracing::warn;

/// An open edit-row or delete-row interaction, or the add-row form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralEdit {
    Create,
    Edit(RowId),
    Delete(RowId),
}

/// Local read model of the active list as the user sees it.
#[derive(Debug, Clone, Default)]
pub struct ListView {
    list: Option<ShoppingList>,
    rows: Vec<ListRow>,
    products: Vec<Product>,
    pub order_by_name: bool,
    pub group_by_category: bool,
    structural_edit: Option<StructuralEdit>,
}

impl ListView {
    pub fn new(list: Option<ShoppingList>, rows: Vec<ListRow>, products: Vec<Product>) -> Self {
        Self {
            list,
            rows,
            products,
            ..Self::default()
        }
    }

    pub fn list(&self) -> Option<&ShoppingList> {
        self.list.as_ref()
    }

    pub fn set_list(&mut self, list: Option<ShoppingList>) {
        self.list = list;
    }

    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    pub fn row(&self, id: RowId) -> Option<&ListRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    /// Another row already holding `product`, ignoring `except`.
    pub fn row_with_product(&self, product: ProductId, except: Option<RowId>) -> Option<&ListRow> {
        self.rows
            .iter()
            .find(|row| row.product.id == product && Some(row.id) != except)
    }

    pub fn next_row_index(&self) -> i64 {
        self.rows.iter().map(|row| row.row_index).max().unwrap_or(0) + 1
    }

    pub fn structural_edit(&self) -> Option<StructuralEdit> {
        self.structural_edit
    }

    pub(crate) fn set_structural_edit(&mut self, edit: Option<StructuralEdit>) {
        self.structural_edit = edit;
    }

    /// Folds a successfully applied action into the local rows.
    pub fn merge_action(&mut self, action: &RowAction) -> bool {
        let product = match *action {
            RowAction::Row { product, .. } => self.product(product).cloned(),
            _ => None,
        };
        let Some(row) = self.rows.iter_mut().find(|row| row.id == action.row_id()) else {
            return false;
        };
        match *action {
            RowAction::Check { checked, .. } => row.checked = checked,
            RowAction::Quantity { quantity, .. } => row.quantity = quantity,
            RowAction::Row {
                product: product_id,
                quantity,
                ..
            } => {
                match product {
                    Some(product) => row.product = product,
                    None => warn!(row = row.id.0, product = product_id.0, "product missing from catalog"),
                }
                row.quantity = quantity;
            }
        }
        true
    }

    pub fn push_row(&mut self, row: ListRow) {
        self.rows.push(row);
    }

    pub fn replace_row(&mut self, row: ListRow) -> bool {
        match self.rows.iter_mut().find(|existing| existing.id == row.id) {
            Some(existing) => {
                *existing = row;
                true
            }
            None => false,
        }
    }

    pub fn remove_row(&mut self, id: RowId) -> Option<ListRow> {
        let position = self.rows.iter().position(|row| row.id == id)?;
        Some(self.rows.remove(position))
    }

    pub fn clear(&mut self) {
        self.list = None;
        self.rows.clear();
    }

    /// Rows numbered in stored order, then sorted by category when grouping
    /// and by product name or number within that.
    pub fn view_rows(&self) -> Vec<ViewRow> {
        let mut view_rows: Vec<ViewRow> = self
            .rows
            .iter()
            .enumerate()
            .map(|(position, row)| ViewRow {
                id: row.id,
                index: position as i64 + 1,
                category_name: row.product.category.name.clone(),
                product_name: row.product.name.clone(),
                quantity: row.quantity,
                checked: row.checked,
            })
            .collect();

        view_rows.sort_by(|a, b| {
            let group = if self.group_by_category {
                a.category_name.cmp(&b.category_name)
            } else {
                Ordering::Equal
            };
            group.then_with(|| {
                if self.order_by_name {
                    a.product_name.cmp(&b.product_name)
                } else {
                    a.index.cmp(&b.index)
                }
            })
        });
        view_rows
    }
}

#[cfg(test)]
#[path = "tests/list_view_tests.rs"]
mod tests;

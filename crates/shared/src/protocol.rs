use serde::{Deserialize, Serialize};

use crate::domain::{Category, ListRow, Product, RowId, ShoppingList, ViewRow};

/// Form fields arrive as submitted strings and are validated server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListForm {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowForm {
    pub product: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub category_id: String,
}

/// Adds `quantity` to an existing row, optionally dropping the row that was
/// being edited into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRowRequest {
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_row: Option<RowId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveListResponse {
    pub list: Option<ShoppingList>,
    pub rows: Vec<ListRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDetails {
    pub category: Category,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveDetails {
    pub list: ShoppingList,
    pub rows: Vec<ViewRow>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowApplied {
    pub row_id: RowId,
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(CategoryId);
id_newtype!(ProductId);
id_newtype!(ListId);
id_newtype!(RowId);

pub const MAX_NAME_CHARS: usize = 250;
pub const MAX_QUANTITY: u32 = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Category with the number of products filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub products: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: ListId,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// One line of the active list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRow {
    pub id: RowId,
    pub list_id: ListId,
    pub product: Product,
    pub row_index: i64,
    pub quantity: u32,
    pub checked: bool,
}

/// Flattened row as displayed, also the shape archived rows are read back in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRow {
    pub id: RowId,
    pub index: i64,
    pub category_name: String,
    pub product_name: String,
    pub quantity: u32,
    pub checked: bool,
}

/// A row-level mutation issued from the interactive list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RowAction {
    Check { id: RowId, checked: bool },
    Quantity { id: RowId, quantity: u32 },
    Row { id: RowId, product: ProductId, quantity: u32 },
}

impl RowAction {
    pub fn row_id(&self) -> RowId {
        match *self {
            RowAction::Check { id, .. }
            | RowAction::Quantity { id, .. }
            | RowAction::Row { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RowAction::Check { .. } => "check",
            RowAction::Quantity { .. } => "quantity",
            RowAction::Row { .. } => "row",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_action_uses_type_tag_on_the_wire() {
        let action = RowAction::Quantity {
            id: RowId(5),
            quantity: 3,
        };
        let json = serde_json::to_value(action).expect("json");
        assert_eq!(
            json,
            serde_json::json!({ "type": "quantity", "id": 5, "quantity": 3 })
        );

        let parsed: RowAction =
            serde_json::from_str(r#"{"type":"check","id":7,"checked":true}"#).expect("parse");
        assert_eq!(parsed.row_id(), RowId(7));
        assert_eq!(parsed.kind(), "check");
    }

    #[test]
    fn list_text_is_omitted_when_absent() {
        let list = ShoppingList {
            id: ListId(1),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
            text: None,
        };
        let json = serde_json::to_value(&list).expect("json");
        assert_eq!(json, serde_json::json!({ "id": 1, "date": "2024-05-01" }));
    }
}

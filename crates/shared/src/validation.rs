//! Form validation shared by the server actions and the client row form.
//!
//! Every failing field contributes one message; messages for the same field
//! are concatenated. A failed form turns into [`ApiError::validation`].

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{
    domain::{CategoryId, ProductId, MAX_NAME_CHARS, MAX_QUANTITY},
    error::ApiError,
    protocol::{CategoryForm, ListForm, ProductForm, RowForm},
};

#[derive(Debug, Default)]
struct Violations(BTreeMap<String, String>);

impl Violations {
    fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .and_modify(|existing| {
                existing.push_str(". ");
                existing.push_str(message);
            })
            .or_insert_with(|| message.to_string());
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, ApiError> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(ApiError::validation(self.0))
        }
    }
}

fn positive(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|v| *v > 0)
}

fn check_name(violations: &mut Violations, raw: &str, empty_message: &str) -> String {
    let name = raw.trim();
    if name.is_empty() {
        violations.add("name", empty_message);
    } else if name.chars().count() > MAX_NAME_CHARS {
        violations.add("name", "Name too long");
    }
    name.to_string()
}

fn check_quantity(violations: &mut Violations, quantity: Option<i64>) -> u32 {
    match quantity {
        Some(q) if q > 0 && q <= i64::from(MAX_QUANTITY) => q as u32,
        Some(q) if q > 0 => {
            violations.add("quantity", "Quantity too large");
            0
        }
        _ => {
            violations.add("quantity", "Quantity must be greater than 0");
            0
        }
    }
}

pub fn list_form(form: &ListForm) -> Result<(NaiveDate, Option<String>), ApiError> {
    let mut violations = Violations::default();

    let date = NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d").ok();
    if date.is_none() {
        violations.add("date", "Please enter a valid date.");
    }

    let text = form
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    if text
        .as_deref()
        .is_some_and(|t| t.chars().count() > MAX_NAME_CHARS)
    {
        violations.add("text", "Text too long");
    }

    violations.finish(|| (date.unwrap_or_default(), text))
}

pub fn row_form(form: &RowForm) -> Result<(ProductId, u32), ApiError> {
    let mut violations = Violations::default();

    let product = positive(&form.product);
    if product.is_none() {
        violations.add("product", "Choose a product");
    }
    let quantity = check_quantity(&mut violations, form.quantity.trim().parse::<i64>().ok());

    violations.finish(|| (ProductId(product.unwrap_or_default()), quantity))
}

pub fn quantity(quantity: u32) -> Result<u32, ApiError> {
    let mut violations = Violations::default();
    let quantity = check_quantity(&mut violations, Some(i64::from(quantity)));
    violations.finish(|| quantity)
}

pub fn category_form(form: &CategoryForm) -> Result<String, ApiError> {
    let mut violations = Violations::default();
    let name = check_name(&mut violations, &form.name, "Category name cannot be empty");
    violations.finish(|| name)
}

pub fn product_form(form: &ProductForm) -> Result<(String, CategoryId), ApiError> {
    let mut violations = Violations::default();
    let name = check_name(&mut violations, &form.name, "Product name cannot be empty");
    let category = positive(&form.category_id);
    if category.is_none() {
        violations.add("category_id", "Choose category");
    }
    violations.finish(|| (name, CategoryId(category.unwrap_or_default())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, GENERAL_FIELD};

    #[test]
    fn accepts_trimmed_list_form() {
        let (date, text) = list_form(&ListForm {
            date: "2024-03-09".into(),
            text: Some("  saturday market ".into()),
        })
        .expect("valid");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 9).expect("date"));
        assert_eq!(text.as_deref(), Some("saturday market"));
    }

    #[test]
    fn blank_list_text_becomes_none() {
        let (_, text) = list_form(&ListForm {
            date: "2024-03-09".into(),
            text: Some("   ".into()),
        })
        .expect("valid");
        assert_eq!(text, None);
    }

    #[test]
    fn rejects_bad_date() {
        let err = list_form(&ListForm {
            date: "2024-02-30".into(),
            text: None,
        })
        .expect_err("invalid date");
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(
            err.fields.get("date").map(String::as_str),
            Some("Please enter a valid date.")
        );
    }

    #[test]
    fn row_form_reports_every_field() {
        let err = row_form(&RowForm {
            product: "0".into(),
            quantity: "-2".into(),
        })
        .expect_err("invalid row");
        assert_eq!(
            err.fields.get("product").map(String::as_str),
            Some("Choose a product")
        );
        assert_eq!(
            err.fields.get("quantity").map(String::as_str),
            Some("Quantity must be greater than 0")
        );
        assert!(err.fields.contains_key(GENERAL_FIELD));
    }

    #[test]
    fn row_form_parses_values() {
        let (product, quantity) = row_form(&RowForm {
            product: "12".into(),
            quantity: " 3 ".into(),
        })
        .expect("valid");
        assert_eq!(product, ProductId(12));
        assert_eq!(quantity, 3);
    }

    #[test]
    fn quantity_is_bounded() {
        assert_eq!(quantity(255).expect("max"), 255);
        assert!(quantity(0).is_err());
        let err = quantity(256).expect_err("too large");
        assert_eq!(
            err.fields.get("quantity").map(String::as_str),
            Some("Quantity too large")
        );
    }

    #[test]
    fn names_must_be_present_and_short() {
        let err = category_form(&CategoryForm { name: "  ".into() }).expect_err("empty");
        assert_eq!(
            err.fields.get("name").map(String::as_str),
            Some("Category name cannot be empty")
        );

        let long = "x".repeat(MAX_NAME_CHARS + 1);
        let err = product_form(&ProductForm {
            name: long,
            category_id: "abc".into(),
        })
        .expect_err("too long");
        assert_eq!(
            err.fields.get("name").map(String::as_str),
            Some("Name too long")
        );
        assert_eq!(
            err.fields.get("category_id").map(String::as_str),
            Some("Choose category")
        );

        let (name, category) = product_form(&ProductForm {
            name: " Oat milk ".into(),
            category_id: "4".into(),
        })
        .expect("valid");
        assert_eq!(name, "Oat milk");
        assert_eq!(category, CategoryId(4));
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key under which every validation message is also collected.
pub const GENERAL_FIELD: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Conflict,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Validation failure with per-field messages. Each message is also
    /// appended to the `general` entry as `"<field>: <message>. "`.
    pub fn validation(fields: BTreeMap<String, String>) -> Self {
        let mut general = String::new();
        for (field, message) in &fields {
            general.push_str(&format!("{field}: {message}. "));
        }
        let mut fields = fields;
        fields.insert(GENERAL_FIELD.to_string(), general.trim_end().to_string());
        Self {
            code: ErrorCode::Validation,
            message: "Error validating data!".to_string(),
            fields,
        }
    }

    /// Message suitable for a one-line notice.
    pub fn detail(&self) -> String {
        match self.fields.get(GENERAL_FIELD) {
            Some(general) if !general.is_empty() => format!("{} {general}", self.message),
            _ => self.message.clone(),
        }
    }
}

#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct ApiException {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiException {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ApiException> for ApiError {
    fn from(value: ApiException) -> Self {
        Self::new(value.code, value.message)
    }
}

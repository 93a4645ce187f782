use reqwest::StatusCode;
use shared::{
    domain::RowId,
    error::{ApiError, GENERAL_FIELD},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{}", .0.detail())]
    Api(ApiError),
    #[error("server answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Short explanation for a notice: the flattened validation message when
    /// there is one, otherwise the error text.
    pub fn summary(&self) -> String {
        match self {
            ClientError::Api(err) => err
                .fields
                .get(GENERAL_FIELD)
                .filter(|general| !general.is_empty())
                .cloned()
                .unwrap_or_else(|| err.message.clone()),
            other => other.to_string(),
        }
    }
}

/// Why the add/edit/delete row workflow gave up.
#[derive(Debug, Error)]
pub enum RowFormError {
    #[error("row actions are still being processed")]
    Busy,
    #[error("{}", .0.detail())]
    Invalid(ApiError),
    #[error("Invalid product!")]
    UnknownProduct,
    #[error("Error finding row!")]
    MissingRow(RowId),
    #[error("no active shopping list")]
    NoActiveList,
    #[error("Error updating quantity!")]
    Merge(#[source] ClientError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{
        Category, CategoryId, CategorySummary, ListId, ListRow, Product, ProductId, RowAction,
        RowId, ShoppingList,
    },
    error::ApiError,
    protocol::{
        ActiveListResponse, ArchiveDetails, CategoryDetails, CategoryForm, ListForm,
        MergeRowRequest, ProductForm, RowApplied, RowForm,
    },
};
use tracing::warn;

use crate::{
    error::ClientError,
    serializer::{ApplyFailure, RowStore},
};

pub type ClientResult<T> = Result<T, ClientError>;

/// JSON client for the shopping list server.
#[derive(Debug, Clone)]
pub struct ShoppingClient {
    http: Client,
    server_url: String,
}

impl ShoppingClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self { http, server_url }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }

    pub async fn health(&self) -> ClientResult<String> {
        let res = self.http.get(self.url("/healthz")).send().await?;
        let status = res.status();
        let body = res.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(ClientError::Status { status, body })
        }
    }

    pub async fn list_categories(&self) -> ClientResult<Vec<CategorySummary>> {
        self.get("/categories").await
    }

    pub async fn category_details(&self, id: CategoryId) -> ClientResult<CategoryDetails> {
        self.get(&format!("/categories/{}", id.0)).await
    }

    pub async fn create_category(&self, name: &str) -> ClientResult<Category> {
        let form = CategoryForm {
            name: name.to_string(),
        };
        self.send_json(self.http.post(self.url("/categories")), &form)
            .await
    }

    pub async fn update_category(&self, id: CategoryId, name: &str) -> ClientResult<Category> {
        let form = CategoryForm {
            name: name.to_string(),
        };
        self.send_json(self.http.put(self.url(&format!("/categories/{}", id.0))), &form)
            .await
    }

    pub async fn list_products(&self) -> ClientResult<Vec<Product>> {
        self.get("/products").await
    }

    pub async fn product(&self, id: ProductId) -> ClientResult<Product> {
        self.get(&format!("/products/{}", id.0)).await
    }

    pub async fn create_product(&self, form: &ProductForm) -> ClientResult<Product> {
        self.send_json(self.http.post(self.url("/products")), form)
            .await
    }

    pub async fn update_product(&self, id: ProductId, form: &ProductForm) -> ClientResult<Product> {
        self.send_json(self.http.put(self.url(&format!("/products/{}", id.0))), form)
            .await
    }

    pub async fn active_list(&self) -> ClientResult<ActiveListResponse> {
        self.get("/list").await
    }

    pub async fn create_list(&self, form: &ListForm) -> ClientResult<ShoppingList> {
        self.send_json(self.http.post(self.url("/list")), form).await
    }

    pub async fn update_list(&self, id: ListId, form: &ListForm) -> ClientResult<ShoppingList> {
        self.send_json(self.http.put(self.url(&format!("/list/{}", id.0))), form)
            .await
    }

    pub async fn archive_list(&self) -> ClientResult<Vec<ListId>> {
        let res = self.http.post(self.url("/list/archive")).send().await?;
        decode(res).await
    }

    pub async fn add_row(&self, form: &RowForm) -> ClientResult<ListRow> {
        self.send_json(self.http.post(self.url("/list/rows")), form)
            .await
    }

    pub async fn apply_row_action(&self, action: &RowAction) -> ClientResult<RowApplied> {
        let path = format!("/list/rows/{}", action.row_id().0);
        self.send_json(self.http.patch(self.url(&path)), action)
            .await
    }

    pub async fn merge_row(
        &self,
        id: RowId,
        quantity: u32,
        delete_row: Option<RowId>,
    ) -> ClientResult<RowApplied> {
        let path = format!("/list/rows/{}/merge", id.0);
        let request = MergeRowRequest {
            quantity,
            delete_row,
        };
        self.send_json(self.http.post(self.url(&path)), &request)
            .await
    }

    pub async fn delete_row(&self, id: RowId) -> ClientResult<RowApplied> {
        let res = self
            .http
            .delete(self.url(&format!("/list/rows/{}", id.0)))
            .send()
            .await?;
        decode(res).await
    }

    pub async fn list_archives(&self) -> ClientResult<Vec<ShoppingList>> {
        self.get("/archive").await
    }

    pub async fn archive_details(&self, id: ListId) -> ClientResult<ArchiveDetails> {
        self.get(&format!("/archive/{}", id.0)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let res = self.http.get(self.url(path)).send().await?;
        decode(res).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        body: &B,
    ) -> ClientResult<T> {
        let res = request.json(body).send().await?;
        decode(res).await
    }
}

/// Successful bodies are decoded as `T`; failures as [`ApiError`] when the
/// server sent one.
async fn decode<T: DeserializeOwned>(res: Response) -> ClientResult<T> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json().await?);
    }
    let body = res.text().await?;
    match serde_json::from_str::<ApiError>(&body) {
        Ok(err) => Err(ClientError::Api(err)),
        Err(_) => Err(ClientError::Status { status, body }),
    }
}

#[async_trait]
impl RowStore for ShoppingClient {
    async fn apply(&self, action: &RowAction) -> Result<(), ApplyFailure> {
        match self.apply_row_action(action).await {
            Ok(applied) if applied.row_id == action.row_id() => Ok(()),
            Ok(applied) => {
                warn!(
                    expected = action.row_id().0,
                    got = applied.row_id.0,
                    "server confirmed a different row"
                );
                Err(ApplyFailure::without_detail())
            }
            Err(err) => Err(ApplyFailure::new(err.summary())),
        }
    }
}

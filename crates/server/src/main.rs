use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use server_api::ApiContext;
use shared::{
    domain::{
        Category, CategoryId, CategorySummary, ListId, ListRow, Product, ProductId, RowAction,
        RowId, ShoppingList,
    },
    error::{ApiError, ErrorCode},
    protocol::{
        ActiveListResponse, ArchiveDetails, CategoryDetails, CategoryForm, ListForm,
        MergeRowRequest, ProductForm, RowApplied, RowForm,
    },
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

type HttpResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state)).layer(RequestBodyLimitLayer::new(
        settings.max_body_bytes,
    ));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/categories", get(http_list_categories).post(http_create_category))
        .route(
            "/categories/:category_id",
            get(http_category_details).put(http_update_category),
        )
        .route("/products", get(http_list_products).post(http_create_product))
        .route(
            "/products/:product_id",
            get(http_product).put(http_update_product),
        )
        .route("/list", get(http_active_list).post(http_create_list))
        .route("/list/archive", post(http_archive_list))
        .route("/list/rows", post(http_add_row))
        .route(
            "/list/rows/:row_id",
            patch(http_apply_row_action).delete(http_delete_row),
        )
        .route("/list/rows/:row_id/merge", post(http_merge_row))
        .route("/list/:list_id", put(http_update_list))
        .route("/archive", get(http_list_archives))
        .route("/archive/:list_id", get(http_archive_details))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn http_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    (status_for(err.code), Json(err))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        error!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn http_list_categories(
    State(state): State<Arc<AppState>>,
) -> HttpResult<Vec<CategorySummary>> {
    server_api::list_categories(&state.api)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_create_category(
    State(state): State<Arc<AppState>>,
    Json(form): Json<CategoryForm>,
) -> HttpResult<Category> {
    server_api::create_category(&state.api, &form)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_category_details(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
) -> HttpResult<CategoryDetails> {
    server_api::category_details(&state.api, CategoryId(category_id))
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_update_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
    Json(form): Json<CategoryForm>,
) -> HttpResult<Category> {
    server_api::update_category(&state.api, CategoryId(category_id), &form)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_list_products(State(state): State<Arc<AppState>>) -> HttpResult<Vec<Product>> {
    server_api::list_products(&state.api)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_create_product(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ProductForm>,
) -> HttpResult<Product> {
    server_api::create_product(&state.api, &form)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
) -> HttpResult<Product> {
    server_api::product(&state.api, ProductId(product_id))
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_update_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
    Json(form): Json<ProductForm>,
) -> HttpResult<Product> {
    server_api::update_product(&state.api, ProductId(product_id), &form)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_active_list(State(state): State<Arc<AppState>>) -> HttpResult<ActiveListResponse> {
    server_api::active_list(&state.api)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_create_list(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ListForm>,
) -> HttpResult<ShoppingList> {
    server_api::create_list(&state.api, &form)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_update_list(
    State(state): State<Arc<AppState>>,
    Path(list_id): Path<i64>,
    Json(form): Json<ListForm>,
) -> HttpResult<ShoppingList> {
    server_api::update_list(&state.api, ListId(list_id), &form)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_archive_list(State(state): State<Arc<AppState>>) -> HttpResult<Vec<ListId>> {
    server_api::archive_list(&state.api)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_add_row(
    State(state): State<Arc<AppState>>,
    Json(form): Json<RowForm>,
) -> HttpResult<ListRow> {
    server_api::add_row(&state.api, &form)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_apply_row_action(
    State(state): State<Arc<AppState>>,
    Path(row_id): Path<i64>,
    Json(action): Json<RowAction>,
) -> HttpResult<RowApplied> {
    server_api::apply_row_action(&state.api, RowId(row_id), &action)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_merge_row(
    State(state): State<Arc<AppState>>,
    Path(row_id): Path<i64>,
    Json(request): Json<MergeRowRequest>,
) -> HttpResult<RowApplied> {
    server_api::merge_row(&state.api, RowId(row_id), &request)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_delete_row(
    State(state): State<Arc<AppState>>,
    Path(row_id): Path<i64>,
) -> HttpResult<RowApplied> {
    server_api::delete_row(&state.api, RowId(row_id))
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_list_archives(State(state): State<Arc<AppState>>) -> HttpResult<Vec<ShoppingList>> {
    server_api::list_archives(&state.api)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_archive_details(
    State(state): State<Arc<AppState>>,
    Path(list_id): Path<i64>,
) -> HttpResult<ArchiveDetails> {
    server_api::archive_details(&state.api, ListId(list_id))
        .await
        .map(Json)
        .map_err(http_error)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

use shared::{
    domain::{
        Category, CategoryId, CategorySummary, ListId, ListRow, Product, ProductId, RowAction,
        RowId, ShoppingList,
    },
    error::{ApiError, ApiException, ErrorCode},
    protocol::{
        ActiveListResponse, ArchiveDetails, CategoryDetails, CategoryForm, ListForm,
        MergeRowRequest, ProductForm, RowApplied, RowForm,
    },
    validation,
};
use storage::Storage;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

// categories

pub async fn list_categories(ctx: &ApiContext) -> Result<Vec<CategorySummary>, ApiError> {
    ctx.storage.list_categories().await.map_err(storage_error)
}

pub async fn category_details(
    ctx: &ApiContext,
    id: CategoryId,
) -> Result<CategoryDetails, ApiError> {
    let category = ctx
        .storage
        .category(id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "category not found"))?;
    let products = ctx
        .storage
        .products_for_category(id)
        .await
        .map_err(storage_error)?;
    Ok(CategoryDetails { category, products })
}

pub async fn create_category(ctx: &ApiContext, form: &CategoryForm) -> Result<Category, ApiError> {
    let name = validation::category_form(form).map_err(rejected)?;
    let id = ctx
        .storage
        .create_category(&name)
        .await
        .map_err(storage_error)?;
    Ok(Category { id, name })
}

pub async fn update_category(
    ctx: &ApiContext,
    id: CategoryId,
    form: &CategoryForm,
) -> Result<Category, ApiError> {
    ensure_positive(id.0, "Invalid category")?;
    let name = validation::category_form(form).map_err(rejected)?;
    let category = Category { id, name };
    ctx.storage
        .update_category(&category)
        .await
        .map_err(storage_error)?;
    Ok(category)
}

// products

pub async fn list_products(ctx: &ApiContext) -> Result<Vec<Product>, ApiError> {
    ctx.storage.list_products().await.map_err(storage_error)
}

pub async fn product(ctx: &ApiContext, id: ProductId) -> Result<Product, ApiError> {
    ctx.storage
        .product(id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "product not found"))
}

pub async fn create_product(ctx: &ApiContext, form: &ProductForm) -> Result<Product, ApiError> {
    let (name, category) = validation::product_form(form).map_err(rejected)?;
    let id = ctx
        .storage
        .create_product(&name, category)
        .await
        .map_err(storage_error)?;
    product(ctx, id).await
}

pub async fn update_product(
    ctx: &ApiContext,
    id: ProductId,
    form: &ProductForm,
) -> Result<Product, ApiError> {
    ensure_positive(id.0, "Invalid product")?;
    let (name, category) = validation::product_form(form).map_err(rejected)?;
    ctx.storage
        .update_product(id, &name, category)
        .await
        .map_err(storage_error)?;
    product(ctx, id).await
}

// active list

pub async fn active_list(ctx: &ApiContext) -> Result<ActiveListResponse, ApiError> {
    info!("fetch shopping list");
    let Some(list) = ctx.storage.active_list().await.map_err(storage_error)? else {
        return Ok(ActiveListResponse {
            list: None,
            rows: Vec::new(),
        });
    };
    let rows = ctx
        .storage
        .list_rows(list.id)
        .await
        .map_err(storage_error)?;
    Ok(ActiveListResponse {
        list: Some(list),
        rows,
    })
}

pub async fn create_list(ctx: &ApiContext, form: &ListForm) -> Result<ShoppingList, ApiError> {
    let (date, text) = validation::list_form(form).map_err(rejected)?;
    let id = ctx
        .storage
        .create_list(date, text.as_deref())
        .await
        .map_err(storage_error)?;
    Ok(ShoppingList { id, date, text })
}

pub async fn update_list(
    ctx: &ApiContext,
    id: ListId,
    form: &ListForm,
) -> Result<ShoppingList, ApiError> {
    ensure_positive(id.0, "Invalid list")?;
    let (date, text) = validation::list_form(form).map_err(rejected)?;
    let list = ShoppingList { id, date, text };
    ctx.storage.update_list(&list).await.map_err(storage_error)?;
    Ok(list)
}

pub async fn archive_list(ctx: &ApiContext) -> Result<Vec<ListId>, ApiError> {
    let archived = ctx
        .storage
        .archive_active_list()
        .await
        .map_err(storage_error)?;
    if archived.is_empty() {
        return Err(ApiError::new(
            ErrorCode::NotFound,
            "no active shopping list to archive",
        ));
    }
    Ok(archived)
}

pub async fn add_row(ctx: &ApiContext, form: &RowForm) -> Result<ListRow, ApiError> {
    let (product, quantity) = validation::row_form(form).map_err(rejected)?;
    let list = ctx
        .storage
        .active_list()
        .await
        .map_err(storage_error)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "no active shopping list"))?;
    ctx.storage
        .create_row(list.id, product, quantity)
        .await
        .map_err(storage_error)
}

/// Applies one queued row mutation. The id in the path must match the
/// id carried by the action.
pub async fn apply_row_action(
    ctx: &ApiContext,
    id: RowId,
    action: &RowAction,
) -> Result<RowApplied, ApiError> {
    if action.row_id() != id {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("row id {} does not match action row {}", id.0, action.row_id().0),
        ));
    }
    match *action {
        RowAction::Quantity { quantity, .. } | RowAction::Row { quantity, .. } => {
            validation::quantity(quantity).map_err(rejected)?;
        }
        RowAction::Check { .. } => {}
    }
    if let RowAction::Row { product, .. } = *action {
        ensure_positive(product.0, "Choose a product")?;
    }

    ctx.storage
        .apply_row_action(action)
        .await
        .map_err(storage_error)?;
    Ok(RowApplied { row_id: id })
}

pub async fn merge_row(
    ctx: &ApiContext,
    id: RowId,
    request: &MergeRowRequest,
) -> Result<RowApplied, ApiError> {
    let quantity = validation::quantity(request.quantity).map_err(rejected)?;
    ctx.storage
        .merge_row_quantity(id, quantity, request.delete_row)
        .await
        .map_err(storage_error)?;
    Ok(RowApplied { row_id: id })
}

pub async fn delete_row(ctx: &ApiContext, id: RowId) -> Result<RowApplied, ApiError> {
    ctx.storage.delete_row(id).await.map_err(storage_error)?;
    Ok(RowApplied { row_id: id })
}

// archive

pub async fn list_archives(ctx: &ApiContext) -> Result<Vec<ShoppingList>, ApiError> {
    ctx.storage.list_archives().await.map_err(storage_error)
}

pub async fn archive_details(ctx: &ApiContext, id: ListId) -> Result<ArchiveDetails, ApiError> {
    let (list, rows) = ctx
        .storage
        .archive_details(id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "archived list not found"))?;
    Ok(ArchiveDetails { list, rows })
}

fn ensure_positive(id: i64, message: &str) -> Result<(), ApiError> {
    if id > 0 {
        Ok(())
    } else {
        Err(ApiError::new(ErrorCode::Validation, message))
    }
}

fn rejected(err: ApiError) -> ApiError {
    warn!(fields = ?err.fields, "form rejected");
    err
}

/// Storage raises [`ApiException`] for conditions the caller can act on;
/// everything else is reported as an internal error.
fn storage_error(err: anyhow::Error) -> ApiError {
    match err.downcast::<ApiException>() {
        Ok(exception) => {
            warn!(code = ?exception.code, message = %exception.message, "storage rejected request");
            exception.into()
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "storage failure");
            ApiError::new(ErrorCode::Internal, err.to_string())
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

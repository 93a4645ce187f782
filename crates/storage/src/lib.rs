use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info};

use shared::{
    domain::{
        Category, CategoryId, CategorySummary, ListId, ListRow, Product, ProductId, RowAction,
        RowId, ShoppingList, ViewRow,
    },
    error::{ApiException, ErrorCode},
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

const ROW_COLUMNS: &str = "r.id, r.list_id, r.row_index, r.quantity, r.is_checked, \
     p.id, p.name, c.id, c.name";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!(%database_url, "storage ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    // categories

    pub async fn create_category(&self, name: &str) -> Result<CategoryId> {
        info!(name, "create category");
        let rec = sqlx::query("INSERT INTO categories (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "category"))?;
        Ok(CategoryId(rec.get::<i64, _>(0)))
    }

    pub async fn update_category(&self, category: &Category) -> Result<()> {
        info!(id = category.id.0, name = %category.name, "update category");
        let result = sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
            .bind(&category.name)
            .bind(category.id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "category"))?;
        expect_one(result.rows_affected(), "category", category.id.0)
    }

    pub async fn category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Category {
            id: CategoryId(r.get::<i64, _>(0)),
            name: r.get::<String, _>(1),
        }))
    }

    pub async fn list_categories(&self) -> Result<Vec<CategorySummary>> {
        let rows = sqlx::query(
            "SELECT c.id, c.name, COUNT(p.id)
             FROM categories c
             LEFT JOIN products p ON p.category_id = c.id
             GROUP BY c.id, c.name
             ORDER BY c.name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| CategorySummary {
                category: Category {
                    id: CategoryId(r.get::<i64, _>(0)),
                    name: r.get::<String, _>(1),
                },
                products: r.get::<i64, _>(2),
            })
            .collect())
    }

    pub async fn products_for_category(&self, id: CategoryId) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT p.id, p.name, c.id, c.name
             FROM products p
             INNER JOIN categories c ON c.id = p.category_id
             WHERE p.category_id = ?
             ORDER BY p.name",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| product_from_row(r, 0)).collect())
    }

    // products

    pub async fn create_product(&self, name: &str, category: CategoryId) -> Result<ProductId> {
        info!(name, category = category.0, "create product");
        let rec =
            sqlx::query("INSERT INTO products (name, category_id) VALUES (?, ?) RETURNING id")
                .bind(name)
                .bind(category.0)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| classify(e, "product"))?;
        Ok(ProductId(rec.get::<i64, _>(0)))
    }

    pub async fn update_product(
        &self,
        id: ProductId,
        name: &str,
        category: CategoryId,
    ) -> Result<()> {
        info!(id = id.0, name, category = category.0, "update product");
        let result = sqlx::query("UPDATE products SET name = ?, category_id = ? WHERE id = ?")
            .bind(name)
            .bind(category.0)
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "product"))?;
        expect_one(result.rows_affected(), "product", id.0)
    }

    pub async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT p.id, p.name, c.id, c.name
             FROM products p
             INNER JOIN categories c ON c.id = p.category_id
             WHERE p.id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| product_from_row(&r, 0)))
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT p.id, p.name, c.id, c.name
             FROM products p
             INNER JOIN categories c ON c.id = p.category_id
             ORDER BY p.name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| product_from_row(r, 0)).collect())
    }

    // active list

    /// The list currently being shopped for, if one was started.
    pub async fn active_list(&self) -> Result<Option<ShoppingList>> {
        let row = sqlx::query("SELECT id, date, text FROM shopping_list ORDER BY id LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| list_from_row(&r)))
    }

    pub async fn create_list(&self, date: NaiveDate, text: Option<&str>) -> Result<ListId> {
        info!(%date, ?text, "create shopping list");
        if let Some(active) = self.active_list().await? {
            return Err(ApiException::new(
                ErrorCode::Validation,
                format!("shopping list {} is still active", active.id.0),
            )
            .into());
        }
        let rec = sqlx::query("INSERT INTO shopping_list (date, text) VALUES (?, ?) RETURNING id")
            .bind(date)
            .bind(text)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "shopping list"))?;
        Ok(ListId(rec.get::<i64, _>(0)))
    }

    pub async fn update_list(&self, list: &ShoppingList) -> Result<()> {
        info!(id = list.id.0, date = %list.date, "update shopping list");
        let result = sqlx::query("UPDATE shopping_list SET date = ?, text = ? WHERE id = ?")
            .bind(list.date)
            .bind(list.text.as_deref())
            .bind(list.id.0)
            .execute(&self.pool)
            .await?;
        expect_one(result.rows_affected(), "shopping list", list.id.0)
    }

    pub async fn list_rows(&self, list_id: ListId) -> Result<Vec<ListRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {ROW_COLUMNS}
             FROM shopping_list_rows r
             INNER JOIN products p ON p.id = r.product_id
             INNER JOIN categories c ON c.id = p.category_id
             WHERE r.list_id = ?
             ORDER BY r.row_index"
        ))
        .bind(list_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(list_row_from_row).collect())
    }

    pub async fn row(&self, id: RowId) -> Result<Option<ListRow>> {
        let row = sqlx::query(&format!(
            "SELECT {ROW_COLUMNS}
             FROM shopping_list_rows r
             INNER JOIN products p ON p.id = r.product_id
             INNER JOIN categories c ON c.id = p.category_id
             WHERE r.id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(list_row_from_row))
    }

    /// Appends an unchecked row after the last one of `list_id`.
    pub async fn create_row(
        &self,
        list_id: ListId,
        product: ProductId,
        quantity: u32,
    ) -> Result<ListRow> {
        info!(list = list_id.0, product = product.0, quantity, "create shopping list row");
        let rec = sqlx::query(
            "INSERT INTO shopping_list_rows (list_id, product_id, row_index, quantity, is_checked)
             VALUES (?1, ?2,
                     (SELECT COALESCE(MAX(row_index), 0) + 1 FROM shopping_list_rows WHERE list_id = ?1),
                     ?3, 0)
             RETURNING id",
        )
        .bind(list_id.0)
        .bind(product.0)
        .bind(i64::from(quantity))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "shopping list row"))?;
        let id = RowId(rec.get::<i64, _>(0));
        self.row(id)
            .await?
            .with_context(|| format!("inserted row {} vanished", id.0))
    }

    pub async fn apply_row_action(&self, action: &RowAction) -> Result<()> {
        info!(?action, "update shopping list row");
        let query = match *action {
            RowAction::Check { id, checked } => {
                sqlx::query("UPDATE shopping_list_rows SET is_checked = ? WHERE id = ?")
                    .bind(checked)
                    .bind(id.0)
            }
            RowAction::Quantity { id, quantity } => {
                sqlx::query("UPDATE shopping_list_rows SET quantity = ? WHERE id = ?")
                    .bind(i64::from(quantity))
                    .bind(id.0)
            }
            RowAction::Row {
                id,
                product,
                quantity,
            } => sqlx::query(
                "UPDATE shopping_list_rows SET product_id = ?, quantity = ? WHERE id = ?",
            )
            .bind(product.0)
            .bind(i64::from(quantity))
            .bind(id.0),
        };
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "shopping list row"))?;
        expect_one(result.rows_affected(), "shopping list row", action.row_id().0)
    }

    /// Sets the quantity of `id` and drops `delete_row` in one transaction.
    /// Used when a row is saved with a product another row already holds.
    pub async fn merge_row_quantity(
        &self,
        id: RowId,
        quantity: u32,
        delete_row: Option<RowId>,
    ) -> Result<()> {
        info!(id = id.0, quantity, delete_row = ?delete_row.map(|r| r.0), "merge shopping list row quantity");
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE shopping_list_rows SET quantity = ? WHERE id = ?")
            .bind(i64::from(quantity))
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify(e, "shopping list row"))?
            .rows_affected();
        expect_one(updated, "shopping list row", id.0)?;

        if let Some(delete_row) = delete_row.filter(|d| *d != id) {
            let deleted = sqlx::query("DELETE FROM shopping_list_rows WHERE id = ?")
                .bind(delete_row.0)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            expect_one(deleted, "shopping list row", delete_row.0)?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_row(&self, id: RowId) -> Result<()> {
        info!(id = id.0, "delete shopping list row");
        let result = sqlx::query("DELETE FROM shopping_list_rows WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        expect_one(result.rows_affected(), "shopping list row", id.0)
    }

    // archive

    /// Moves the active list and its rows into the archive tables.
    /// Returns the archived list ids, empty when nothing was active.
    pub async fn archive_active_list(&self) -> Result<Vec<ListId>> {
        info!("archive shopping list");
        let mut tx = self.pool.begin().await?;

        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM shopping_list ORDER BY id")
            .fetch_all(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO old_shopping_list (id, date, text)
             SELECT id, date, text FROM shopping_list",
        )
        .execute(&mut *tx)
        .await
        .context("failed copying shopping list into archive")?;
        let rows = sqlx::query(
            "INSERT INTO old_shopping_list_rows (id, list_id, product_id, row_index, quantity, is_checked)
             SELECT id, list_id, product_id, row_index, quantity, is_checked FROM shopping_list_rows",
        )
        .execute(&mut *tx)
        .await
        .context("failed copying shopping list rows into archive")?
        .rows_affected();
        sqlx::query("DELETE FROM shopping_list_rows")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM shopping_list")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(lists = ids.len(), rows, "shopping list archived");
        Ok(ids.into_iter().map(ListId).collect())
    }

    /// Archived lists, most recent date first.
    pub async fn list_archives(&self) -> Result<Vec<ShoppingList>> {
        let rows = sqlx::query(
            "SELECT id, date, text FROM old_shopping_list ORDER BY date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(list_from_row).collect())
    }

    pub async fn archive_details(&self, id: ListId) -> Result<Option<(ShoppingList, Vec<ViewRow>)>> {
        let Some(list) = sqlx::query("SELECT id, date, text FROM old_shopping_list WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?
            .map(|r| list_from_row(&r))
        else {
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT r.id, r.row_index, c.name, p.name, r.quantity, r.is_checked
             FROM old_shopping_list_rows r
             INNER JOIN products p ON p.id = r.product_id
             INNER JOIN categories c ON c.id = p.category_id
             WHERE r.list_id = ?
             ORDER BY r.row_index",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        let rows = rows
            .into_iter()
            .map(|r| ViewRow {
                id: RowId(r.get::<i64, _>(0)),
                index: r.get::<i64, _>(1),
                category_name: r.get::<String, _>(2),
                product_name: r.get::<String, _>(3),
                quantity: quantity_from(r.get::<i64, _>(4)),
                checked: r.get::<bool, _>(5),
            })
            .collect();
        Ok(Some((list, rows)))
    }
}

fn list_from_row(r: &SqliteRow) -> ShoppingList {
    ShoppingList {
        id: ListId(r.get::<i64, _>(0)),
        date: r.get::<NaiveDate, _>(1),
        text: r.get::<Option<String>, _>(2),
    }
}

fn product_from_row(r: &SqliteRow, offset: usize) -> Product {
    Product {
        id: ProductId(r.get::<i64, _>(offset)),
        name: r.get::<String, _>(offset + 1),
        category: Category {
            id: CategoryId(r.get::<i64, _>(offset + 2)),
            name: r.get::<String, _>(offset + 3),
        },
    }
}

fn list_row_from_row(r: &SqliteRow) -> ListRow {
    ListRow {
        id: RowId(r.get::<i64, _>(0)),
        list_id: ListId(r.get::<i64, _>(1)),
        row_index: r.get::<i64, _>(2),
        quantity: quantity_from(r.get::<i64, _>(3)),
        checked: r.get::<bool, _>(4),
        product: product_from_row(r, 5),
    }
}

fn quantity_from(raw: i64) -> u32 {
    u32::try_from(raw).unwrap_or_default()
}

fn expect_one(affected: u64, table: &str, id: i64) -> Result<()> {
    if affected == 1 {
        return Ok(());
    }
    Err(ApiException::new(ErrorCode::NotFound, format!("{table} {id} not found")).into())
}

/// Turns constraint violations into client-facing exceptions; anything else
/// stays an opaque storage failure.
fn classify(err: sqlx::Error, what: &str) -> anyhow::Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return ApiException::new(ErrorCode::Conflict, format!("{what} already exists")).into();
        }
        if db.is_foreign_key_violation() {
            return ApiException::new(
                ErrorCode::Validation,
                format!("{what} references a missing record"),
            )
            .into();
        }
        if db.is_check_violation() {
            return ApiException::new(ErrorCode::Validation, format!("{what} value out of range"))
                .into();
        }
    }
    anyhow::Error::new(err).context(format!("{what} statement failed"))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

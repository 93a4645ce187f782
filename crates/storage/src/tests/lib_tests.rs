use super::*;

async fn seeded() -> (Storage, Product, Product) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let dairy = storage.create_category("Dairy").await.expect("category");
    let bakery = storage.create_category("Bakery").await.expect("category");
    let milk = storage.create_product("Milk", dairy).await.expect("product");
    let bread = storage.create_product("Bread", bakery).await.expect("product");
    let milk = storage.product(milk).await.expect("load").expect("milk");
    let bread = storage.product(bread).await.expect("load").expect("bread");
    (storage, milk, bread)
}

fn may_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).expect("date")
}

fn api_code(err: &anyhow::Error) -> Option<ErrorCode> {
    err.downcast_ref::<ApiException>().map(|e| e.code)
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn lists_categories_with_product_counts_by_name() {
    let (storage, milk, _bread) = seeded().await;
    storage.create_category("Cleaning").await.expect("category");
    storage
        .create_product("Cheese", milk.category.id)
        .await
        .expect("product");

    let categories = storage.list_categories().await.expect("categories");
    let names: Vec<_> = categories
        .iter()
        .map(|c| (c.category.name.as_str(), c.products))
        .collect();
    assert_eq!(names, vec![("Bakery", 1), ("Cleaning", 0), ("Dairy", 2)]);

    let dairy_products = storage
        .products_for_category(milk.category.id)
        .await
        .expect("products");
    assert_eq!(dairy_products.len(), 2);
    assert_eq!(dairy_products[0].name, "Cheese");
}

#[tokio::test]
async fn duplicate_names_are_conflicts() {
    let (storage, milk, _bread) = seeded().await;
    let err = storage
        .create_category("Dairy")
        .await
        .expect_err("duplicate category");
    assert_eq!(api_code(&err), Some(ErrorCode::Conflict));

    let err = storage
        .create_product("Milk", milk.category.id)
        .await
        .expect_err("duplicate product");
    assert_eq!(api_code(&err), Some(ErrorCode::Conflict));
}

#[tokio::test]
async fn product_with_unknown_category_is_rejected() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let err = storage
        .create_product("Ghost", CategoryId(42))
        .await
        .expect_err("missing category");
    assert_eq!(api_code(&err), Some(ErrorCode::Validation));
}

#[tokio::test]
async fn updating_missing_records_reports_not_found() {
    let (storage, milk, _bread) = seeded().await;
    let err = storage
        .update_category(&Category {
            id: CategoryId(99),
            name: "Nowhere".into(),
        })
        .await
        .expect_err("missing category");
    assert_eq!(api_code(&err), Some(ErrorCode::NotFound));

    let err = storage
        .update_product(ProductId(99), "Nothing", milk.category.id)
        .await
        .expect_err("missing product");
    assert_eq!(api_code(&err), Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn only_one_list_can_be_active() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage.active_list().await.expect("active").is_none());

    let id = storage
        .create_list(may_first(), Some("weekly"))
        .await
        .expect("list");
    let active = storage.active_list().await.expect("active").expect("some");
    assert_eq!(active.id, id);
    assert_eq!(active.text.as_deref(), Some("weekly"));

    let err = storage
        .create_list(may_first(), None)
        .await
        .expect_err("second list");
    assert_eq!(api_code(&err), Some(ErrorCode::Validation));
}

#[tokio::test]
async fn rows_are_appended_with_increasing_index() {
    let (storage, milk, bread) = seeded().await;
    let list = storage.create_list(may_first(), None).await.expect("list");

    let first = storage.create_row(list, milk.id, 2).await.expect("row");
    let second = storage.create_row(list, bread.id, 1).await.expect("row");
    assert_eq!(first.row_index, 1);
    assert_eq!(second.row_index, 2);
    assert!(!second.checked);
    assert_eq!(second.product, bread);

    let rows = storage.list_rows(list).await.expect("rows");
    assert_eq!(rows, vec![first, second]);
}

#[tokio::test]
async fn applies_each_row_action_kind() {
    let (storage, milk, bread) = seeded().await;
    let list = storage.create_list(may_first(), None).await.expect("list");
    let row = storage.create_row(list, milk.id, 2).await.expect("row");

    storage
        .apply_row_action(&RowAction::Check {
            id: row.id,
            checked: true,
        })
        .await
        .expect("check");
    storage
        .apply_row_action(&RowAction::Quantity {
            id: row.id,
            quantity: 7,
        })
        .await
        .expect("quantity");
    let updated = storage.row(row.id).await.expect("row").expect("some");
    assert!(updated.checked);
    assert_eq!(updated.quantity, 7);

    storage
        .apply_row_action(&RowAction::Row {
            id: row.id,
            product: bread.id,
            quantity: 3,
        })
        .await
        .expect("row");
    let updated = storage.row(row.id).await.expect("row").expect("some");
    assert_eq!(updated.product, bread);
    assert_eq!(updated.quantity, 3);
    assert!(updated.checked);
}

#[tokio::test]
async fn row_action_on_missing_row_is_not_found() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let err = storage
        .apply_row_action(&RowAction::Check {
            id: RowId(5),
            checked: true,
        })
        .await
        .expect_err("missing row");
    assert_eq!(api_code(&err), Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn merge_updates_quantity_and_drops_edited_row() {
    let (storage, milk, bread) = seeded().await;
    let list = storage.create_list(may_first(), None).await.expect("list");
    let keep = storage.create_row(list, milk.id, 2).await.expect("row");
    let edited = storage.create_row(list, bread.id, 1).await.expect("row");

    storage
        .merge_row_quantity(keep.id, 5, Some(edited.id))
        .await
        .expect("merge");

    let rows = storage.list_rows(list).await.expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, keep.id);
    assert_eq!(rows[0].quantity, 5);
}

#[tokio::test]
async fn failed_merge_leaves_rows_untouched() {
    let (storage, milk, _bread) = seeded().await;
    let list = storage.create_list(may_first(), None).await.expect("list");
    let keep = storage.create_row(list, milk.id, 2).await.expect("row");

    let err = storage
        .merge_row_quantity(keep.id, 5, Some(RowId(404)))
        .await
        .expect_err("missing delete target");
    assert_eq!(api_code(&err), Some(ErrorCode::NotFound));

    let row = storage.row(keep.id).await.expect("row").expect("some");
    assert_eq!(row.quantity, 2);
}

#[tokio::test]
async fn archive_moves_list_and_rows() {
    let (storage, milk, bread) = seeded().await;
    let list = storage
        .create_list(may_first(), Some("party"))
        .await
        .expect("list");
    let first = storage.create_row(list, milk.id, 2).await.expect("row");
    storage.create_row(list, bread.id, 4).await.expect("row");
    storage
        .apply_row_action(&RowAction::Check {
            id: first.id,
            checked: true,
        })
        .await
        .expect("check");

    let archived = storage.archive_active_list().await.expect("archive");
    assert_eq!(archived, vec![list]);
    assert!(storage.active_list().await.expect("active").is_none());
    assert!(storage.list_rows(list).await.expect("rows").is_empty());

    let archives = storage.list_archives().await.expect("archives");
    assert_eq!(archives.len(), 1);
    assert_eq!(archives[0].text.as_deref(), Some("party"));

    let (details, rows) = storage
        .archive_details(list)
        .await
        .expect("details")
        .expect("some");
    assert_eq!(details.id, list);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].product_name, "Milk");
    assert_eq!(rows[0].category_name, "Dairy");
    assert!(rows[0].checked);
    assert_eq!(rows[1].quantity, 4);
}

#[tokio::test]
async fn new_list_after_archive_gets_fresh_ids() {
    let (storage, milk, _bread) = seeded().await;
    let first = storage.create_list(may_first(), None).await.expect("list");
    let first_row = storage.create_row(first, milk.id, 1).await.expect("row");
    storage.archive_active_list().await.expect("archive");

    let second = storage.create_list(may_first(), None).await.expect("list");
    let second_row = storage.create_row(second, milk.id, 1).await.expect("row");
    assert!(second.0 > first.0);
    assert!(second_row.id.0 > first_row.id.0);
    assert_eq!(second_row.row_index, 1);

    storage.archive_active_list().await.expect("second archive");
    assert_eq!(storage.list_archives().await.expect("archives").len(), 2);
}

#[tokio::test]
async fn archive_without_active_list_is_empty() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let archived = storage.archive_active_list().await.expect("archive");
    assert!(archived.is_empty());
    assert!(storage
        .archive_details(ListId(1))
        .await
        .expect("details")
        .is_none());
}

use super::*;

async fn setup() -> (ApiContext, Product, Product) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let ctx = ApiContext { storage };
    let dairy = create_category(&ctx, &CategoryForm { name: "Dairy".into() })
        .await
        .expect("category");
    let milk = create_product(
        &ctx,
        &ProductForm {
            name: "Milk".into(),
            category_id: dairy.id.0.to_string(),
        },
    )
    .await
    .expect("product");
    let butter = create_product(
        &ctx,
        &ProductForm {
            name: "Butter".into(),
            category_id: dairy.id.0.to_string(),
        },
    )
    .await
    .expect("product");
    (ctx, milk, butter)
}

async fn start_list(ctx: &ApiContext) -> ShoppingList {
    create_list(
        ctx,
        &ListForm {
            date: "2024-06-01".into(),
            text: None,
        },
    )
    .await
    .expect("list")
}

fn row_form(product: &Product, quantity: &str) -> RowForm {
    RowForm {
        product: product.id.0.to_string(),
        quantity: quantity.into(),
    }
}

#[tokio::test]
async fn invalid_category_form_never_reaches_storage() {
    let (ctx, _, _) = setup().await;
    let err = create_category(&ctx, &CategoryForm { name: " ".into() })
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);

    let categories = list_categories(&ctx).await.expect("categories");
    assert_eq!(categories.len(), 1);
}

#[tokio::test]
async fn duplicate_category_is_conflict() {
    let (ctx, _, _) = setup().await;
    let err = create_category(&ctx, &CategoryForm { name: "Dairy".into() })
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Conflict);
}

#[tokio::test]
async fn category_details_include_products_by_name() {
    let (ctx, milk, _) = setup().await;
    let details = category_details(&ctx, milk.category.id)
        .await
        .expect("details");
    let names: Vec<_> = details.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Butter", "Milk"]);

    let err = category_details(&ctx, CategoryId(77))
        .await
        .expect_err("missing");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn update_product_moves_category() {
    let (ctx, milk, _) = setup().await;
    let drinks = create_category(&ctx, &CategoryForm { name: "Drinks".into() })
        .await
        .expect("category");
    let moved = update_product(
        &ctx,
        milk.id,
        &ProductForm {
            name: "Milk".into(),
            category_id: drinks.id.0.to_string(),
        },
    )
    .await
    .expect("update");
    assert_eq!(moved.category, drinks);
}

#[tokio::test]
async fn active_list_is_empty_before_start() {
    let (ctx, _, _) = setup().await;
    let response = active_list(&ctx).await.expect("list");
    assert!(response.list.is_none());
    assert!(response.rows.is_empty());

    let err = add_row(&ctx, &RowForm {
        product: "1".into(),
        quantity: "1".into(),
    })
    .await
    .expect_err("no list");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn rows_added_to_active_list() {
    let (ctx, milk, butter) = setup().await;
    let list = start_list(&ctx).await;
    add_row(&ctx, &row_form(&milk, "2")).await.expect("row");
    add_row(&ctx, &row_form(&butter, "1")).await.expect("row");

    let response = active_list(&ctx).await.expect("list");
    assert_eq!(response.list, Some(list));
    assert_eq!(response.rows.len(), 2);
    assert_eq!(response.rows[0].product, milk);
    assert_eq!(response.rows[1].row_index, 2);
}

#[tokio::test]
async fn row_action_must_target_path_row() {
    let (ctx, milk, _) = setup().await;
    start_list(&ctx).await;
    let row = add_row(&ctx, &row_form(&milk, "2")).await.expect("row");

    let err = apply_row_action(
        &ctx,
        RowId(row.id.0 + 1),
        &RowAction::Check {
            id: row.id,
            checked: true,
        },
    )
    .await
    .expect_err("mismatch");
    assert_eq!(err.code, ErrorCode::Validation);

    let err = apply_row_action(
        &ctx,
        row.id,
        &RowAction::Quantity {
            id: row.id,
            quantity: 0,
        },
    )
    .await
    .expect_err("zero quantity");
    assert_eq!(err.code, ErrorCode::Validation);

    let applied = apply_row_action(
        &ctx,
        row.id,
        &RowAction::Quantity {
            id: row.id,
            quantity: 9,
        },
    )
    .await
    .expect("apply");
    assert_eq!(applied.row_id, row.id);
    let rows = active_list(&ctx).await.expect("list").rows;
    assert_eq!(rows[0].quantity, 9);
}

#[tokio::test]
async fn row_action_on_deleted_row_is_not_found() {
    let (ctx, milk, _) = setup().await;
    start_list(&ctx).await;
    let row = add_row(&ctx, &row_form(&milk, "2")).await.expect("row");
    delete_row(&ctx, row.id).await.expect("delete");

    let err = apply_row_action(
        &ctx,
        row.id,
        &RowAction::Check {
            id: row.id,
            checked: true,
        },
    )
    .await
    .expect_err("gone");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn merge_row_sums_into_existing_row() {
    let (ctx, milk, butter) = setup().await;
    start_list(&ctx).await;
    let keep = add_row(&ctx, &row_form(&milk, "2")).await.expect("row");
    let edited = add_row(&ctx, &row_form(&butter, "1")).await.expect("row");

    merge_row(
        &ctx,
        keep.id,
        &MergeRowRequest {
            quantity: 5,
            delete_row: Some(edited.id),
        },
    )
    .await
    .expect("merge");

    let rows = active_list(&ctx).await.expect("list").rows;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 5);
}

#[tokio::test]
async fn archive_round_trip() {
    let (ctx, milk, _) = setup().await;
    let list = start_list(&ctx).await;
    add_row(&ctx, &row_form(&milk, "3")).await.expect("row");

    let archived = archive_list(&ctx).await.expect("archive");
    assert_eq!(archived, vec![list.id]);
    let err = archive_list(&ctx).await.expect_err("nothing active");
    assert_eq!(err.code, ErrorCode::NotFound);

    let archives = list_archives(&ctx).await.expect("archives");
    assert_eq!(archives, vec![list.clone()]);
    let details = archive_details(&ctx, list.id).await.expect("details");
    assert_eq!(details.rows.len(), 1);
    assert_eq!(details.rows[0].product_name, "Milk");
    assert_eq!(details.rows[0].quantity, 3);
}

#[tokio::test]
async fn update_list_validates_and_persists() {
    let (ctx, _, _) = setup().await;
    let list = start_list(&ctx).await;

    let err = update_list(
        &ctx,
        list.id,
        &ListForm {
            date: "not a date".into(),
            text: None,
        },
    )
    .await
    .expect_err("bad date");
    assert_eq!(err.code, ErrorCode::Validation);

    let updated = update_list(
        &ctx,
        list.id,
        &ListForm {
            date: "2024-06-02".into(),
            text: Some("sunday".into()),
        },
    )
    .await
    .expect("update");
    let response = active_list(&ctx).await.expect("list");
    assert_eq!(response.list, Some(updated));
}

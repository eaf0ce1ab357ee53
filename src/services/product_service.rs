use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

use crate::dto::products::{
    CreateProductRequest, CreateSizeRequest, ProductList, UpdateProductRequest, UpdateSizeRequest,
};
use crate::{
    audit,
    entity::{
        product_sizes::{ActiveModel as SizeActive, Column as SizeCol, Entity as ProductSizes},
        products::{ActiveModel, Column, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, ProductSize, ProductWithSizes},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    services::inventory_service,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(Column::IsActive.eq(true));

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::BasePrice => Column::BasePrice,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product(state: &AppState, id: i32) -> AppResult<ApiResponse<ProductWithSizes>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    let sizes = ProductSizes::find()
        .filter(SizeCol::ProductId.eq(product.id))
        .order_by_asc(SizeCol::Price)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ProductSize::from)
        .collect();

    Ok(ApiResponse::success(
        "Product",
        ProductWithSizes {
            product: Product::from(product),
            sizes,
        },
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.name.trim().is_empty() || payload.category.trim().is_empty() {
        return Err(AppError::BadRequest("name and category are required".into()));
    }
    if payload.base_price < 0 {
        return Err(AppError::BadRequest("base_price cannot be negative".into()));
    }

    let active = ActiveModel {
        id: NotSet,
        name: Set(payload.name.trim().to_string()),
        category: Set(payload.category.trim().to_string()),
        description: Set(payload.description),
        base_price: Set(payload.base_price),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::single("Product created", Product::from(product)))
}

/// Catalog edits only touch `products`; order items keep their own snapshot.
pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("name cannot be blank".into()));
        }
        active.name = Set(name.trim().to_string());
    }
    if let Some(category) = payload.category {
        if category.trim().is_empty() {
            return Err(AppError::BadRequest("category cannot be blank".into()));
        }
        active.category = Set(category.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(base_price) = payload.base_price {
        if base_price < 0 {
            return Err(AppError::BadRequest("base_price cannot be negative".into()));
        }
        active.base_price = Set(base_price);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::single("Updated", Product::from(product)))
}

/// Soft delete: past orders still reference the product.
pub async fn deactivate_product(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::update_many()
        .col_expr(Column::IsActive, Expr::value(false))
        .col_expr(Column::UpdatedAt, Expr::current_timestamp().into())
        .filter(Column::Id.eq(id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Product {id}")));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_deactivate",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::single("Deleted", serde_json::json!({})))
}

pub async fn add_size(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
    payload: CreateSizeRequest,
) -> AppResult<ApiResponse<ProductSize>> {
    ensure_admin(user)?;
    if payload.size_label.trim().is_empty() {
        return Err(AppError::BadRequest("size_label is required".into()));
    }
    if payload.price < 0 || payload.initial_stock < 0 {
        return Err(AppError::BadRequest(
            "price and initial_stock cannot be negative".into(),
        ));
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {product_id}")))?;

    let size = SizeActive {
        id: NotSet,
        product_id: Set(product.id),
        size_label: Set(payload.size_label.trim().to_string()),
        price: Set(payload.price),
        stock_quantity: Set(payload.initial_stock),
        nutrition: Set(payload.nutrition),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;
    inventory_service::record_initial_stock(&txn, size.id, size.stock_quantity, user.user_id)
        .await?;
    txn.commit().await?;

    Ok(ApiResponse::single("Size created", ProductSize::from(size)))
}

pub async fn update_size(
    state: &AppState,
    user: &AuthUser,
    size_id: i32,
    payload: UpdateSizeRequest,
) -> AppResult<ApiResponse<ProductSize>> {
    ensure_admin(user)?;
    let existing = ProductSizes::find_by_id(size_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product size {size_id}")))?;

    let mut active: SizeActive = existing.into();
    if let Some(label) = payload.size_label.filter(|l| !l.trim().is_empty()) {
        active.size_label = Set(label);
    }
    if let Some(price) = payload.price {
        if price < 0 {
            return Err(AppError::BadRequest("price cannot be negative".into()));
        }
        active.price = Set(price);
    }
    if let Some(nutrition) = payload.nutrition {
        active.nutrition = Set(Some(nutrition));
    }
    active.updated_at = Set(Utc::now().into());
    let size = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "size_update",
        "product_sizes",
        serde_json::json!({ "product_size_id": size.id }),
    )
    .await;

    Ok(ApiResponse::single("Updated", ProductSize::from(size)))
}

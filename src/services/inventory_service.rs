//! Every write to `product_sizes.stock_quantity` goes through this module and
//! appends exactly one `stock_history` row.

use std::collections::{HashMap, HashSet};

use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{StockChangeType, stock::StockMovement},
    dto::inventory::{
        BulkStockRequest, BulkStockResult, LowStockQuery, SetStockRequest, SizeList, StockChange,
        StockHistoryList,
    },
    entity::{
        product_sizes::{Column as SizeCol, Entity as ProductSizes, Model as ProductSizeModel},
        stock_history::{
            ActiveModel as HistoryActive, Column as HistoryCol, Entity as StockHistory,
            Model as HistoryModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{ProductSize, StockHistoryEntry},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

/// Remove `quantity` units sold on an order.
///
/// The decrement is conditional on enough stock remaining, so it can never
/// drive the row negative even if the caller's view of `previous` is stale;
/// a zero-row update is reported as insufficient stock.
pub(crate) async fn apply_sale<C: ConnectionTrait>(
    conn: &C,
    product_size_id: i32,
    product_name: &str,
    previous: i32,
    quantity: i32,
    actor: Option<Uuid>,
    note: &str,
) -> AppResult<StockMovement> {
    let insufficient = || AppError::InsufficientStock {
        product_size_id,
        product_name: product_name.to_string(),
        available: previous,
        requested: quantity,
    };
    let movement = StockMovement::sale(previous, quantity).ok_or_else(&insufficient)?;

    let result = ProductSizes::update_many()
        .col_expr(
            SizeCol::StockQuantity,
            Expr::col(SizeCol::StockQuantity).sub(quantity),
        )
        .col_expr(SizeCol::UpdatedAt, Expr::current_timestamp().into())
        .filter(SizeCol::Id.eq(product_size_id))
        .filter(SizeCol::StockQuantity.gte(quantity))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(insufficient());
    }

    append_ledger(
        conn,
        product_size_id,
        movement,
        StockChangeType::Sale,
        actor,
        Some(note.to_string()),
    )
    .await?;
    Ok(movement)
}

/// Set a locked row to an absolute value. No-op movements write nothing.
async fn apply_set<C: ConnectionTrait>(
    conn: &C,
    product_size_id: i32,
    movement: StockMovement,
    change_type: StockChangeType,
    actor: Uuid,
    notes: Option<String>,
) -> AppResult<bool> {
    if movement.is_noop() {
        return Ok(false);
    }

    ProductSizes::update_many()
        .col_expr(SizeCol::StockQuantity, Expr::value(movement.new))
        .col_expr(SizeCol::UpdatedAt, Expr::current_timestamp().into())
        .filter(SizeCol::Id.eq(product_size_id))
        .exec(conn)
        .await?;

    append_ledger(conn, product_size_id, movement, change_type, Some(actor), notes).await?;
    Ok(true)
}

async fn append_ledger<C: ConnectionTrait>(
    conn: &C,
    product_size_id: i32,
    movement: StockMovement,
    change_type: StockChangeType,
    actor: Option<Uuid>,
    notes: Option<String>,
) -> AppResult<HistoryModel> {
    let row = HistoryActive {
        id: NotSet,
        product_size_id: Set(product_size_id),
        previous_stock: Set(movement.previous),
        new_stock: Set(movement.new),
        change_amount: Set(movement.delta()),
        change_type: Set(change_type),
        changed_by: Set(actor),
        notes: Set(notes),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(row)
}

/// Ledger entry for stock a SKU is created with.
pub(crate) async fn record_initial_stock<C: ConnectionTrait>(
    conn: &C,
    product_size_id: i32,
    quantity: i32,
    actor: Uuid,
) -> AppResult<()> {
    if quantity > 0 {
        append_ledger(
            conn,
            product_size_id,
            StockMovement {
                previous: 0,
                new: quantity,
            },
            StockChangeType::Restock,
            Some(actor),
            Some("Initial stock".into()),
        )
        .await?;
    }
    Ok(())
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

pub async fn set_stock(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: SetStockRequest,
) -> AppResult<ApiResponse<StockChange>> {
    ensure_admin(user)?;
    if payload.stock_quantity < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }

    let txn = state.orm.begin().await?;
    let size = ProductSizes::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product size {id}")))?;

    let movement = StockMovement::to_target(size.stock_quantity, payload.stock_quantity)
        .ok_or_else(|| AppError::BadRequest("stock cannot be negative".into()))?;
    let change_type = StockChangeType::for_admin_change(movement.delta(), false);
    let recorded = apply_set(
        &txn,
        size.id,
        movement,
        change_type,
        user.user_id,
        clean_notes(payload.notes),
    )
    .await?;
    txn.commit().await?;

    if recorded {
        audit::record(
            &state.pool,
            Some(user.user_id),
            "stock_set",
            "product_sizes",
            serde_json::json!({
                "product_size_id": size.id,
                "previous_stock": movement.previous,
                "new_stock": movement.new,
            }),
        )
        .await;
    }

    Ok(ApiResponse::single(
        "Stock updated",
        StockChange {
            product_size_id: size.id,
            previous_stock: movement.previous,
            new_stock: movement.new,
            recorded,
        },
    ))
}

pub async fn bulk_update_stock(
    state: &AppState,
    user: &AuthUser,
    payload: BulkStockRequest,
) -> AppResult<ApiResponse<BulkStockResult>> {
    ensure_admin(user)?;
    if payload.updates.is_empty() {
        return Err(AppError::BadRequest("updates must not be empty".into()));
    }
    let mut seen = HashSet::new();
    for update in &payload.updates {
        if update.stock_quantity < 0 {
            return Err(AppError::BadRequest(format!(
                "stock for size {} cannot be negative",
                update.product_size_id
            )));
        }
        if !seen.insert(update.product_size_id) {
            return Err(AppError::BadRequest(format!(
                "size {} appears more than once",
                update.product_size_id
            )));
        }
    }
    let in_batch = payload.updates.len() > 1;
    let notes = clean_notes(payload.notes);

    let txn = state.orm.begin().await?;
    let ids: Vec<i32> = {
        let mut ids: Vec<i32> = seen.into_iter().collect();
        ids.sort_unstable();
        ids
    };
    let rows: HashMap<i32, ProductSizeModel> = ProductSizes::find()
        .filter(SizeCol::Id.is_in(ids))
        .order_by_asc(SizeCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|row| (row.id, row))
        .collect();

    let mut changes = Vec::with_capacity(payload.updates.len());
    for update in &payload.updates {
        let Some(row) = rows.get(&update.product_size_id) else {
            txn.rollback().await?;
            return Err(AppError::NotFound(format!(
                "Product size {}",
                update.product_size_id
            )));
        };
        let movement = StockMovement {
            previous: row.stock_quantity,
            new: update.stock_quantity,
        };
        let change_type = StockChangeType::for_admin_change(movement.delta(), in_batch);
        let recorded = apply_set(
            &txn,
            row.id,
            movement,
            change_type,
            user.user_id,
            notes.clone(),
        )
        .await?;
        changes.push(StockChange {
            product_size_id: row.id,
            previous_stock: movement.previous,
            new_stock: movement.new,
            recorded,
        });
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "stock_bulk_update",
        "product_sizes",
        serde_json::json!({
            "sizes": changes.iter().filter(|c| c.recorded).map(|c| c.product_size_id).collect::<Vec<_>>(),
        }),
    )
    .await;

    Ok(ApiResponse::single(
        "Stock updated",
        BulkStockResult { changes },
    ))
}

pub async fn stock_history(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    pagination: Pagination,
) -> AppResult<ApiResponse<StockHistoryList>> {
    ensure_admin(user)?;
    let exists = ProductSizes::find_by_id(id).count(&state.orm).await? > 0;
    if !exists {
        return Err(AppError::NotFound(format!("Product size {id}")));
    }

    let (page, limit, offset) = pagination.normalize();
    let finder = StockHistory::find()
        .filter(HistoryCol::ProductSizeId.eq(id))
        .order_by_desc(HistoryCol::CreatedAt)
        .order_by_desc(HistoryCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(StockHistoryEntry::from)
        .collect();

    Ok(ApiResponse::success(
        "Stock history",
        StockHistoryList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<SizeList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let (page, limit, offset) = query.pagination().normalize();

    let finder = ProductSizes::find()
        .filter(SizeCol::StockQuantity.lte(threshold))
        .order_by_asc(SizeCol::StockQuantity)
        .order_by_asc(SizeCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ProductSize::from)
        .collect();

    Ok(ApiResponse::success(
        "Low stock",
        SizeList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

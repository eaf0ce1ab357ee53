use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{OrderStatus, coupon, order_number},
    dto::orders::{
        OrderList, OrderWithItems, PlaceOrderRequest, PlacedOrder, UpdateOrderStatusRequest,
    },
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        product_sizes::{Column as SizeCol, Entity as ProductSizes, Model as ProductSizeModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    events::{DomainEvent, OrderPlaced},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{coupon_service, inventory_service},
    state::AppState,
};

/// Place an order and deduct its stock in one transaction.
///
/// Either the order, its items, every stock decrement and every ledger row
/// are committed together, or nothing is. The first failing line aborts the
/// whole order.
pub async fn place_order(
    state: &AppState,
    user: Option<&AuthUser>,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<PlacedOrder>> {
    validate_order_request(&payload)?;
    let user_id = user.map(|u| u.user_id);

    let txn = state.orm.begin().await?;
    let order = match place_in_txn(&txn, user_id, &payload).await {
        Ok(order) => order,
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            tracing::info!(error = %err, ?user_id, "order rejected");
            return Err(err);
        }
    };
    txn.commit().await?;

    let number = order_number(order.id);
    tracing::info!(
        order_number = %number,
        ?user_id,
        total = order.total_amount,
        "order placed"
    );

    state.events.publish(DomainEvent::OrderPlaced(OrderPlaced {
        order_id: order.id,
        order_number: number.clone(),
        customer_name: order.customer_name.clone(),
        customer_email: order.customer_email.clone(),
        total_amount: order.total_amount,
        item_count: payload.items.len(),
        placed_at: order.created_at.with_timezone(&Utc),
    }));

    audit::record(
        &state.pool,
        user_id,
        "order_placed",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount }),
    )
    .await;

    Ok(ApiResponse::single(
        "Order placed",
        PlacedOrder {
            order_id: order.id,
            order_number: number,
            status: order.status,
            subtotal_amount: order.subtotal_amount,
            discount_amount: order.discount_amount,
            total_amount: order.total_amount,
            created_at: order.created_at.with_timezone(&Utc),
        },
    ))
}

/// Shape checks that need no database access.
pub fn validate_order_request(payload: &PlaceOrderRequest) -> AppResult<()> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest(
            "Order must contain at least one item".into(),
        ));
    }
    for (idx, item) in payload.items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "Item {} has an invalid quantity",
                idx + 1
            )));
        }
    }
    let required = [
        ("customer_name", &payload.customer_name),
        ("customer_phone", &payload.customer_phone),
        ("delivery_address", &payload.delivery_address),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} is required")));
        }
    }
    if !payload.customer_email.contains('@') {
        return Err(AppError::BadRequest(
            "customer_email must be a valid email".into(),
        ));
    }
    Ok(())
}

async fn place_in_txn(
    txn: &DatabaseTransaction,
    user_id: Option<Uuid>,
    payload: &PlaceOrderRequest,
) -> AppResult<OrderModel> {
    let mut size_ids: Vec<i32> = payload.items.iter().map(|i| i.product_size_id).collect();
    size_ids.sort_unstable();
    size_ids.dedup();

    // Rows are locked in id order so concurrent checkouts cannot deadlock.
    let sizes: HashMap<i32, ProductSizeModel> = ProductSizes::find()
        .filter(SizeCol::Id.is_in(size_ids))
        .order_by_asc(SizeCol::Id)
        .lock(LockType::Update)
        .all(txn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut product_ids: Vec<i32> = sizes.values().map(|s| s.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();
    let products: HashMap<i32, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    // Every line is checked before the first write.
    let mut lines: Vec<(&ProductSizeModel, &ProductModel, i32)> = Vec::new();
    let mut requested: HashMap<i32, i32> = HashMap::new();
    let mut subtotal: i64 = 0;
    for item in &payload.items {
        let size = sizes
            .get(&item.product_size_id)
            .ok_or_else(|| AppError::NotFound(format!("Product size {}", item.product_size_id)))?;
        let product = products
            .get(&size.product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Product size {}", item.product_size_id)))?;

        let wanted = requested.entry(size.id).or_insert(0);
        let total = wanted.checked_add(item.quantity);
        *wanted = total.unwrap_or(i32::MAX);
        if total.is_none_or(|total| total > size.stock_quantity) {
            return Err(AppError::InsufficientStock {
                product_size_id: size.id,
                product_name: product.name.clone(),
                available: size.stock_quantity,
                requested: *wanted,
            });
        }

        subtotal += size.price * i64::from(item.quantity);
        lines.push((size, product, item.quantity));
    }

    let redemption = match payload
        .coupon_code
        .as_deref()
        .map(coupon::normalize_code)
        .filter(|code| !code.is_empty())
    {
        Some(code) => Some(coupon_service::quote_in_txn(txn, &code, subtotal, user_id).await?),
        None => None,
    };
    let discount = redemption.as_ref().map_or(0, |(_, quote)| quote.discount);

    let order = OrderActive {
        id: NotSet,
        user_id: Set(user_id),
        subtotal_amount: Set(subtotal),
        discount_amount: Set(discount),
        total_amount: Set(subtotal - discount),
        coupon_code: Set(redemption.as_ref().map(|(c, _)| c.code.clone())),
        status: Set(OrderStatus::Pending),
        payment_method: Set(payload.payment_method),
        delivery_address: Set(payload.delivery_address.trim().to_string()),
        customer_name: Set(payload.customer_name.trim().to_string()),
        customer_email: Set(payload.customer_email.trim().to_string()),
        customer_phone: Set(payload.customer_phone.trim().to_string()),
        estimated_delivery_date: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(txn)
    .await?;

    let note = format!("Order #{}", order_number(order.id));
    let mut remaining: HashMap<i32, i32> =
        sizes.values().map(|s| (s.id, s.stock_quantity)).collect();

    for (size, product, quantity) in lines {
        OrderItemActive {
            id: NotSet,
            order_id: Set(order.id),
            product_id: Set(product.id),
            product_size_id: Set(size.id),
            product_name: Set(product.name.clone()),
            size_label: Set(size.size_label.clone()),
            price: Set(size.price),
            quantity: Set(quantity),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;

        let previous = remaining.get(&size.id).copied().unwrap_or(size.stock_quantity);
        let movement = inventory_service::apply_sale(
            txn,
            size.id,
            &product.name,
            previous,
            quantity,
            user_id,
            &note,
        )
        .await?;
        remaining.insert(size.id, movement.new);
    }

    if let Some((coupon, quote)) = &redemption {
        coupon_service::record_redemption(txn, coupon, user_id, order.id, quote.discount).await?;
    }

    Ok(order)
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    find_orders(state, Some(user.user_id), query).await
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    find_orders(state, None, query).await
}

async fn find_orders(
    state: &AppState,
    owner: Option<Uuid>,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(owner) = owner {
        condition = condition.add(OrderCol::UserId.eq(owner));
    }
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;

    with_items(state, order).await
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;

    with_items(state, order).await
}

async fn with_items(state: &AppState, order: OrderModel) -> AppResult<ApiResponse<OrderWithItems>> {
    let items: Vec<OrderItem> = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::single(
        "OK",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
    ))
}

/// Admin status change. Only `status`, `updated_at` and optionally
/// `estimated_delivery_date` are written; line items are never touched.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;

    let previous = existing.status;
    OrderStatus::check_transition(previous, payload.status)?;

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    if let Some(date) = payload.estimated_delivery_date {
        active.estimated_delivery_date = Set(Some(date));
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "from": previous,
            "to": order.status,
            "estimated_delivery_date": order.estimated_delivery_date,
        }),
    )
    .await;

    Ok(ApiResponse::single("Order updated", Order::from(order)))
}

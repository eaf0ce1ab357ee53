mod common;

use common::{create_admin, create_sku, create_user, ledger, order_request, setup, stock_of};
use juice_shop_api::{
    domain::{OrderStatus, StockChangeType, order_number},
    dto::{
        orders::UpdateOrderStatusRequest,
        products::{UpdateProductRequest, UpdateSizeRequest},
    },
    entity::order_items::{Column as ItemCol, Entity as OrderItems},
    error::AppError,
    events::DomainEvent,
    services::{order_service, product_service},
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

async fn items_for_size(orm: &sea_orm::DatabaseConnection, size_id: i32) -> anyhow::Result<u64> {
    Ok(OrderItems::find()
        .filter(ItemCol::ProductSizeId.eq(size_id))
        .count(orm)
        .await?)
}

#[tokio::test]
async fn checkout_decrements_stock_and_writes_one_sale_row() -> anyhow::Result<()> {
    let Some(mut app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let customer = create_user(&app.state, "user").await?;
    let size = create_sku(&app.state, &admin, "Mango Mint", 12_000, 5).await?;

    let placed = order_service::place_order(
        &app.state,
        Some(&customer),
        order_request(&[(size.id, 2)]),
    )
    .await?
    .data
    .expect("placed order");

    assert_eq!(placed.status, OrderStatus::Pending);
    assert_eq!(placed.order_number, order_number(placed.order_id));
    assert_eq!(placed.subtotal_amount, 24_000);
    assert_eq!(placed.discount_amount, 0);
    assert_eq!(placed.total_amount, 24_000);
    assert_eq!(stock_of(&app.state, size.id).await?, 3);

    let rows = ledger(&app.state, size.id).await?;
    let sales: Vec<_> = rows
        .iter()
        .filter(|r| r.change_type == StockChangeType::Sale)
        .collect();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].previous_stock, 5);
    assert_eq!(sales[0].new_stock, 3);
    assert_eq!(sales[0].change_amount, -2);
    assert_eq!(sales[0].changed_by, Some(customer.user_id));
    assert_eq!(
        sales[0].notes.as_deref(),
        Some(format!("Order #{}", placed.order_number).as_str())
    );

    match app.events.try_recv()? {
        DomainEvent::OrderPlaced(event) => {
            assert_eq!(event.order_id, placed.order_id);
            assert_eq!(event.total_amount, 24_000);
            assert_eq!(event.item_count, 1);
        }
    }

    Ok(())
}

#[tokio::test]
async fn insufficient_stock_rejects_without_side_effects() -> anyhow::Result<()> {
    let Some(mut app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let size = create_sku(&app.state, &admin, "Watermelon Cooler", 9_000, 5).await?;
    let history_before = ledger(&app.state, size.id).await?.len();

    let err = order_service::place_order(&app.state, None, order_request(&[(size.id, 10)]))
        .await
        .expect_err("order should be rejected");

    match err {
        AppError::InsufficientStock {
            product_size_id,
            available,
            requested,
            ..
        } => {
            assert_eq!(product_size_id, size.id);
            assert_eq!(available, 5);
            assert_eq!(requested, 10);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(stock_of(&app.state, size.id).await?, 5);
    assert_eq!(ledger(&app.state, size.id).await?.len(), history_before);
    assert_eq!(items_for_size(&app.state.orm, size.id).await?, 0);
    assert!(app.events.try_recv().is_err(), "no event for a failed order");

    Ok(())
}

#[tokio::test]
async fn one_short_line_rolls_back_the_whole_order() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let plenty = create_sku(&app.state, &admin, "Orange Classic", 8_000, 10).await?;
    let scarce = create_sku(&app.state, &admin, "Pomegranate Punch", 15_000, 1).await?;

    let err = order_service::place_order(
        &app.state,
        None,
        order_request(&[(plenty.id, 3), (scarce.id, 2)]),
    )
    .await
    .expect_err("second line is short");
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    assert_eq!(stock_of(&app.state, plenty.id).await?, 10);
    assert_eq!(stock_of(&app.state, scarce.id).await?, 1);
    assert_eq!(items_for_size(&app.state.orm, plenty.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn unknown_size_is_not_found() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };

    let err = order_service::place_order(&app.state, None, order_request(&[(i32::MAX, 1)]))
        .await
        .expect_err("size does not exist");
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn duplicate_lines_are_checked_against_combined_quantity() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let size = create_sku(&app.state, &admin, "Beetroot Blast", 10_000, 4).await?;

    let err = order_service::place_order(
        &app.state,
        None,
        order_request(&[(size.id, 3), (size.id, 2)]),
    )
    .await
    .expect_err("five requested, four available");
    match err {
        AppError::InsufficientStock {
            available,
            requested,
            ..
        } => {
            assert_eq!(available, 4);
            assert_eq!(requested, 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    order_service::place_order(
        &app.state,
        None,
        order_request(&[(size.id, 2), (size.id, 2)]),
    )
    .await?;
    assert_eq!(stock_of(&app.state, size.id).await?, 0);

    let sales: Vec<_> = ledger(&app.state, size.id)
        .await?
        .into_iter()
        .filter(|r| r.change_type == StockChangeType::Sale)
        .collect();
    assert_eq!(sales.len(), 2);
    assert_eq!((sales[0].previous_stock, sales[0].new_stock), (4, 2));
    assert_eq!((sales[1].previous_stock, sales[1].new_stock), (2, 0));

    Ok(())
}

#[tokio::test]
async fn huge_duplicate_lines_are_insufficient_not_a_crash() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let size = create_sku(&app.state, &admin, "Bottomless Tank", 1, i32::MAX).await?;

    let err = order_service::place_order(
        &app.state,
        None,
        order_request(&[(size.id, i32::MAX), (size.id, 1)]),
    )
    .await
    .expect_err("combined quantity exceeds any stock");
    match err {
        AppError::InsufficientStock {
            available,
            requested,
            ..
        } => {
            assert_eq!(available, i32::MAX);
            assert_eq!(requested, i32::MAX);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(stock_of(&app.state, size.id).await?, i32::MAX);

    Ok(())
}

#[tokio::test]
async fn guest_checkout_has_no_user() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let size = create_sku(&app.state, &admin, "Ginger Lime", 7_500, 3).await?;

    let placed = order_service::place_order(&app.state, None, order_request(&[(size.id, 1)]))
        .await?
        .data
        .expect("placed order");

    let order = order_service::get_order_admin(&app.state, &admin, placed.order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(order.order.user_id, None);
    assert_eq!(order.order.customer_email, "asha@juice.test");

    let sale = ledger(&app.state, size.id)
        .await?
        .into_iter()
        .find(|r| r.change_type == StockChangeType::Sale)
        .expect("sale row");
    assert_eq!(sale.changed_by, None);

    Ok(())
}

#[tokio::test]
async fn invalid_requests_fail_before_touching_stock() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let size = create_sku(&app.state, &admin, "Carrot Zing", 6_000, 3).await?;

    let mut zero_qty = order_request(&[(size.id, 0)]);
    assert!(matches!(
        order_service::place_order(&app.state, None, zero_qty.clone()).await,
        Err(AppError::BadRequest(_))
    ));

    zero_qty.items.clear();
    assert!(matches!(
        order_service::place_order(&app.state, None, zero_qty).await,
        Err(AppError::BadRequest(_))
    ));
    assert_eq!(stock_of(&app.state, size.id).await?, 3);

    Ok(())
}

#[tokio::test]
async fn concurrent_checkouts_for_last_unit_sell_it_once() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let size = create_sku(&app.state, &admin, "Last Bottle", 20_000, 1).await?;

    let first = order_request(&[(size.id, 1)]);
    let second = order_request(&[(size.id, 1)]);
    let (a, b) = tokio::join!(
        order_service::place_order(&app.state, None, first),
        order_service::place_order(&app.state, None, second),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one checkout wins");
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(AppError::InsufficientStock { .. })));
    assert_eq!(stock_of(&app.state, size.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn status_update_sets_date_and_leaves_items_alone() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let customer = create_user(&app.state, "user").await?;
    let size = create_sku(&app.state, &admin, "Pineapple Glow", 11_000, 6).await?;

    let placed = order_service::place_order(
        &app.state,
        Some(&customer),
        order_request(&[(size.id, 2)]),
    )
    .await?
    .data
    .expect("placed order");
    let before = order_service::get_order(&app.state, &customer, placed.order_id)
        .await?
        .data
        .expect("order");

    let eta = NaiveDate::from_ymd_opt(2026, 11, 2).expect("valid date");
    let updated = order_service::update_order_status(
        &app.state,
        &admin,
        placed.order_id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
            estimated_delivery_date: Some(eta),
        },
    )
    .await?
    .data
    .expect("updated order");
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert_eq!(updated.estimated_delivery_date, Some(eta));

    let after = order_service::get_order(&app.state, &customer, placed.order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(after.items.len(), before.items.len());
    for (a, b) in after.items.iter().zip(before.items.iter()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.quantity, b.quantity);
        assert_eq!(a.price, b.price);
        assert_eq!(a.product_name, b.product_name);
    }

    // Delivered orders can still be moved by staff.
    let reopened = order_service::update_order_status(
        &app.state,
        &admin,
        placed.order_id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Delivered,
            estimated_delivery_date: None,
        },
    )
    .await?;
    assert_eq!(reopened.data.map(|o| o.estimated_delivery_date), Some(Some(eta)));
    order_service::update_order_status(
        &app.state,
        &admin,
        placed.order_id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Processing,
            estimated_delivery_date: None,
        },
    )
    .await?;

    let err = order_service::update_order_status(
        &app.state,
        &customer,
        placed.order_id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Cancelled,
            estimated_delivery_date: None,
        },
    )
    .await
    .expect_err("customers cannot change status");
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}

#[tokio::test]
async fn order_items_keep_their_snapshot_after_catalog_edits() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let size = create_sku(&app.state, &admin, "Amla Tonic", 9_900, 5).await?;

    let mut request = order_request(&[(size.id, 1)]);
    request.items[0].price = Some(1);
    request.items[0].product_name = Some("Free Juice".into());
    let placed = order_service::place_order(&app.state, None, request)
        .await?
        .data
        .expect("placed order");
    assert_eq!(placed.total_amount, 9_900, "client prices are ignored");

    product_service::update_size(
        &app.state,
        &admin,
        size.id,
        UpdateSizeRequest {
            size_label: Some("1L".into()),
            price: Some(18_000),
            nutrition: None,
        },
    )
    .await?;
    product_service::update_product(
        &app.state,
        &admin,
        size.product_id,
        UpdateProductRequest {
            name: Some("Amla Tonic Deluxe".into()),
            category: None,
            description: None,
            base_price: None,
            is_active: None,
        },
    )
    .await?;

    let order = order_service::get_order_admin(&app.state, &admin, placed.order_id)
        .await?
        .data
        .expect("order");
    let item = &order.items[0];
    assert_eq!(item.product_name, "Amla Tonic");
    assert_eq!(item.size_label, "500ml");
    assert_eq!(item.price, 9_900);
    assert_eq!(item.line_total, 9_900);

    Ok(())
}

mod common;

use common::{create_admin, create_sku, create_user, order_request, setup};
use juice_shop_api::{
    domain::OrderStatus,
    dto::{addresses::AddressRequest, products::UpdateProductRequest},
    error::AppError,
    routes::params::{OrderListQuery, ProductQuery},
    services::{address_service, order_service, product_service},
};
use uuid::Uuid;

#[tokio::test]
async fn deactivated_products_leave_the_catalog() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let name = format!("Tender Coconut {}", Uuid::new_v4());
    let size = create_sku(&app.state, &admin, &name, 6_000, 4).await?;

    let search = || ProductQuery {
        q: Some(name.clone()),
        ..ProductQuery::default()
    };
    let listed = product_service::list_products(&app.state, search())
        .await?
        .data
        .expect("products")
        .items;
    assert_eq!(listed.len(), 1);

    let detail = product_service::get_product(&app.state, size.product_id)
        .await?
        .data
        .expect("product");
    assert_eq!(detail.sizes.len(), 1);
    assert_eq!(detail.sizes[0].stock_quantity, 4);

    product_service::deactivate_product(&app.state, &admin, size.product_id).await?;

    let listed = product_service::list_products(&app.state, search())
        .await?
        .data
        .expect("products")
        .items;
    assert!(listed.is_empty());
    assert!(matches!(
        product_service::get_product(&app.state, size.product_id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        order_service::place_order(&app.state, None, order_request(&[(size.id, 1)])).await,
        Err(AppError::NotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn product_updates_reject_blank_name_and_category() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let size = create_sku(&app.state, &admin, "Rose Milk", 4_500, 2).await?;

    let rename = |name: Option<&str>, category: Option<&str>| UpdateProductRequest {
        name: name.map(Into::into),
        category: category.map(Into::into),
        description: None,
        base_price: None,
        is_active: None,
    };

    for request in [rename(Some("  "), None), rename(None, Some(""))] {
        assert!(matches!(
            product_service::update_product(&app.state, &admin, size.product_id, request).await,
            Err(AppError::BadRequest(_))
        ));
    }

    let updated = product_service::update_product(
        &app.state,
        &admin,
        size.product_id,
        rename(Some(" Rose Milk Shake "), Some("Milkshakes")),
    )
    .await?
    .data
    .expect("product");
    assert_eq!(updated.name, "Rose Milk Shake");
    assert_eq!(updated.category, "Milkshakes");

    Ok(())
}

#[tokio::test]
async fn customers_see_only_their_orders() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let admin = create_admin(&app.state).await?;
    let alice = create_user(&app.state, "user").await?;
    let bob = create_user(&app.state, "user").await?;
    let size = create_sku(&app.state, &admin, "Papaya Punch", 5_500, 5).await?;

    let placed = order_service::place_order(&app.state, Some(&alice), order_request(&[(size.id, 1)]))
        .await?
        .data
        .expect("order");

    let mine = order_service::list_orders(
        &app.state,
        &alice,
        OrderListQuery {
            status: Some(OrderStatus::Pending),
            ..OrderListQuery::default()
        },
    )
    .await?
    .data
    .expect("orders")
    .items;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].order_number, placed.order_number);

    let theirs = order_service::list_orders(&app.state, &bob, OrderListQuery::default())
        .await?
        .data
        .expect("orders")
        .items;
    assert!(theirs.is_empty());
    assert!(matches!(
        order_service::get_order(&app.state, &bob, placed.order_id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        order_service::list_all_orders(&app.state, &bob, OrderListQuery::default()).await,
        Err(AppError::Forbidden)
    ));

    Ok(())
}

fn address(label: &str, is_default: bool) -> AddressRequest {
    AddressRequest {
        label: label.into(),
        recipient_name: "Divya".into(),
        phone: "9123456780".into(),
        line1: "22 Temple Street".into(),
        line2: None,
        city: "Coimbatore".into(),
        state: "Tamil Nadu".into(),
        postal_code: "641001".into(),
        is_default,
    }
}

#[tokio::test]
async fn only_one_default_address_per_customer() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let customer = create_user(&app.state, "user").await?;
    let other = create_user(&app.state, "user").await?;

    let home = address_service::create_address(&app.state, &customer, address("Home", true))
        .await?
        .data
        .expect("address");
    let office = address_service::create_address(&app.state, &customer, address("Office", true))
        .await?
        .data
        .expect("address");

    let list = address_service::list_addresses(&app.state, &customer)
        .await?
        .data
        .expect("addresses")
        .items;
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, office.id);
    assert!(list[0].is_default);
    assert!(!list[1].is_default);

    assert!(matches!(
        address_service::delete_address(&app.state, &other, home.id).await,
        Err(AppError::NotFound(_))
    ));
    address_service::delete_address(&app.state, &customer, home.id).await?;

    let mut blank = address("Gym", false);
    blank.city = " ".into();
    assert!(matches!(
        address_service::create_address(&app.state, &customer, blank).await,
        Err(AppError::BadRequest(_))
    ));

    Ok(())
}

#![allow(dead_code)]

use juice_shop_api::{
    db::{create_pool, orm_from_pool, run_migrations},
    domain::{DiscountType, PaymentMethod},
    dto::{
        coupons::CreateCouponRequest,
        orders::{OrderLineRequest, PlaceOrderRequest},
        products::{CreateProductRequest, CreateSizeRequest},
    },
    entity::{
        product_sizes::Entity as ProductSizes,
        stock_history::{Column as HistoryCol, Entity as StockHistory, Model as HistoryModel},
        users::ActiveModel as UserActive,
    },
    events::{self, DomainEvent},
    middleware::auth::{ADMIN_ROLE, AuthUser},
    models::{Coupon, ProductSize},
    services::{coupon_service, product_service},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tokio::sync::{OnceCell, mpsc};
use uuid::Uuid;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

pub struct TestApp {
    pub state: AppState,
    pub events: mpsc::Receiver<DomainEvent>,
}

/// Connect and migrate, or `None` when no database is configured.
///
/// Tests never truncate; every fixture uses fresh emails, codes and ids so
/// suites can share one database.
pub async fn setup() -> anyhow::Result<Option<TestApp>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url, 5).await?;
    let orm = orm_from_pool(&pool);
    MIGRATED
        .get_or_try_init(|| async { run_migrations(&orm).await })
        .await?;

    let (publisher, events) = events::channel(64);
    Ok(Some(TestApp {
        state: AppState {
            pool,
            orm,
            events: publisher,
        },
        events,
    }))
}

pub async fn create_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{}@juice.test", Uuid::new_v4())),
        password_hash: Set("dummy".into()),
        full_name: Set(Some("Test Customer".into())),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

pub async fn create_admin(state: &AppState) -> anyhow::Result<AuthUser> {
    create_user(state, ADMIN_ROLE).await
}

/// A fresh product with one size holding `stock` units at `price`.
pub async fn create_sku(
    state: &AppState,
    admin: &AuthUser,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<ProductSize> {
    let product = product_service::create_product(
        state,
        admin,
        CreateProductRequest {
            name: name.into(),
            category: "Fresh Juices".into(),
            description: None,
            base_price: price,
        },
    )
    .await?
    .data
    .expect("product");

    let size = product_service::add_size(
        state,
        admin,
        product.id,
        CreateSizeRequest {
            size_label: "500ml".into(),
            price,
            initial_stock: stock,
            nutrition: None,
        },
    )
    .await?
    .data
    .expect("size");
    Ok(size)
}

pub fn order_request(lines: &[(i32, i32)]) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: lines
            .iter()
            .map(|&(product_size_id, quantity)| OrderLineRequest {
                product_size_id,
                quantity,
                product_name: None,
                size: None,
                price: None,
            })
            .collect(),
        customer_name: "Asha".into(),
        customer_email: "asha@juice.test".into(),
        customer_phone: "9876543210".into(),
        delivery_address: "12 Beach Road, Chennai".into(),
        payment_method: PaymentMethod::CashOnDelivery,
        coupon_code: None,
    }
}

/// Unique coupon code with the given prefix, e.g. `WELCOME20-1A2B3C4D`.
pub fn unique_code(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &suffix[..8]).to_uppercase()
}

pub fn coupon_request(code: &str, discount_type: DiscountType, value: i64) -> CreateCouponRequest {
    CreateCouponRequest {
        code: code.into(),
        description: None,
        discount_type,
        discount_value: value,
        max_discount: None,
        min_order_amount: 0,
        usage_limit: None,
        coupon_class: juice_shop_api::domain::CouponClass::Standard,
        valid_from: None,
        valid_until: None,
    }
}

pub async fn create_coupon(
    state: &AppState,
    admin: &AuthUser,
    request: CreateCouponRequest,
) -> anyhow::Result<Coupon> {
    Ok(coupon_service::create_coupon(state, admin, request)
        .await?
        .data
        .expect("coupon"))
}

pub async fn stock_of(state: &AppState, size_id: i32) -> anyhow::Result<i32> {
    let size = ProductSizes::find_by_id(size_id)
        .one(&state.orm)
        .await?
        .expect("size exists");
    Ok(size.stock_quantity)
}

/// Ledger rows for a size, oldest first.
pub async fn ledger(state: &AppState, size_id: i32) -> anyhow::Result<Vec<HistoryModel>> {
    Ok(StockHistory::find()
        .filter(HistoryCol::ProductSizeId.eq(size_id))
        .order_by_asc(HistoryCol::Id)
        .all(&state.orm)
        .await?)
}

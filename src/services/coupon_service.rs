use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        DiscountType, Quote,
        coupon::{self, Redeemer},
    },
    dto::coupons::{CouponList, CouponQuote, CreateCouponRequest, ValidateCouponRequest},
    entity::{
        coupon_usage::{ActiveModel as UsageActive, Column as UsageCol, Entity as CouponUsage},
        coupons::{ActiveModel as CouponActive, Column as CouponCol, Entity as Coupons, Model as CouponModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Coupon,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

async fn quote<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    subtotal: i64,
    user_id: Option<Uuid>,
    lock: bool,
) -> AppResult<(CouponModel, Quote)> {
    let mut finder = Coupons::find().filter(CouponCol::Code.eq(code));
    if lock {
        finder = finder.lock(LockType::Update);
    }
    let coupon = finder
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Coupon {code}")))?;

    let redeemer = match user_id {
        Some(user_id) => {
            let prior_uses = CouponUsage::find()
                .filter(UsageCol::CouponId.eq(coupon.id))
                .filter(UsageCol::UserId.eq(user_id))
                .count(conn)
                .await?;
            Redeemer::User { prior_uses }
        }
        None => Redeemer::Guest,
    };

    let quote = coupon::evaluate(&coupon, subtotal, Utc::now(), redeemer)?;
    Ok((coupon, quote))
}

/// Quote a coupon inside a checkout, holding its row lock until commit so
/// usage limits and one-per-customer rules hold under concurrent checkouts.
pub(crate) async fn quote_in_txn(
    txn: &DatabaseTransaction,
    code: &str,
    subtotal: i64,
    user_id: Option<Uuid>,
) -> AppResult<(CouponModel, Quote)> {
    quote(txn, code, subtotal, user_id, true).await
}

pub(crate) async fn record_redemption(
    txn: &DatabaseTransaction,
    coupon: &CouponModel,
    user_id: Option<Uuid>,
    order_id: i32,
    discount: i64,
) -> AppResult<()> {
    UsageActive {
        id: NotSet,
        coupon_id: Set(coupon.id),
        user_id: Set(user_id),
        order_id: Set(order_id),
        discount_amount: Set(discount),
        created_at: NotSet,
    }
    .insert(txn)
    .await?;

    Coupons::update_many()
        .col_expr(CouponCol::UsedCount, Expr::col(CouponCol::UsedCount).add(1))
        .filter(CouponCol::Id.eq(coupon.id))
        .exec(txn)
        .await?;
    Ok(())
}

pub async fn validate_coupon(
    state: &AppState,
    user: Option<&AuthUser>,
    payload: ValidateCouponRequest,
) -> AppResult<ApiResponse<CouponQuote>> {
    let code = coupon::normalize_code(&payload.code);
    if code.is_empty() {
        return Err(AppError::BadRequest("code is required".into()));
    }
    if payload.order_total < 0 {
        return Err(AppError::BadRequest("order_total cannot be negative".into()));
    }

    let (coupon, quote) = quote(
        &state.orm,
        &code,
        payload.order_total,
        user.map(|u| u.user_id),
        false,
    )
    .await?;

    Ok(ApiResponse::single(
        "Coupon applied",
        CouponQuote {
            code: coupon.code,
            discount_amount: quote.discount,
            final_total: quote.total,
        },
    ))
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let code = coupon::normalize_code(&payload.code);
    if code.is_empty() {
        return Err(AppError::BadRequest("code is required".into()));
    }
    match payload.discount_type {
        DiscountType::Percentage if !(1..=100).contains(&payload.discount_value) => {
            return Err(AppError::BadRequest(
                "percentage must be between 1 and 100".into(),
            ));
        }
        DiscountType::Fixed if payload.discount_value <= 0 => {
            return Err(AppError::BadRequest(
                "fixed discount must be positive".into(),
            ));
        }
        _ => {}
    }
    if let (Some(from), Some(until)) = (payload.valid_from, payload.valid_until) {
        if until <= from {
            return Err(AppError::BadRequest(
                "valid_until must be after valid_from".into(),
            ));
        }
    }

    let taken = Coupons::find()
        .filter(CouponCol::Code.eq(code.as_str()))
        .count(&state.orm)
        .await?
        > 0;
    if taken {
        return Err(AppError::BadRequest("Coupon code already exists".into()));
    }

    let created = CouponActive {
        id: NotSet,
        code: Set(code),
        description: Set(payload.description),
        discount_type: Set(payload.discount_type),
        discount_value: Set(payload.discount_value),
        max_discount: Set(payload.max_discount),
        min_order_amount: Set(payload.min_order_amount.max(0)),
        usage_limit: Set(payload.usage_limit),
        used_count: Set(0),
        coupon_class: Set(payload.coupon_class),
        is_active: Set(true),
        valid_from: Set(payload.valid_from.map(Into::into)),
        valid_until: Set(payload.valid_until.map(Into::into)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "coupon_create",
        "coupons",
        serde_json::json!({ "coupon_id": created.id, "code": created.code }),
    )
    .await;

    Ok(ApiResponse::single("Coupon created", Coupon::from(created)))
}

pub async fn list_coupons(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CouponList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();
    let finder = Coupons::find().order_by_desc(CouponCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Coupon::from)
        .collect();

    Ok(ApiResponse::success(
        "Coupons",
        CouponList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

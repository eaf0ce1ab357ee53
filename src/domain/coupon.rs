use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{entity::coupons::Model as CouponModel, error::AppError};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` is a whole percentage of the subtotal.
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// `discount_value` is an amount in minor units.
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CouponClass {
    #[sea_orm(string_value = "standard")]
    Standard,
    /// One redemption per signed-in customer.
    #[sea_orm(string_value = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("Coupon is not active")]
    Inactive,
    #[error("Coupon is not valid yet")]
    NotYetValid,
    #[error("Coupon has expired")]
    Expired,
    #[error("Order total must be at least {minimum} to use this coupon")]
    BelowMinimum { minimum: i64 },
    #[error("Coupon usage limit reached")]
    UsageLimitReached,
    #[error("Sign in to use this coupon")]
    SignInRequired,
    #[error("Coupon already used")]
    AlreadyUsed,
}

impl From<CouponRejection> for AppError {
    fn from(rejection: CouponRejection) -> Self {
        match rejection {
            CouponRejection::SignInRequired => AppError::Unauthorized(rejection.to_string()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

/// Who is redeeming the coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redeemer {
    Guest,
    /// A signed-in customer and how many times they already redeemed this coupon.
    User { prior_uses: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Quote {
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
}

/// Uppercased, trimmed form used for storage and lookup.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub fn evaluate(
    coupon: &CouponModel,
    subtotal: i64,
    now: DateTime<Utc>,
    redeemer: Redeemer,
) -> Result<Quote, CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if let Some(from) = coupon.valid_from {
        if from.with_timezone(&Utc) > now {
            return Err(CouponRejection::NotYetValid);
        }
    }
    if let Some(until) = coupon.valid_until {
        if until.with_timezone(&Utc) <= now {
            return Err(CouponRejection::Expired);
        }
    }
    if subtotal < coupon.min_order_amount {
        return Err(CouponRejection::BelowMinimum {
            minimum: coupon.min_order_amount,
        });
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.used_count >= limit {
            return Err(CouponRejection::UsageLimitReached);
        }
    }
    if coupon.coupon_class == CouponClass::Welcome {
        match redeemer {
            Redeemer::Guest => return Err(CouponRejection::SignInRequired),
            Redeemer::User { prior_uses } if prior_uses > 0 => {
                return Err(CouponRejection::AlreadyUsed);
            }
            Redeemer::User { .. } => {}
        }
    }

    let discount = discount_for(
        coupon.discount_type,
        coupon.discount_value,
        coupon.max_discount,
        subtotal,
    );
    Ok(Quote {
        subtotal,
        discount,
        total: subtotal - discount,
    })
}

/// Discount in minor units, never more than `subtotal`.
pub fn discount_for(
    discount_type: DiscountType,
    value: i64,
    max_discount: Option<i64>,
    subtotal: i64,
) -> i64 {
    let subtotal = subtotal.max(0);
    let raw = match discount_type {
        DiscountType::Percentage => {
            // half-up to the nearest minor unit
            let scaled = (i128::from(subtotal) * i128::from(value) + 50) / 100;
            let pct = i64::try_from(scaled).unwrap_or(i64::MAX);
            match max_discount {
                Some(cap) => pct.min(cap),
                None => pct,
            }
        }
        DiscountType::Fixed => value,
    };
    raw.clamp(0, subtotal)
}

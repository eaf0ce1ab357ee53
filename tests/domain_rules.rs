use chrono::{Duration, TimeZone, Utc};
use juice_shop_api::{
    domain::{
        CouponClass, CouponRejection, DiscountType, OrderStatus, PaymentMethod, StockChangeType,
        coupon::{self, Redeemer},
        order_number,
        stock::StockMovement,
    },
    dto::orders::{OrderLineRequest, PlaceOrderRequest},
    entity::coupons::Model as CouponModel,
    error::AppError,
    routes::params::Pagination,
    services::order_service::validate_order_request,
};

fn coupon(discount_type: DiscountType, value: i64) -> CouponModel {
    CouponModel {
        id: 1,
        code: "JUICE10".into(),
        description: None,
        discount_type,
        discount_value: value,
        max_discount: None,
        min_order_amount: 0,
        usage_limit: None,
        used_count: 0,
        coupon_class: CouponClass::Standard,
        is_active: true,
        valid_from: None,
        valid_until: None,
        created_at: Utc::now().fixed_offset(),
    }
}

#[test]
fn percentage_rounds_half_up_to_the_minor_unit() {
    assert_eq!(coupon::discount_for(DiscountType::Percentage, 10, None, 12_345), 1_235);
    assert_eq!(coupon::discount_for(DiscountType::Percentage, 10, None, 12_344), 1_234);
    assert_eq!(coupon::discount_for(DiscountType::Percentage, 15, None, 999), 150);
}

#[test]
fn discount_is_capped_and_clamped() {
    assert_eq!(
        coupon::discount_for(DiscountType::Percentage, 50, Some(3_000), 10_000),
        3_000
    );
    assert_eq!(coupon::discount_for(DiscountType::Fixed, 2_500, None, 1_000), 1_000);
    assert_eq!(coupon::discount_for(DiscountType::Percentage, 100, None, 4_200), 4_200);
    assert_eq!(coupon::discount_for(DiscountType::Fixed, 500, None, 0), 0);
}

#[test]
fn evaluate_reports_the_first_failing_rule() {
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();

    let mut inactive = coupon(DiscountType::Fixed, 100);
    inactive.is_active = false;
    assert_eq!(
        coupon::evaluate(&inactive, 1_000, now, Redeemer::Guest),
        Err(CouponRejection::Inactive)
    );

    let mut early = coupon(DiscountType::Fixed, 100);
    early.valid_from = Some((now + Duration::hours(1)).fixed_offset());
    assert_eq!(
        coupon::evaluate(&early, 1_000, now, Redeemer::Guest),
        Err(CouponRejection::NotYetValid)
    );

    let mut expired = coupon(DiscountType::Fixed, 100);
    expired.valid_until = Some(now.fixed_offset());
    assert_eq!(
        coupon::evaluate(&expired, 1_000, now, Redeemer::Guest),
        Err(CouponRejection::Expired)
    );

    let mut minimum = coupon(DiscountType::Fixed, 100);
    minimum.min_order_amount = 5_000;
    assert_eq!(
        coupon::evaluate(&minimum, 4_999, now, Redeemer::Guest),
        Err(CouponRejection::BelowMinimum { minimum: 5_000 })
    );

    let mut exhausted = coupon(DiscountType::Fixed, 100);
    exhausted.usage_limit = Some(3);
    exhausted.used_count = 3;
    assert_eq!(
        coupon::evaluate(&exhausted, 1_000, now, Redeemer::Guest),
        Err(CouponRejection::UsageLimitReached)
    );
}

#[test]
fn welcome_coupons_are_once_per_signed_in_customer() {
    let now = Utc::now();
    let mut welcome = coupon(DiscountType::Percentage, 20);
    welcome.code = "FIRSTSIP".into();
    welcome.coupon_class = CouponClass::Welcome;

    assert_eq!(
        coupon::evaluate(&welcome, 10_000, now, Redeemer::Guest),
        Err(CouponRejection::SignInRequired)
    );
    assert_eq!(
        coupon::evaluate(&welcome, 10_000, now, Redeemer::User { prior_uses: 1 }),
        Err(CouponRejection::AlreadyUsed)
    );
    let quote = coupon::evaluate(&welcome, 10_000, now, Redeemer::User { prior_uses: 0 })
        .expect("first use");
    assert_eq!(quote.discount, 2_000);
    assert_eq!(quote.total, 8_000);

    // The class decides, not the code text.
    let mut lookalike = coupon(DiscountType::Percentage, 20);
    lookalike.code = "WELCOME20".into();
    assert!(coupon::evaluate(&lookalike, 10_000, now, Redeemer::User { prior_uses: 5 }).is_ok());
}

#[test]
fn rejections_map_to_http_errors() {
    assert!(matches!(
        AppError::from(CouponRejection::SignInRequired),
        AppError::Unauthorized(_)
    ));
    assert!(matches!(
        AppError::from(CouponRejection::AlreadyUsed),
        AppError::BadRequest(msg) if msg == "Coupon already used"
    ));
}

#[test]
fn codes_are_normalized() {
    assert_eq!(coupon::normalize_code("  welcome20 "), "WELCOME20");
}

#[test]
fn stock_movements_never_go_negative() {
    assert_eq!(
        StockMovement::sale(5, 2),
        Some(StockMovement { previous: 5, new: 3 })
    );
    assert_eq!(StockMovement::sale(5, 6), None);
    assert_eq!(StockMovement::sale(5, 0), None);
    assert_eq!(StockMovement::sale(5, -1), None);
    assert_eq!(StockMovement::to_target(5, -1), None);

    let noop = StockMovement::to_target(20, 20).expect("valid target");
    assert!(noop.is_noop());
    assert_eq!(noop.delta(), 0);
    assert_eq!(StockMovement::to_target(3, 10).map(|m| m.delta()), Some(7));
}

#[test]
fn admin_changes_are_classified() {
    assert_eq!(StockChangeType::for_admin_change(5, false), StockChangeType::Restock);
    assert_eq!(StockChangeType::for_admin_change(-2, false), StockChangeType::Adjustment);
    assert_eq!(StockChangeType::for_admin_change(5, true), StockChangeType::BulkUpdate);
    assert_eq!(StockChangeType::for_admin_change(-5, true), StockChangeType::BulkUpdate);
}

#[test]
fn order_numbers_are_zero_padded() {
    assert_eq!(order_number(42), "ORD-000042");
    assert_eq!(order_number(1_234_567), "ORD-1234567");
}

#[test]
fn every_status_change_is_allowed() {
    let all = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];
    for from in all {
        for to in all {
            assert!(OrderStatus::check_transition(from, to).is_ok(), "{from} -> {to}");
        }
    }
    assert!(OrderStatus::Cancelled.is_terminal());
    assert!(!OrderStatus::Shipped.is_terminal());
}

#[test]
fn status_serializes_snake_case() {
    assert_eq!(
        serde_json::to_value(OrderStatus::Processing).unwrap(),
        serde_json::json!("processing")
    );
    let parsed: PaymentMethod = serde_json::from_value(serde_json::json!("cash_on_delivery")).unwrap();
    assert_eq!(parsed, PaymentMethod::CashOnDelivery);
}

fn request(items: Vec<(i32, i32)>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: items
            .into_iter()
            .map(|(product_size_id, quantity)| OrderLineRequest {
                product_size_id,
                quantity,
                product_name: None,
                size: None,
                price: None,
            })
            .collect(),
        customer_name: "Ravi".into(),
        customer_email: "ravi@juice.test".into(),
        customer_phone: "9000000000".into(),
        delivery_address: "4 Lake View, Madurai".into(),
        payment_method: PaymentMethod::Upi,
        coupon_code: None,
    }
}

#[test]
fn order_requests_are_shape_checked() {
    assert!(validate_order_request(&request(vec![(1, 2)])).is_ok());
    assert!(validate_order_request(&request(vec![])).is_err());

    match validate_order_request(&request(vec![(1, 1), (2, 0)])) {
        Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Item 2 has an invalid quantity"),
        other => panic!("unexpected: {other:?}"),
    }

    let mut blank_phone = request(vec![(1, 1)]);
    blank_phone.customer_phone = "   ".into();
    assert!(matches!(
        validate_order_request(&blank_phone),
        Err(AppError::BadRequest(msg)) if msg == "customer_phone is required"
    ));

    let mut bad_email = request(vec![(1, 1)]);
    bad_email.customer_email = "not-an-email".into();
    assert!(validate_order_request(&bad_email).is_err());
}

#[test]
fn pagination_is_clamped_and_never_overflows() {
    let defaults = Pagination::default().normalize();
    assert_eq!(defaults, (1, 20, 0));

    let clamped = Pagination {
        page: Some(0),
        per_page: Some(1_000),
    }
    .normalize();
    assert_eq!(clamped, (1, 100, 0));

    let (page, per_page, offset) = Pagination {
        page: Some(i64::MAX),
        per_page: Some(20),
    }
    .normalize();
    assert_eq!((page, per_page), (i64::MAX, 20));
    assert_eq!(offset, i64::MAX);
}

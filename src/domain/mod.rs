//! Business rules kept apart from request handling and storage code.

pub mod coupon;
pub mod order_status;
pub mod payment;
pub mod stock;

pub use coupon::{CouponClass, CouponRejection, DiscountType, Quote};
pub use order_status::OrderStatus;
pub use payment::PaymentMethod;
pub use stock::StockChangeType;

/// Customer-facing order number, e.g. `ORD-000042`.
pub fn order_number(order_id: i32) -> String {
    format!("ORD-{:06}", order_id)
}

pub mod address_service;
pub mod auth_service;
pub mod coupon_service;
pub mod inventory_service;
pub mod order_service;
pub mod product_service;

pub mod addresses;
pub mod auth;
pub mod coupons;
pub mod inventory;
pub mod orders;
pub mod products;

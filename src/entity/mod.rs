pub mod addresses;
pub mod audit_logs;
pub mod coupon_usage;
pub mod coupons;
pub mod order_items;
pub mod orders;
pub mod product_sizes;
pub mod products;
pub mod stock_history;
pub mod users;

pub use addresses::Entity as Addresses;
pub use audit_logs::Entity as AuditLogs;
pub use coupon_usage::Entity as CouponUsage;
pub use coupons::Entity as Coupons;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_sizes::Entity as ProductSizes;
pub use products::Entity as Products;
pub use stock_history::Entity as StockHistory;
pub use users::Entity as Users;

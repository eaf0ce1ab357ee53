use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{
        CouponClass, DiscountType, OrderStatus, PaymentMethod, StockChangeType, order_number,
    },
    entity::{
        addresses::Model as AddressModel, coupons::Model as CouponModel,
        order_items::Model as OrderItemModel, orders::Model as OrderModel,
        product_sizes::Model as ProductSizeModel, products::Model as ProductModel,
        stock_history::Model as StockHistoryModel,
    },
};

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub base_price: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductModel> for Product {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            category: model.category,
            description: model.description,
            base_price: model.base_price,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductSize {
    pub id: i32,
    pub product_id: i32,
    pub size_label: String,
    pub price: i64,
    pub stock_quantity: i32,
    #[schema(value_type = Option<Object>)]
    pub nutrition: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductSizeModel> for ProductSize {
    fn from(model: ProductSizeModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            size_label: model.size_label,
            price: model.price,
            stock_quantity: model.stock_quantity,
            nutrition: model.nutrition,
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductWithSizes {
    pub product: Product,
    pub sizes: Vec<ProductSize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i32,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub subtotal_amount: i64,
    pub discount_amount: i64,
    pub total_amount: i64,
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub estimated_delivery_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        Self {
            id: model.id,
            order_number: order_number(model.id),
            user_id: model.user_id,
            subtotal_amount: model.subtotal_amount,
            discount_amount: model.discount_amount,
            total_amount: model.total_amount,
            coupon_code: model.coupon_code,
            status: model.status,
            payment_method: model.payment_method,
            delivery_address: model.delivery_address,
            customer_name: model.customer_name,
            customer_email: model.customer_email,
            customer_phone: model.customer_phone,
            estimated_delivery_date: model.estimated_delivery_date,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub product_size_id: i32,
    pub product_name: String,
    pub size_label: String,
    pub price: i64,
    pub quantity: i32,
    pub line_total: i64,
}

impl From<OrderItemModel> for OrderItem {
    fn from(model: OrderItemModel) -> Self {
        Self {
            line_total: model.price * i64::from(model.quantity),
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            product_size_id: model.product_size_id,
            product_name: model.product_name,
            size_label: model.size_label,
            price: model.price,
            quantity: model.quantity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockHistoryEntry {
    pub id: i32,
    pub product_size_id: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub change_amount: i32,
    pub change_type: StockChangeType,
    pub changed_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StockHistoryModel> for StockHistoryEntry {
    fn from(model: StockHistoryModel) -> Self {
        Self {
            id: model.id,
            product_size_id: model.product_size_id,
            previous_stock: model.previous_stock,
            new_stock: model.new_stock,
            change_amount: model.change_amount,
            change_type: model.change_type,
            changed_by: model.changed_by,
            notes: model.notes,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub max_discount: Option<i64>,
    pub min_order_amount: i64,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub coupon_class: CouponClass,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl From<CouponModel> for Coupon {
    fn from(model: CouponModel) -> Self {
        Self {
            id: model.id,
            code: model.code,
            description: model.description,
            discount_type: model.discount_type,
            discount_value: model.discount_value,
            max_discount: model.max_discount,
            min_order_amount: model.min_order_amount,
            usage_limit: model.usage_limit,
            used_count: model.used_count,
            coupon_class: model.coupon_class,
            is_active: model.is_active,
            valid_from: model.valid_from.map(|dt| dt.with_timezone(&Utc)),
            valid_until: model.valid_until.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: i32,
    pub label: String,
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub is_default: bool,
}

impl From<AddressModel> for Address {
    fn from(model: AddressModel) -> Self {
        Self {
            id: model.id,
            label: model.label,
            recipient_name: model.recipient_name,
            phone: model.phone,
            line1: model.line1,
            line2: model.line2,
            city: model.city,
            state: model.state,
            postal_code: model.postal_code,
            is_default: model.is_default,
        }
    }
}

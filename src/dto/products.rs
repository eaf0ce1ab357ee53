use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub base_price: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSizeRequest {
    pub size_label: String,
    pub price: i64,
    #[serde(default)]
    pub initial_stock: i32,
    #[schema(value_type = Option<Object>)]
    pub nutrition: Option<serde_json::Value>,
}

/// Stock only moves through the inventory endpoints.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSizeRequest {
    pub size_label: Option<String>,
    pub price: Option<i64>,
    #[schema(value_type = Option<Object>)]
    pub nutrition: Option<serde_json::Value>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

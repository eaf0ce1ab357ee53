use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{ProductSize, StockHistoryEntry},
    routes::params::Pagination,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStockRequest {
    pub stock_quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StockUpdate {
    pub product_size_id: i32,
    pub stock_quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkStockRequest {
    pub updates: Vec<StockUpdate>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockChange {
    pub product_size_id: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    /// `false` when the target equalled the current stock and nothing was written.
    pub recorded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkStockResult {
    pub changes: Vec<StockChange>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LowStockQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub threshold: Option<i32>,
}

impl LowStockQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SizeList {
    pub items: Vec<ProductSize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockHistoryList {
    pub items: Vec<StockHistoryEntry>,
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum StockChangeType {
    #[sea_orm(string_value = "sale")]
    Sale,
    #[sea_orm(string_value = "restock")]
    Restock,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    #[sea_orm(string_value = "bulk_update")]
    BulkUpdate,
}

impl StockChangeType {
    /// Classify an admin-initiated change of `delta` units.
    pub fn for_admin_change(delta: i32, in_batch: bool) -> Self {
        if in_batch {
            StockChangeType::BulkUpdate
        } else if delta > 0 {
            StockChangeType::Restock
        } else {
            StockChangeType::Adjustment
        }
    }
}

/// A single stock movement, before it is written to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockMovement {
    pub previous: i32,
    pub new: i32,
}

impl StockMovement {
    /// Movement to an absolute target. `None` when the target is negative.
    pub fn to_target(previous: i32, target: i32) -> Option<Self> {
        (target >= 0).then_some(Self { previous, new: target })
    }

    /// Movement removing `quantity` units. `None` when stock would go negative.
    pub fn sale(previous: i32, quantity: i32) -> Option<Self> {
        let new = previous.checked_sub(quantity)?;
        (quantity > 0 && new >= 0).then_some(Self { previous, new })
    }

    pub fn delta(&self) -> i32 {
        self.new - self.previous
    }

    pub fn is_noop(&self) -> bool {
        self.previous == self.new
    }
}

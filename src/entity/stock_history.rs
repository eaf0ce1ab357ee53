use sea_orm::entity::prelude::*;

use crate::domain::StockChangeType;

/// Append-only ledger of stock movements. Rows are inserted, never updated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_size_id: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub change_amount: i32,
    pub change_type: StockChangeType,
    pub changed_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_sizes::Entity",
        from = "Column::ProductSizeId",
        to = "super::product_sizes::Column::Id"
    )]
    ProductSizes,
}

impl Related<super::product_sizes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductSizes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

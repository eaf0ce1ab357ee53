use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::addresses::{AddressList, AddressRequest},
    entity::addresses::{ActiveModel, Column, Entity as Addresses, Model as AddressModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Address,
    response::ApiResponse,
    state::AppState,
};

fn validate(payload: &AddressRequest) -> AppResult<()> {
    let required = [
        ("label", &payload.label),
        ("recipient_name", &payload.recipient_name),
        ("phone", &payload.phone),
        ("line1", &payload.line1),
        ("city", &payload.city),
        ("state", &payload.state),
        ("postal_code", &payload.postal_code),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} is required")));
        }
    }
    Ok(())
}

async fn clear_default<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<()> {
    Addresses::update_many()
        .col_expr(Column::IsDefault, Expr::value(false))
        .filter(Column::UserId.eq(user_id))
        .filter(Column::IsDefault.eq(true))
        .exec(conn)
        .await?;
    Ok(())
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    id: i32,
) -> AppResult<AddressModel> {
    Addresses::find_by_id(id)
        .filter(Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Address {id}")))
}

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let items = Addresses::find()
        .filter(Column::UserId.eq(user.user_id))
        .order_by_desc(Column::IsDefault)
        .order_by_asc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Address::from)
        .collect();

    Ok(ApiResponse::single("Addresses", AddressList { items }))
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    validate(&payload)?;

    let txn = state.orm.begin().await?;
    if payload.is_default {
        clear_default(&txn, user.user_id).await?;
    }
    let address = ActiveModel {
        id: NotSet,
        user_id: Set(user.user_id),
        label: Set(payload.label),
        recipient_name: Set(payload.recipient_name),
        phone: Set(payload.phone),
        line1: Set(payload.line1),
        line2: Set(payload.line2),
        city: Set(payload.city),
        state: Set(payload.state),
        postal_code: Set(payload.postal_code),
        is_default: Set(payload.is_default),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(ApiResponse::single("Address created", Address::from(address)))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    validate(&payload)?;

    let txn = state.orm.begin().await?;
    let existing = find_owned(&txn, user.user_id, id).await?;
    if payload.is_default && !existing.is_default {
        clear_default(&txn, user.user_id).await?;
    }

    let mut active: ActiveModel = existing.into();
    active.label = Set(payload.label);
    active.recipient_name = Set(payload.recipient_name);
    active.phone = Set(payload.phone);
    active.line1 = Set(payload.line1);
    active.line2 = Set(payload.line2);
    active.city = Set(payload.city);
    active.state = Set(payload.state);
    active.postal_code = Set(payload.postal_code);
    active.is_default = Set(payload.is_default);
    let address = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::single("Address updated", Address::from(address)))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Addresses::delete_many()
        .filter(Column::Id.eq(id))
        .filter(Column::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Address {id}")));
    }
    Ok(ApiResponse::single("Deleted", serde_json::json!({})))
}

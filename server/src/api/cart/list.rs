use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::domain::shopping_list::{aggregate, ShoppingListLine};
use crate::error::ServiceResult;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ShoppingListResponse {
    pub items: Vec<ShoppingListLine>,
}

#[utoipa::path(
    get,
    path = "/api/cart",
    tag = "cart",
    responses(
        (status = 200, description = "Ingredient totals across every recipe in the cart", body = ShoppingListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn shopping_list(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> ServiceResult<Json<ShoppingListResponse>> {
    let mut conn = pool.get()?;
    let items = aggregate(&mut *conn, user.id)?;
    Ok(Json(ShoppingListResponse { items }))
}

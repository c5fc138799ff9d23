use crate::api::recipes::{load_summary, RecipeSummary};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::domain::membership;
use crate::error::ServiceResult;
use crate::store::RecipeSet;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/cart/{recipe_id}",
    tag = "cart",
    params(
        ("recipe_id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 201, description = "Recipe added to the cart", body = RecipeSummary),
        (status = 400, description = "Recipe is already in the cart", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_to_cart(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(recipe_id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let mut conn = pool.get()?;
    membership::add_recipe(&mut *conn, RecipeSet::Cart, user.id, recipe_id)?;
    let summary = load_summary(&mut conn, recipe_id)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{recipe_id}",
    tag = "cart",
    params(
        ("recipe_id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 204, description = "Recipe removed from the cart"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found or not in the cart", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_from_cart(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(recipe_id): Path<Uuid>,
) -> ServiceResult<StatusCode> {
    let mut conn = pool.get()?;
    membership::remove_recipe(&mut *conn, RecipeSet::Cart, user.id, recipe_id)?;
    Ok(StatusCode::NO_CONTENT)
}

use crate::api::recipes::{load_summary, RecipeSummary};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::domain::membership;
use crate::error::ServiceResult;
use crate::store::RecipeSet;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

/// Returns the router for /api/favorites endpoints (mounted at /api/favorites)
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{recipe_id}",
        post(add_favorite).delete(remove_favorite),
    )
}

#[derive(OpenApi)]
#[openapi(paths(add_favorite, remove_favorite))]
pub struct ApiDoc;

#[utoipa::path(
    post,
    path = "/api/favorites/{recipe_id}",
    tag = "favorites",
    params(
        ("recipe_id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 201, description = "Recipe added to favorites", body = RecipeSummary),
        (status = 400, description = "Recipe is already a favorite", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_favorite(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(recipe_id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let mut conn = pool.get()?;
    membership::add_recipe(&mut *conn, RecipeSet::Favorites, user.id, recipe_id)?;
    let summary = load_summary(&mut conn, recipe_id)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

#[utoipa::path(
    delete,
    path = "/api/favorites/{recipe_id}",
    tag = "favorites",
    params(
        ("recipe_id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 204, description = "Recipe removed from favorites"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found or not a favorite", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_favorite(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(recipe_id): Path<Uuid>,
) -> ServiceResult<StatusCode> {
    let mut conn = pool.get()?;
    membership::remove_recipe(&mut *conn, RecipeSet::Favorites, user.id, recipe_id)?;
    Ok(StatusCode::NO_CONTENT)
}

use crate::api::users::subscriptions::{load_author, load_subscriptions, SubscriptionResponse};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::domain::membership;
use crate::error::{ServiceError, ServiceResult};
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

/// Returns the router for /api/follow endpoints (mounted at /api/follow)
pub fn router() -> Router<AppState> {
    Router::new().route("/{user_id}", post(follow).delete(unfollow))
}

#[derive(OpenApi)]
#[openapi(paths(follow, unfollow))]
pub struct ApiDoc;

#[utoipa::path(
    post,
    path = "/api/follow/{user_id}",
    tag = "follows",
    params(
        ("user_id" = Uuid, Path, description = "Author to follow")
    ),
    responses(
        (status = 201, description = "Now following the author", body = SubscriptionResponse),
        (status = 400, description = "Already following, or following yourself", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn follow(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(author_id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let mut conn = pool.get()?;
    membership::follow(&mut *conn, user.id, author_id)?;

    let author = load_author(&mut conn, author_id)?;
    let subscription = load_subscriptions(&mut conn, vec![author], None)?
        .pop()
        .ok_or_else(|| ServiceError::not_found("User", author_id))?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

#[utoipa::path(
    delete,
    path = "/api/follow/{user_id}",
    tag = "follows",
    params(
        ("user_id" = Uuid, Path, description = "Author to unfollow")
    ),
    responses(
        (status = 204, description = "No longer following the author"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found or not followed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn unfollow(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(author_id): Path<Uuid>,
) -> ServiceResult<StatusCode> {
    let mut conn = pool.get()?;
    membership::unfollow(&mut *conn, user.id, author_id)?;
    Ok(StatusCode::NO_CONTENT)
}

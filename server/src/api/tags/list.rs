use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ServiceResult;
use crate::models::Tag;
use crate::schema::tags;
use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagsResponse {
    pub tags: Vec<Tag>,
}

#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "tags",
    responses(
        (status = 200, description = "All tags ordered by name", body = TagsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_tags(
    AuthUser(_user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> ServiceResult<Json<TagsResponse>> {
    let mut conn = pool.get()?;

    let tags = tags::table
        .select(Tag::as_select())
        .order(tags::name.asc())
        .load(&mut conn)?;

    Ok(Json(TagsResponse { tags }))
}

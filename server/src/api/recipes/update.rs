use super::get::{load_recipe_response, RecipeResponse};
use super::{ingredient_amounts, RecipeIngredientRequest};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::domain::recipes::{self as recipe_service, RecipePatch};
use crate::error::ServiceResult;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Omitted fields keep their current value. A present `ingredients` or
/// `tags` list replaces the whole set.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateRecipeRequest {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub image: Option<String>,
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<RecipeIngredientRequest>>,
}

impl UpdateRecipeRequest {
    fn into_patch(self) -> ServiceResult<RecipePatch> {
        let ingredients = self
            .ingredients
            .as_deref()
            .map(ingredient_amounts)
            .transpose()?;

        Ok(RecipePatch {
            name: self.name,
            text: self.text,
            cooking_time: self.cooking_time,
            image: self.image,
            tag_ids: self.tags,
            ingredients,
        })
    }
}

#[utoipa::path(
    patch,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = RecipeResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the recipe's author", body = ErrorResponse),
        (status = 404, description = "Recipe, ingredient or tag not found", body = ErrorResponse),
        (status = 409, description = "Concurrent write, retry", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRecipeRequest>,
) -> ServiceResult<Json<RecipeResponse>> {
    let patch = request.into_patch()?;

    let mut conn = pool.get()?;
    recipe_service::update_recipe(&mut *conn, user.id, id, &patch)?;

    Ok(Json(load_recipe_response(&mut conn, user.id, id)?))
}

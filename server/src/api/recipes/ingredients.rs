use super::{ingredient_amounts, RecipeIngredientRequest};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::domain::recipes as recipe_service;
use crate::error::ServiceResult;
use crate::models::LedgerEntry;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReplaceIngredientsRequest {
    pub ingredients: Vec<RecipeIngredientRequest>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommittedIngredient {
    pub id: Uuid,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReplaceIngredientsResponse {
    /// Committed entries, in request order
    pub ingredients: Vec<CommittedIngredient>,
}

impl From<Vec<LedgerEntry>> for ReplaceIngredientsResponse {
    fn from(entries: Vec<LedgerEntry>) -> Self {
        Self {
            ingredients: entries
                .into_iter()
                .map(|entry| CommittedIngredient {
                    id: entry.ingredient_id,
                    amount: entry.amount,
                })
                .collect(),
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/recipes/{id}/ingredients",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = ReplaceIngredientsRequest,
    responses(
        (status = 200, description = "Ingredient list replaced", body = ReplaceIngredientsResponse),
        (status = 400, description = "Invalid amount or duplicate ingredient", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the recipe's author", body = ErrorResponse),
        (status = 404, description = "Recipe or ingredient not found", body = ErrorResponse),
        (status = 409, description = "Concurrent replacement, retry", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn replace_ingredients(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReplaceIngredientsRequest>,
) -> ServiceResult<Json<ReplaceIngredientsResponse>> {
    let entries = ingredient_amounts(&request.ingredients)?;

    let mut conn = pool.get()?;
    let committed =
        recipe_service::replace_recipe_ingredients(&mut *conn, user.id, id, &entries)?;

    Ok(Json(committed.into()))
}

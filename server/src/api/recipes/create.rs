use super::get::{load_recipe_response, RecipeResponse};
use super::{ingredient_amounts, RecipeIngredientRequest};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::domain::recipes::{self as recipe_service, RecipeDraft};
use crate::error::ServiceResult;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub text: String,
    /// Minutes, at least 1
    pub cooking_time: i64,
    pub image: Option<String>,
    /// Tag IDs from the catalog
    #[serde(default)]
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<RecipeIngredientRequest>,
}

impl CreateRecipeRequest {
    fn into_draft(self) -> ServiceResult<RecipeDraft> {
        Ok(RecipeDraft {
            ingredients: ingredient_amounts(&self.ingredients)?,
            name: self.name,
            text: self.text,
            cooking_time: self.cooking_time,
            image: self.image,
            tag_ids: self.tags,
        })
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body(content = CreateRecipeRequest, example = json!({
        "name": "Pancakes",
        "text": "Whisk everything, fry in butter.",
        "cooking_time": 20,
        "tags": [],
        "ingredients": [{"id": "00000000-0000-0000-0000-000000000000", "amount": 200}]
    })),
    responses(
        (status = 201, description = "Recipe created successfully", body = RecipeResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Unknown ingredient or tag", body = ErrorResponse),
        (status = 409, description = "Concurrent write, retry", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(request): Json<CreateRecipeRequest>,
) -> ServiceResult<impl IntoResponse> {
    let draft = request.into_draft()?;

    let mut conn = pool.get()?;
    let recipe_id = recipe_service::create_recipe(&mut *conn, user.id, &draft)?;
    let response = load_recipe_response(&mut conn, user.id, recipe_id)?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_tags() {
        let request: CreateRecipeRequest = serde_json::from_str(
            r#"{
                "name": "Toast",
                "text": "Toast the bread",
                "cooking_time": 3,
                "ingredients": [{"id": "6f1f7d3e-4a56-4c1b-9a63-1c2d3e4f5a6b", "amount": 2}]
            }"#,
        )
        .unwrap();
        let draft = request.into_draft().unwrap();
        assert!(draft.tag_ids.is_empty());
        assert_eq!(draft.ingredients.len(), 1);
        assert_eq!(draft.ingredients[0].amount, 2);
        assert_eq!(draft.image, None);
    }

    #[test]
    fn test_fractional_amount_is_validation_error() {
        let request: CreateRecipeRequest = serde_json::from_str(
            r#"{
                "name": "Toast",
                "text": "Toast the bread",
                "cooking_time": 3,
                "ingredients": [{"id": "6f1f7d3e-4a56-4c1b-9a63-1c2d3e4f5a6b", "amount": 0.5}]
            }"#,
        )
        .unwrap();
        assert_eq!(request.into_draft().unwrap_err().kind(), "validation");
    }
}

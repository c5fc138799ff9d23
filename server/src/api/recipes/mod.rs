pub mod create;
pub mod delete;
pub mod get;
pub mod ingredients;
pub mod list;
pub mod update;

use crate::domain::ledger::IngredientAmount;
use crate::error::{ServiceError, ServiceResult};
use crate::schema::recipes;
use crate::AppState;
use axum::routing::{get, put};
use axum::Router;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes).post(create::create_recipe))
        .route(
            "/{id}",
            get(get::get_recipe)
                .patch(update::update_recipe)
                .delete(delete::delete_recipe),
        )
        .route("/{id}/ingredients", put(ingredients::replace_ingredients))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::create_recipe,
        list::list_recipes,
        get::get_recipe,
        update::update_recipe,
        delete::delete_recipe,
        ingredients::replace_ingredients,
    ),
    components(schemas(
        RecipeIngredientRequest,
        RecipeSummary,
        create::CreateRecipeRequest,
        list::ListRecipesResponse,
        get::RecipeResponse,
        get::AuthorResponse,
        get::RecipeIngredientResponse,
        update::UpdateRecipeRequest,
        ingredients::ReplaceIngredientsRequest,
        ingredients::ReplaceIngredientsResponse,
        ingredients::CommittedIngredient,
    ))
)]
pub struct ApiDoc;

/// One ingredient line of a create/update request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecipeIngredientRequest {
    /// Ingredient ID from the catalog
    pub id: Uuid,
    /// Positive whole number in the ingredient's measurement unit
    #[schema(value_type = i64)]
    pub amount: serde_json::Number,
}

/// Converts request lines, rejecting amounts that are not whole numbers.
pub fn ingredient_amounts(items: &[RecipeIngredientRequest]) -> ServiceResult<Vec<IngredientAmount>> {
    items
        .iter()
        .map(|item| {
            let amount = item.amount.as_i64().ok_or_else(|| {
                ServiceError::validation(format!(
                    "Amount for ingredient {} must be a positive integer",
                    item.id
                ))
            })?;
            Ok(IngredientAmount {
                ingredient_id: item.id,
                amount,
            })
        })
        .collect()
}

/// Short recipe card returned by cart, favorites and subscriptions.
#[derive(Debug, Clone, Serialize, ToSchema, Queryable)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

pub fn load_summary(conn: &mut PgConnection, recipe_id: Uuid) -> ServiceResult<RecipeSummary> {
    recipes::table
        .find(recipe_id)
        .select((
            recipes::id,
            recipes::name,
            recipes::image,
            recipes::cooking_time,
        ))
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("Recipe", recipe_id))
}

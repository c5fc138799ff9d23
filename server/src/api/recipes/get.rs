use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Recipe, Tag};
use crate::schema::{cart_entries, favorites, follows, recipe_tags, recipes, tags, users};
use crate::store::LedgerRepo;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the requesting user follows this author
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeIngredientResponse {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: AuthorResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
}

type AuthorRow = (Uuid, String, String, String, String);

/// Builds full responses for `recipes`, preserving their order.
///
/// Issues a fixed number of queries regardless of how many recipes are given.
pub fn load_recipe_responses(
    conn: &mut PgConnection,
    viewer_id: Uuid,
    recipes: Vec<Recipe>,
) -> QueryResult<Vec<RecipeResponse>> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }

    let recipe_ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let author_ids: Vec<Uuid> = recipes
        .iter()
        .map(|r| r.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    let tag_rows: Vec<(Uuid, Tag)> = recipe_tags::table
        .inner_join(tags::table)
        .filter(recipe_tags::recipe_id.eq_any(&recipe_ids))
        .select((recipe_tags::recipe_id, Tag::as_select()))
        .order(tags::name.asc())
        .load(conn)?;
    for (recipe_id, tag) in tag_rows {
        tags_by_recipe.entry(recipe_id).or_default().push(tag);
    }

    let mut ingredients_by_recipe: HashMap<Uuid, Vec<RecipeIngredientResponse>> = HashMap::new();
    for line in conn.ledger_lines(&recipe_ids)? {
        ingredients_by_recipe
            .entry(line.recipe_id)
            .or_default()
            .push(RecipeIngredientResponse {
                id: line.ingredient_id,
                name: line.name,
                measurement_unit: line.measurement_unit,
                amount: line.amount,
            });
    }
    for lines in ingredients_by_recipe.values_mut() {
        lines.sort_by(|a, b| a.name.cmp(&b.name));
    }

    let authors: HashMap<Uuid, AuthorRow> = users::table
        .filter(users::id.eq_any(&author_ids))
        .select((
            users::id,
            users::email,
            users::username,
            users::first_name,
            users::last_name,
        ))
        .load::<AuthorRow>(conn)?
        .into_iter()
        .map(|row| (row.0, row))
        .collect();

    let subscribed: HashSet<Uuid> = follows::table
        .filter(follows::follower_id.eq(viewer_id))
        .filter(follows::author_id.eq_any(&author_ids))
        .select(follows::author_id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect();

    let favorited: HashSet<Uuid> = favorites::table
        .filter(favorites::user_id.eq(viewer_id))
        .filter(favorites::recipe_id.eq_any(&recipe_ids))
        .select(favorites::recipe_id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect();

    let in_cart: HashSet<Uuid> = cart_entries::table
        .filter(cart_entries::user_id.eq(viewer_id))
        .filter(cart_entries::recipe_id.eq_any(&recipe_ids))
        .select(cart_entries::recipe_id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect();

    let responses = recipes
        .into_iter()
        .filter_map(|recipe| {
            // recipes.author_id is a foreign key, so a miss only happens mid-delete
            let (id, email, username, first_name, last_name) = authors.get(&recipe.author_id)?.clone();
            Some(RecipeResponse {
                id: recipe.id,
                tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
                author: AuthorResponse {
                    is_subscribed: subscribed.contains(&id),
                    id,
                    email,
                    username,
                    first_name,
                    last_name,
                },
                ingredients: ingredients_by_recipe.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
                created_at: recipe.created_at,
            })
        })
        .collect();

    Ok(responses)
}

pub fn load_recipe_response(
    conn: &mut PgConnection,
    viewer_id: Uuid,
    recipe_id: Uuid,
) -> ServiceResult<RecipeResponse> {
    let recipe: Recipe = recipes::table
        .find(recipe_id)
        .select(Recipe::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("Recipe", recipe_id))?;

    load_recipe_responses(conn, viewer_id, vec![recipe])?
        .pop()
        .ok_or_else(|| ServiceError::not_found("Recipe", recipe_id))
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe with ingredients, tags and author", body = RecipeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> ServiceResult<Json<RecipeResponse>> {
    let mut conn = pool.get()?;
    Ok(Json(load_recipe_response(&mut conn, user.id, id)?))
}

use super::get::{load_recipe_responses, RecipeResponse};
use crate::api::{page_limit, page_offset, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::{ServiceError, ServiceResult};
use crate::models::Recipe;
use crate::schema::{cart_entries, favorites, recipe_tags, recipes, tags};
use crate::store::Transact;
use axum::{
    extract::{Query, State},
    Json,
};
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 6;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListRecipesParams {
    /// Number of items to return (default: 6, max: 100)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
    /// Only recipes by this author
    pub author: Option<Uuid>,
    /// Comma-separated tag slugs; a recipe matches if it has any of them
    pub tags: Option<String>,
    /// `1`/`true` keeps only favorites, `0`/`false` hides them
    pub is_favorited: Option<String>,
    /// `1`/`true` keeps only recipes in the cart, `0`/`false` hides them
    pub is_in_shopping_cart: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeResponse>,
    /// Total matching recipes before pagination
    pub count: i64,
}

fn parse_flag(name: &str, value: Option<&str>) -> ServiceResult<Option<bool>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some("1") | Some("true") => Ok(Some(true)),
        Some("0") | Some("false") => Ok(Some(false)),
        Some(other) => Err(ServiceError::validation(format!(
            "{name} must be 0 or 1, got {other:?}"
        ))),
    }
}

fn parse_tag_slugs(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

struct RecipeFilter {
    viewer_id: Uuid,
    author: Option<Uuid>,
    tag_slugs: Vec<String>,
    is_favorited: Option<bool>,
    is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    fn from_params(viewer_id: Uuid, params: &ListRecipesParams) -> ServiceResult<Self> {
        Ok(Self {
            viewer_id,
            author: params.author,
            tag_slugs: parse_tag_slugs(params.tags.as_deref()),
            is_favorited: parse_flag("is_favorited", params.is_favorited.as_deref())?,
            is_in_shopping_cart: parse_flag(
                "is_in_shopping_cart",
                params.is_in_shopping_cart.as_deref(),
            )?,
        })
    }

    /// Builds the filtered query; called once for the count and once for the page.
    fn query(&self) -> recipes::BoxedQuery<'_, Pg> {
        let mut query = recipes::table.into_boxed();

        if let Some(author) = self.author {
            query = query.filter(recipes::author_id.eq(author));
        }

        if !self.tag_slugs.is_empty() {
            query = query.filter(
                recipes::id.eq_any(
                    recipe_tags::table
                        .inner_join(tags::table)
                        .filter(tags::slug.eq_any(&self.tag_slugs))
                        .select(recipe_tags::recipe_id),
                ),
            );
        }

        let favorite_ids = favorites::table
            .filter(favorites::user_id.eq(self.viewer_id))
            .select(favorites::recipe_id);
        query = match self.is_favorited {
            Some(true) => query.filter(recipes::id.eq_any(favorite_ids)),
            Some(false) => query.filter(recipes::id.ne_all(favorite_ids)),
            None => query,
        };

        let cart_ids = cart_entries::table
            .filter(cart_entries::user_id.eq(self.viewer_id))
            .select(cart_entries::recipe_id);
        query = match self.is_in_shopping_cart {
            Some(true) => query.filter(recipes::id.eq_any(cart_ids)),
            Some(false) => query.filter(recipes::id.ne_all(cart_ids)),
            None => query,
        };

        query
    }
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "Recipes, newest first", body = ListRecipesResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_recipes(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListRecipesParams>,
) -> ServiceResult<Json<ListRecipesResponse>> {
    let filter = RecipeFilter::from_params(user.id, &params)?;
    let limit = page_limit(params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = page_offset(params.offset);

    let mut conn = pool.get()?;

    let response = conn.read_snapshot(|conn| {
        let count: i64 = filter.query().count().get_result(conn)?;

        let page: Vec<Recipe> = filter
            .query()
            .select(Recipe::as_select())
            .order((recipes::created_at.desc(), recipes::id.asc()))
            .limit(limit)
            .offset(offset)
            .load(conn)?;

        let recipes = load_recipe_responses(conn, user.id, page)?;
        Ok::<_, ServiceError>(ListRecipesResponse { recipes, count })
    })?;

    Ok(Json(response))
}

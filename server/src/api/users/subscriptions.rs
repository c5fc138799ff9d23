use crate::api::recipes::RecipeSummary;
use crate::api::{page_limit, page_offset, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::{ServiceError, ServiceResult};
use crate::schema::{follows, recipes, users};
use crate::store::Transact;
use axum::{
    extract::{Query, State},
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 6;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SubscriptionsParams {
    /// Number of authors to return (default: 6, max: 100)
    pub limit: Option<i64>,
    /// Number of authors to skip (default: 0)
    pub offset: Option<i64>,
    /// Keep at most this many of each author's newest recipes
    pub recipes_limit: Option<i64>,
}

/// A followed author with their recipes.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeSummary>,
    /// Total recipes by this author, regardless of `recipes_limit`
    pub recipes_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionResponse>,
    /// Total followed authors before pagination
    pub count: i64,
}

type AuthorRow = (Uuid, String, String, String, String);

/// Groups newest-first recipe rows by author, truncating each list to `recipes_limit`.
fn group_recipes(
    rows: Vec<(Uuid, RecipeSummary)>,
    recipes_limit: Option<usize>,
) -> HashMap<Uuid, (Vec<RecipeSummary>, i64)> {
    let mut grouped: HashMap<Uuid, (Vec<RecipeSummary>, i64)> = HashMap::new();
    for (author_id, summary) in rows {
        let (recipes, count) = grouped.entry(author_id).or_default();
        *count += 1;
        if recipes_limit.is_none_or(|limit| recipes.len() < limit) {
            recipes.push(summary);
        }
    }
    grouped
}

fn parse_recipes_limit(value: Option<i64>) -> ServiceResult<Option<usize>> {
    match value {
        None => Ok(None),
        Some(n) if n < 0 => Err(ServiceError::validation(
            "recipes_limit cannot be negative",
        )),
        Some(n) => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
    }
}

/// Builds subscription entries for `authors`, keeping their order.
pub fn load_subscriptions(
    conn: &mut PgConnection,
    authors: Vec<AuthorRow>,
    recipes_limit: Option<usize>,
) -> QueryResult<Vec<SubscriptionResponse>> {
    let author_ids: Vec<Uuid> = authors.iter().map(|a| a.0).collect();

    let rows: Vec<(Uuid, RecipeSummary)> = recipes::table
        .filter(recipes::author_id.eq_any(&author_ids))
        .select((
            recipes::author_id,
            (
                recipes::id,
                recipes::name,
                recipes::image,
                recipes::cooking_time,
            ),
        ))
        .order((recipes::created_at.desc(), recipes::id.asc()))
        .load(conn)?;
    let mut grouped = group_recipes(rows, recipes_limit);

    Ok(authors
        .into_iter()
        .map(|(id, email, username, first_name, last_name)| {
            let (recipes, recipes_count) = grouped.remove(&id).unwrap_or_default();
            SubscriptionResponse {
                id,
                email,
                username,
                first_name,
                last_name,
                is_subscribed: true,
                recipes,
                recipes_count,
            }
        })
        .collect())
}

pub fn load_author(conn: &mut PgConnection, author_id: Uuid) -> ServiceResult<AuthorRow> {
    users::table
        .find(author_id)
        .select((
            users::id,
            users::email,
            users::username,
            users::first_name,
            users::last_name,
        ))
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("User", author_id))
}

#[utoipa::path(
    get,
    path = "/api/users/subscriptions",
    tag = "users",
    params(SubscriptionsParams),
    responses(
        (status = 200, description = "Followed authors ordered by username", body = SubscriptionsResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_subscriptions(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<SubscriptionsParams>,
) -> ServiceResult<Json<SubscriptionsResponse>> {
    let recipes_limit = parse_recipes_limit(params.recipes_limit)?;
    let limit = page_limit(params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = page_offset(params.offset);

    let mut conn = pool.get()?;

    let response = conn.read_snapshot(|conn| {
        let followed = follows::table
            .filter(follows::follower_id.eq(user.id))
            .select(follows::author_id);

        let count: i64 = follows::table
            .filter(follows::follower_id.eq(user.id))
            .count()
            .get_result(conn)?;

        let authors: Vec<AuthorRow> = users::table
            .filter(users::id.eq_any(followed))
            .select((
                users::id,
                users::email,
                users::username,
                users::first_name,
                users::last_name,
            ))
            .order(users::username.asc())
            .limit(limit)
            .offset(offset)
            .load(conn)?;

        let subscriptions = load_subscriptions(conn, authors, recipes_limit)?;
        Ok::<_, ServiceError>(SubscriptionsResponse {
            subscriptions,
            count,
        })
    })?;

    Ok(Json(response))
}

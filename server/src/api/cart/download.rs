use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::domain::shopping_list::{aggregate, render_text};
use crate::error::ServiceResult;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;

pub const DOWNLOAD_FILENAME: &str = "shopping_list.txt";

#[utoipa::path(
    get,
    path = "/api/cart/download",
    tag = "cart",
    responses(
        (status = 200, description = "Shopping list as a text attachment, one `name amount unit` line per ingredient", content_type = "text/plain", body = String),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_shopping_list(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> ServiceResult<impl IntoResponse> {
    let mut conn = pool.get()?;
    let lines = aggregate(&mut *conn, user.id)?;

    tracing::info!(user_id = %user.id, lines = lines.len(), "shopping list downloaded");

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DOWNLOAD_FILENAME}\""),
            ),
        ],
        render_text(&lines),
    ))
}

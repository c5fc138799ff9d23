pub mod download;
pub mod list;
pub mod toggle;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/cart endpoints (mounted at /api/cart)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::shopping_list))
        .route("/download", get(download::download_shopping_list))
        .route(
            "/{recipe_id}",
            post(toggle::add_to_cart).delete(toggle::remove_from_cart),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list::shopping_list,
        download::download_shopping_list,
        toggle::add_to_cart,
        toggle::remove_from_cart,
    ),
    components(schemas(
        list::ShoppingListResponse,
        crate::domain::shopping_list::ShoppingListLine,
    ))
)]
pub struct ApiDoc;

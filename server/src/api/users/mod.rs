pub mod subscriptions;

use crate::AppState;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/users endpoints (mounted at /api/users)
pub fn router() -> Router<AppState> {
    Router::new().route("/subscriptions", get(subscriptions::list_subscriptions))
}

#[derive(OpenApi)]
#[openapi(
    paths(subscriptions::list_subscriptions),
    components(schemas(
        subscriptions::SubscriptionResponse,
        subscriptions::SubscriptionsResponse,
    ))
)]
pub struct ApiDoc;

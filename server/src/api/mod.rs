pub mod cart;
pub mod favorites;
pub mod follows;
pub mod ingredients;
pub mod public;
pub mod recipes;
pub mod tags;
pub mod users;

use serde::Serialize;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{OpenApi, ToSchema};

use crate::models::{Ingredient, Tag};

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error kind, e.g. `not_found` or `validation`
    pub kind: String,
}

/// Clamps a client-supplied page size into `1..=max`.
pub fn page_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

pub fn page_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Base spec with shared components and security
    #[derive(OpenApi)]
    #[openapi(components(schemas(ErrorResponse, Ingredient, Tag)))]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    if let Some(components) = spec.components.as_mut() {
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }

    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        public::ApiDoc::openapi(),
        ingredients::ApiDoc::openapi(),
        tags::ApiDoc::openapi(),
        recipes::ApiDoc::openapi(),
        cart::ApiDoc::openapi(),
        favorites::ApiDoc::openapi(),
        follows::ApiDoc::openapi(),
        users::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        spec.paths.paths.extend(module_spec.paths.paths);

        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit() {
        assert_eq!(page_limit(None, 6, 100), 6);
        assert_eq!(page_limit(Some(0), 6, 100), 1);
        assert_eq!(page_limit(Some(500), 6, 100), 100);
        assert_eq!(page_limit(Some(25), 6, 100), 25);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(None), 0);
        assert_eq!(page_offset(Some(-4)), 0);
        assert_eq!(page_offset(Some(12)), 12);
    }

    #[test]
    fn test_openapi_lists_core_paths() {
        let spec = openapi();
        for path in [
            "/api/auth/signup",
            "/api/recipes",
            "/api/recipes/{id}",
            "/api/recipes/{id}/ingredients",
            "/api/cart",
            "/api/cart/download",
            "/api/cart/{recipe_id}",
            "/api/favorites/{recipe_id}",
            "/api/follow/{user_id}",
            "/api/users/subscriptions",
            "/api/ingredients",
            "/api/tags/{id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
